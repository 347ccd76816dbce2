use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64;
use ranktrain_data::{Dataset, Document, FeatureId, Query};

pub(crate) fn fid(id: u32) -> FeatureId {
    FeatureId::new(id).unwrap()
}

/// Label = round(3 · f1); f2 is noise, f3 is constant within each query.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn synthetic(seed: u64, queries: usize, docs: usize) -> Dataset {
    let mut rng = Pcg64::seed_from_u64(seed);
    let queries = (0..queries)
        .map(|q| {
            let constant = rng.random::<f64>();
            let documents = (0..docs)
                .map(|_| {
                    let f1 = rng.random::<f64>();
                    let f2 = rng.random::<f64>();
                    let label = (3.0 * f1).round() as u32;
                    Document::new(label, [(fid(1), f1), (fid(2), f2), (fid(3), constant)])
                })
                .collect();
            Query::new(q.to_string(), documents)
        })
        .collect();
    Dataset::from_queries("synthetic", queries).unwrap()
}
