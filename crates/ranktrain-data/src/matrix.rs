use std::ops::Range;

use crate::{Dataset, FeatureId};

/// Dense, document-major copy of a dataset's feature values.
///
/// Column `j` corresponds to `feature_ids()[j]`. Documents are numbered in dataset order,
/// so each query occupies a contiguous range of rows.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    feature_ids: Vec<FeatureId>,
    values: Vec<f64>,
    labels: Vec<u32>,
    query_ranges: Vec<Range<usize>>,
}

impl FeatureMatrix {
    #[must_use]
    pub fn new(dataset: &Dataset) -> Self {
        let feature_ids = dataset.feature_ids().to_vec();
        let width = feature_ids.len();
        let mut values = Vec::with_capacity(dataset.document_count() * width);
        let mut labels = Vec::with_capacity(dataset.document_count());
        let mut query_ranges = Vec::with_capacity(dataset.queries().len());

        for query in dataset.queries() {
            let start = labels.len();
            for doc in query.documents() {
                let row_start = values.len();
                values.resize(row_start + width, 0.0);
                for (id, value) in doc.features() {
                    // every document feature is in the dataset's id list
                    let column = feature_ids.binary_search(id).unwrap_or_else(|_| {
                        unreachable!("feature {id} missing from dataset feature ids")
                    });
                    values[row_start + column] = *value;
                }
                labels.push(doc.label());
            }
            query_ranges.push(start..labels.len());
        }

        Self {
            feature_ids,
            values,
            labels,
            query_ranges,
        }
    }

    #[must_use]
    pub fn feature_ids(&self) -> &[FeatureId] {
        &self.feature_ids
    }

    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.feature_ids.len()
    }

    #[must_use]
    pub fn document_count(&self) -> usize {
        self.labels.len()
    }

    /// Feature values of one document, indexed by column.
    #[must_use]
    pub fn row(&self, doc: usize) -> &[f64] {
        let width = self.feature_ids.len();
        &self.values[doc * width..(doc + 1) * width]
    }

    #[must_use]
    pub fn value(&self, doc: usize, column: usize) -> f64 {
        self.values[doc * self.feature_ids.len() + column]
    }

    #[must_use]
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Row range of each query, in dataset order.
    #[must_use]
    pub fn query_ranges(&self) -> &[Range<usize>] {
        &self.query_ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_layout() {
        let dataset = Dataset::parse(
            "m",
            "1 qid:a 2:0.5\n0 qid:b 1:1 3:2\n2 qid:a 3:-1\n",
        )
        .unwrap();
        let matrix = FeatureMatrix::new(&dataset);
        assert_eq!(matrix.feature_count(), 3);
        assert_eq!(matrix.document_count(), 3);
        assert_eq!(matrix.query_ranges(), &[0..2, 2..3]);
        // query "a" holds the first and third lines
        assert_eq!(matrix.row(0), &[0.0, 0.5, 0.0]);
        assert_eq!(matrix.row(1), &[0.0, 0.0, -1.0]);
        assert_eq!(matrix.row(2), &[1.0, 0.0, 2.0]);
        assert_eq!(matrix.labels(), &[1, 2, 0]);
        assert_eq!(matrix.value(2, 2), 2.0);
    }
}
