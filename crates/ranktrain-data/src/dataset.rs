use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
};

use crate::{EmptyDatasetError, FeatureId, LoadError, ParseError, parse};

/// Largest relevance label accepted from input files.
///
/// Gains are `2^label - 1`, which overflows `f64` from 1024 on.
pub const MAX_LABEL: u32 = 1023;

/// A single judged document: a sparse feature vector and its relevance label.
///
/// Features are stored sorted by id; ids not present read as `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    label: u32,
    features: Vec<(FeatureId, f64)>,
    name: Option<String>,
}

impl Document {
    /// Creates a document from `(id, value)` pairs.
    ///
    /// Pairs are sorted by id. Ids must be unique and `label` at most [`MAX_LABEL`].
    #[must_use]
    pub fn new<I>(label: u32, features: I) -> Self
    where
        I: IntoIterator<Item = (FeatureId, f64)>,
    {
        debug_assert!(label <= MAX_LABEL, "label {label} exceeds {MAX_LABEL}");
        let mut features = features.into_iter().collect::<Vec<_>>();
        features.sort_by_key(|(id, _)| *id);
        debug_assert!(
            features.windows(2).all(|w| w[0].0 != w[1].0),
            "feature ids must be unique"
        );
        Self {
            label,
            features,
            name: None,
        }
    }

    /// Attaches an external document name (used when writing run files).
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn label(&self) -> u32 {
        self.label
    }

    /// Value of feature `id`, or `0.0` when absent.
    #[must_use]
    pub fn feature(&self, id: FeatureId) -> f64 {
        self.features
            .binary_search_by_key(&id, |(fid, _)| *fid)
            .map_or(0.0, |i| self.features[i].1)
    }

    /// Present features in ascending id order.
    #[must_use]
    pub fn features(&self) -> &[(FeatureId, f64)] {
        &self.features
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// The documents retrieved for one query, kept in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    id: String,
    documents: Vec<Document>,
}

impl Query {
    #[must_use]
    pub fn new(id: impl Into<String>, documents: Vec<Document>) -> Self {
        Self {
            id: id.into(),
            documents,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Relevance labels in document order.
    pub fn labels(&self) -> impl Iterator<Item = u32> + '_ {
        self.documents.iter().map(Document::label)
    }
}

/// An immutable, query-grouped ranking dataset.
///
/// Queries keep the order in which their ids first appear in the source; documents keep
/// their source order inside each query. Both orders are used as tie-breakers by the
/// metric evaluator, so they are part of the dataset's identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    name: String,
    queries: Vec<Query>,
    feature_ids: Vec<FeatureId>,
    feature_names: BTreeMap<FeatureId, String>,
}

impl Dataset {
    /// Builds a dataset from already grouped queries.
    ///
    /// The feature-id set is collected from the documents.
    pub fn from_queries(
        name: impl Into<String>,
        queries: Vec<Query>,
    ) -> Result<Self, EmptyDatasetError> {
        let name = name.into();
        if queries.is_empty() {
            return Err(EmptyDatasetError { path: name });
        }
        let feature_ids = queries
            .iter()
            .flat_map(Query::documents)
            .flat_map(|doc| doc.features().iter().map(|(id, _)| *id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Ok(Self {
            name,
            queries,
            feature_ids,
            feature_names: BTreeMap::new(),
        })
    }

    /// Reads and parses a dataset file.
    pub fn load<P>(path: P) -> Result<Self, LoadError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let name = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: name.clone(),
            source,
        })?;
        let dataset = Self::parse(name, &text)?;
        tracing::info!(
            path = %dataset.name,
            queries = dataset.queries.len(),
            documents = dataset.document_count(),
            features = dataset.feature_ids.len(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// Parses dataset text; `name` is used in error messages.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, LoadError> {
        let name = name.into();
        let queries = parse::parse_queries(&name, text)?;
        Ok(Self::from_queries(name, queries)?)
    }

    /// Attaches display names for features.
    ///
    /// Names for ids that never occur in the data are kept; they are harmless.
    #[must_use]
    pub fn with_feature_names(mut self, names: BTreeMap<FeatureId, String>) -> Self {
        self.feature_names = names;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    /// All documents, query by query, in dataset order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> + '_ {
        self.queries.iter().flat_map(Query::documents)
    }

    #[must_use]
    pub fn document_count(&self) -> usize {
        self.queries.iter().map(Query::len).sum()
    }

    /// Distinct feature ids observed in the data, ascending.
    #[must_use]
    pub fn feature_ids(&self) -> &[FeatureId] {
        &self.feature_ids
    }

    /// Display name of a feature, falling back to its number.
    #[must_use]
    pub fn feature_name(&self, id: FeatureId) -> Cow<'_, str> {
        self.feature_names
            .get(&id)
            .map_or_else(|| Cow::Owned(id.to_string()), |name| Cow::Borrowed(name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fid(id: u32) -> FeatureId {
        FeatureId::new(id).unwrap()
    }

    #[test]
    fn test_document_sorts_features() {
        let doc = Document::new(1, [(fid(3), 0.5), (fid(1), 2.0)]);
        assert_eq!(doc.features(), &[(fid(1), 2.0), (fid(3), 0.5)]);
        assert_eq!(doc.feature(fid(1)), 2.0);
        assert_eq!(doc.feature(fid(2)), 0.0);
        assert_eq!(doc.feature(fid(3)), 0.5);
    }

    #[test]
    fn test_feature_ids_are_collected() {
        let dataset = Dataset::from_queries(
            "test",
            vec![
                Query::new("a", vec![Document::new(0, [(fid(5), 1.0)])]),
                Query::new("b", vec![Document::new(1, [(fid(2), 1.0), (fid(5), 0.0)])]),
            ],
        )
        .unwrap();
        assert_eq!(dataset.feature_ids(), &[fid(2), fid(5)]);
        assert_eq!(dataset.document_count(), 2);
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        let err = Dataset::from_queries("nothing.txt", vec![]).unwrap_err();
        assert_eq!(err.path, "nothing.txt");
    }

    #[test]
    fn test_feature_name_fallback() {
        let dataset = Dataset::from_queries(
            "test",
            vec![Query::new("a", vec![Document::new(0, [(fid(1), 1.0)])])],
        )
        .unwrap()
        .with_feature_names(BTreeMap::from([(fid(1), "bm25".to_owned())]));
        assert_eq!(dataset.feature_name(fid(1)), "bm25");
        assert_eq!(dataset.feature_name(fid(7)), "7");
    }
}
