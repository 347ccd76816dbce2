//! Query-grouped ranking datasets.
//!
//! This crate owns the immutable data model shared by every other ranktrain crate:
//!
//! - [`Document`] - a sparse feature vector with a relevance label
//! - [`Query`] - the documents retrieved for one query, in file order
//! - [`Dataset`] - the queries of one input file plus feature bookkeeping
//! - [`FeatureMatrix`] - a dense copy of a dataset used by the trainers' inner loops
//! - [`Judgments`] - TREC relevance judgments (qrels), used to normalize metrics
//!
//! Datasets are read from the ranklib / SVMrank text format:
//!
//! ```text
//! <relevance> qid:<id> <fid>:<value> <fid>:<value> ... [# comment]
//! ```
//!
//! ```
//! use ranktrain_data::{Dataset, FeatureId};
//!
//! let text = "\
//! 2 qid:1 1:0.5 2:1.0 # docid = a
//! 0 qid:1 1:0.1
//! 1 qid:2 2:3.0
//! ";
//! let dataset = Dataset::parse("inline", text).unwrap();
//! assert_eq!(dataset.queries().len(), 2);
//! assert_eq!(dataset.queries()[0].documents()[1].feature(FeatureId::new(2).unwrap()), 0.0);
//! ```

use std::io;

pub use self::{dataset::*, feature::*, feature_names::*, matrix::*, qrel::*};

mod dataset;
mod feature;
mod feature_names;
mod matrix;
mod parse;
mod qrel;

/// Error raised while reading a dataset or feature-name file.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ParseError {
    #[display("failed to read {path}: {source}")]
    Io { path: String, source: io::Error },
    #[display("{path}: invalid JSON: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[display("{path}:{line}: {kind}")]
    Line {
        path: String,
        line: usize,
        kind: LineErrorKind,
    },
}

/// What was wrong with a single input line.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum LineErrorKind {
    #[display("missing relevance label")]
    MissingLabel,
    #[display("invalid relevance label '{token}' (expected a non-negative integer)")]
    InvalidLabel { token: String },
    #[display("relevance label {token} exceeds the maximum of 1023")]
    LabelTooLarge { token: String },
    #[display("missing query id")]
    MissingQueryId,
    #[display("malformed feature '{token}' (expected <id>:<value>)")]
    MalformedFeature { token: String },
    #[display("feature id must be a positive integer, got '{token}'")]
    InvalidFeatureId { token: String },
    #[display("non-numeric value '{token}' for feature {feature}")]
    NonNumericValue { feature: FeatureId, token: String },
    #[display("duplicate feature {feature}")]
    DuplicateFeature { feature: FeatureId },
    #[display("missing feature name")]
    MissingFeatureName,
    #[display("expected '<qid> <iteration> <docid> <relevance>'")]
    MissingJudgmentField,
}

/// The input contained no queries at all.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("{path}: dataset contains no queries")]
pub struct EmptyDatasetError {
    pub path: String,
}

/// Error returned by [`Dataset::load`] and [`Dataset::parse`].
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum LoadError {
    Parse(ParseError),
    Empty(EmptyDatasetError),
}
