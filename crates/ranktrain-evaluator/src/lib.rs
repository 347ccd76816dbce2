//! Ranking metrics and trained model artifacts.
//!
//! This crate implements the two pieces both trainers share:
//!
//! 1. **Metric evaluation** ([`metric`]) - scores the ranking a model induces on each query
//!    against the ground-truth relevance labels (NDCG@k, AP@k, RR@k), and averages the
//!    per-query values into one dataset-level number.
//!
//! 2. **Models** ([`model`]) - the artifacts the trainers produce: a [`LinearModel`] of
//!    feature weights and a [`TreeEnsemble`] of arena-allocated regression trees. Both expose
//!    the same [`Model::score`] function.
//!
//! # Architecture
//!
//! ```text
//! Model (linear weights / tree ensemble)
//!     ↓ scores every document
//! per-document scores
//!     ↓ ranked per query (score desc, ties by input order)
//! MetricEvaluator (NDCG / AP / RR, per query)
//!     ↓ averaged over contributing queries
//! dataset-level metric
//! ```
//!
//! # Example
//!
//! ```
//! use ranktrain_data::Dataset;
//! use ranktrain_evaluator::{LinearModel, MetricConfig, MetricEvaluator, score_all};
//!
//! let dataset = Dataset::parse("inline", "2 qid:1 1:3\n0 qid:1 1:1\n1 qid:1 1:2\n").unwrap();
//! let model = LinearModel::from_pairs([(dataset.feature_ids()[0], 1.0)]);
//! let evaluator = MetricEvaluator::new("NDCG@10".parse::<MetricConfig>().unwrap(), &dataset);
//! assert_eq!(evaluator.evaluate(&score_all(&model, &dataset)), 1.0);
//! ```
//!
//! # Design Notes
//!
//! Metric kinds form a closed enum ([`MetricKind`]) with one `match` arm per kind; adding a
//! metric does not touch the trainers, which only see [`MetricEvaluator`].

pub use self::{metric::*, model::*};

pub mod metric;
pub mod model;
