//! Trainers that fit ranking models directly against a ranking metric.
//!
//! Two trainers share the same inputs (a training [`Dataset`] plus optional validation and
//! test datasets) and the same reporting: one [`TraceEntry`] per optimization step, delivered
//! through a progress callback while training runs and returned with the model afterwards.
//!
//! - [`coordinate_ascent`] - a linear model tuned one weight at a time. Each coordinate update
//!   computes, per query, the exact points where the query's ranking changes as the weight
//!   moves, and jumps to the best of them.
//! - [`random_forest`] - an ensemble of regression trees grown on bootstrap samples of queries
//!   with random feature subspaces.
//!
//! # Architecture
//!
//! ```text
//! Dataset (train / validation / test)
//!     ↓ dense copy (FeatureMatrix)
//! Trainer (coordinate ascent / random forest)
//!     ↓ candidate models scored by
//! MetricEvaluator (ranktrain-evaluator)
//!     ↓ reported per step
//! TraceEntry → progress callback
//!     ↓ final result
//! Trained { model, trace, summary }
//! ```
//!
//! # Determinism
//!
//! Every random choice is drawn from a generator derived from `(seed, index)` by
//! [`seed::derive_rng`], where the index is the restart or tree number. Work split across
//! threads is written into index-addressed slots and combined in index order, so the
//! `threads` parameter changes speed only: the same seed yields the same model and trace.
//!
//! # Example
//!
//! ```
//! use ranktrain_data::Dataset;
//! use ranktrain_evaluator::MetricConfig;
//! use ranktrain_training::{
//!     TrainingData,
//!     coordinate_ascent::{CoordinateAscentParams, CoordinateAscentTrainer},
//! };
//!
//! let train = Dataset::parse(
//!     "train",
//!     "2 qid:1 1:0.9 2:0.7\n0 qid:1 1:0.1 2:0.2\n1 qid:1 1:0.5 2:0.4\n",
//! )
//! .unwrap();
//! let trainer = CoordinateAscentTrainer::new(MetricConfig::ndcg(10), CoordinateAscentParams {
//!     restarts: 1,
//!     ..CoordinateAscentParams::default()
//! })
//! .unwrap();
//! let trained = trainer.train(&TrainingData::new(&train)).unwrap();
//! assert_eq!(trained.summary.train, 1.0);
//! ```

use ranktrain_data::{Dataset, EmptyDatasetError};
use ranktrain_evaluator::{MetricConfig, MetricEvaluator, Model, ParseMetricError, score_all};
use serde::{Deserialize, Serialize};

pub mod coordinate_ascent;
mod parallel;
pub mod random_forest;
pub mod seed;
#[cfg(test)]
mod testing;
pub mod weights;

/// Invalid trainer configuration.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum ConfigError {
    #[display("srate must be in (0, 1], got {value}")]
    SamplingRate { value: f64 },
    #[display("frate must be in (0, 1], got {value}")]
    FeatureRate { value: f64 },
    #[display("split_candidates must be at least 1")]
    SplitCandidates,
    #[display("max_depth must not be negative, got {value}")]
    MaxDepth { value: i64 },
    #[display("num_trees must be at least 1")]
    ZeroTrees,
    #[display("restarts must be at least 1")]
    ZeroRestarts,
    #[display("max_sweeps must be at least 1")]
    ZeroSweeps,
    #[display("threads must be at least 1")]
    ZeroThreads,
    #[display("tolerance must be positive and finite, got {value}")]
    Tolerance { value: f64 },
    #[display("{_0}")]
    #[from]
    UnknownMetric(ParseMetricError),
}

/// Parses a metric name such as `NDCG@10` or `MAP`.
pub fn parse_metric(name: &str) -> Result<MetricConfig, ConfigError> {
    Ok(name.parse::<MetricConfig>()?)
}

/// Training failed before any model was produced.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TrainError {
    #[display("invalid configuration: {_0}")]
    Config(ConfigError),
    #[display("{_0}")]
    EmptyDataset(EmptyDatasetError),
}

/// Datasets a trainer reads.
///
/// Only `train` drives the optimization. `validation`, when present, selects between
/// candidate models (coordinate-ascent restarts); `test` is reported only.
#[derive(Debug, Clone, Copy)]
pub struct TrainingData<'a> {
    pub train: &'a Dataset,
    pub validation: Option<&'a Dataset>,
    pub test: Option<&'a Dataset>,
}

impl<'a> TrainingData<'a> {
    #[must_use]
    pub fn new(train: &'a Dataset) -> Self {
        Self {
            train,
            validation: None,
            test: None,
        }
    }

    #[must_use]
    pub fn with_validation(mut self, validation: Option<&'a Dataset>) -> Self {
        self.validation = validation;
        self
    }

    #[must_use]
    pub fn with_test(mut self, test: Option<&'a Dataset>) -> Self {
        self.test = test;
        self
    }

    fn check_train(&self) -> Result<(), EmptyDatasetError> {
        if self.train.document_count() == 0 {
            return Err(EmptyDatasetError {
                path: self.train.name().to_owned(),
            });
        }
        Ok(())
    }
}

/// A held-out dataset with its prepared metric.
#[derive(Debug)]
struct HeldOut<'a> {
    dataset: &'a Dataset,
    evaluator: MetricEvaluator,
}

impl<'a> HeldOut<'a> {
    fn new(metric: MetricConfig, dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            evaluator: MetricEvaluator::new(metric, dataset),
        }
    }

    fn evaluate<M>(&self, model: &M) -> f64
    where
        M: Model + ?Sized,
    {
        self.evaluator.evaluate(&score_all(model, self.dataset))
    }
}

/// Metric values after one optimization step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Restart index (always 0 for the random forest).
    pub restart: usize,
    /// Sweep number within the restart, or number of trees in the ensemble, from 1.
    pub step: usize,
    pub train: f64,
    pub validation: Option<f64>,
    pub test: Option<f64>,
}

/// A trained model with the metric history that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Trained<M> {
    pub model: M,
    /// Every step, in the order it was reported.
    pub trace: Vec<TraceEntry>,
    /// Metric values of `model` itself.
    pub summary: TraceEntry,
}
