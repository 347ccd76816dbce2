//! Ranking-quality metrics.
//!
//! # Ranking
//!
//! A query's documents are ranked by model score, descending. Equal scores keep the
//! documents' input order ([`rank_by_score`] is a stable sort), so a ranking is a pure
//! function of the scores and the dataset.
//!
//! # Metrics
//!
//! With ranks counted from 1 and `k` the optional cutoff:
//!
//! ```text
//! DCG@k  = Σ_{rank ≤ k} (2^rel - 1) / log2(rank + 1)
//! NDCG@k = DCG@k / DCG@k(ideal ordering)
//! AP@k   = Σ_{relevant, rank ≤ k} precision@rank / (number of relevant documents)
//! RR@k   = 1 / rank of the first relevant document within k (0 if none)
//! ```
//!
//! A document is relevant when its label is positive.
//!
//! # Contributing queries
//!
//! A query whose ideal DCG is zero (no positive label) carries no information about ranking
//! quality. Such queries are left out of the dataset mean instead of being averaged in as
//! zeros. The same rule applies to AP and RR, whose normalizers vanish for exactly the same
//! queries.
//!
//! # Judgments
//!
//! By default the normalizers (ideal DCG, number of relevant documents) come from the
//! documents present in the dataset. With [`MetricEvaluator::with_judgments`] they come from a
//! qrel file instead, so relevant documents the ranking never retrieved still count against
//! it. The ranked documents keep their dataset labels.

use std::{fmt, ops::Range, str::FromStr};

use ranktrain_data::{Dataset, Judgments};
use serde::{Deserialize, Serialize};

/// Metric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Ndcg,
    AveragePrecision,
    ReciprocalRank,
}

impl MetricKind {
    fn name(self) -> &'static str {
        match self {
            Self::Ndcg => "NDCG",
            Self::AveragePrecision => "AP",
            Self::ReciprocalRank => "RR",
        }
    }
}

/// A metric kind plus an optional rank cutoff (`None` scores the whole list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricConfig {
    pub kind: MetricKind,
    pub cutoff: Option<usize>,
}

impl MetricConfig {
    #[must_use]
    pub const fn ndcg(cutoff: usize) -> Self {
        Self {
            kind: MetricKind::Ndcg,
            cutoff: Some(cutoff),
        }
    }

    /// Precomputes the per-query normalizer from the query's labels.
    ///
    /// Returns `None` when the query has no positive label and therefore does not
    /// contribute to the dataset mean.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn prepare<I>(&self, labels: I) -> Option<QueryMetric>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut labels = labels.into_iter().collect::<Vec<_>>();
        let relevant = labels.iter().filter(|&&label| label > 0).count();
        if relevant == 0 {
            return None;
        }
        let normalizer = match self.kind {
            MetricKind::Ndcg => {
                labels.sort_unstable_by(|a, b| b.cmp(a));
                dcg(labels, self.cutoff)
            }
            MetricKind::AveragePrecision => relevant as f64,
            MetricKind::ReciprocalRank => 1.0,
        };
        Some(QueryMetric {
            config: *self,
            normalizer,
        })
    }

    /// Scores one query directly from labels and scores.
    ///
    /// Returns `None` for a non-contributing query.
    ///
    /// # Panics
    ///
    /// Panics if `labels` and `scores` differ in length.
    #[must_use]
    pub fn evaluate_query(&self, labels: &[u32], scores: &[f64]) -> Option<f64> {
        assert_eq!(labels.len(), scores.len());
        let metric = self.prepare(labels.iter().copied())?;
        Some(metric.score_ranked(rank_by_score(scores).into_iter().map(|i| labels[i])))
    }
}

impl fmt::Display for MetricConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.name())?;
        if let Some(k) = self.cutoff {
            write!(f, "@{k}")?;
        }
        Ok(())
    }
}

/// The metric name was not recognized.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown metric '{name}' (expected NDCG[@k], AP[@k], MAP[@k], RR[@k] or MRR[@k])")]
pub struct ParseMetricError {
    pub name: String,
}

impl FromStr for MetricConfig {
    type Err = ParseMetricError;

    /// Parses names like `NDCG@10`, `ndcg`, `MAP`, `AP@5`, `RR`, `MRR@10`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || ParseMetricError { name: s.to_owned() };
        let (name, cutoff) = match s.trim().split_once('@') {
            Some((name, k)) => {
                let k = k.parse::<usize>().ok().filter(|&k| k > 0).ok_or_else(error)?;
                (name, Some(k))
            }
            None => (s.trim(), None),
        };
        let kind = match name.to_ascii_uppercase().as_str() {
            "NDCG" => MetricKind::Ndcg,
            "AP" | "MAP" => MetricKind::AveragePrecision,
            "RR" | "MRR" => MetricKind::ReciprocalRank,
            _ => return Err(error()),
        };
        Ok(Self { kind, cutoff })
    }
}

/// A metric bound to one query's normalizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryMetric {
    config: MetricConfig,
    normalizer: f64,
}

impl QueryMetric {
    #[must_use]
    pub fn config(&self) -> MetricConfig {
        self.config
    }

    /// Scores a ranking given as the labels of the documents in rank order.
    #[must_use]
    pub fn score_ranked<I>(&self, ranked_labels: I) -> f64
    where
        I: IntoIterator<Item = u32>,
    {
        let labels =
            take_cutoff(ranked_labels.into_iter(), self.config.cutoff).collect::<Vec<_>>();
        self.score_span(0, 0, &labels)
    }

    /// Contribution of the documents at 0-based ranks `start..start + labels.len()`, when
    /// `relevant_before` relevant documents are ranked above `start`.
    ///
    /// The contributions of the spans of any partition of a ranking add up to
    /// [`score_ranked`](Self::score_ranked), so reordering documents within a span changes
    /// the metric by the change of that span's contribution alone.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn score_span(&self, start: usize, relevant_before: usize, labels: &[u32]) -> f64 {
        let cutoff = self.config.cutoff.unwrap_or(usize::MAX);
        let mut ranked = labels
            .iter()
            .enumerate()
            .map(|(i, &label)| (start + i, label))
            .take_while(|&(rank, _)| rank < cutoff);
        match self.config.kind {
            MetricKind::Ndcg => {
                let dcg = ranked
                    .map(|(rank, label)| gain(label) / (rank_of(rank) + 1.0).log2())
                    .sum::<f64>();
                dcg / self.normalizer
            }
            MetricKind::AveragePrecision => {
                let mut hits = relevant_before;
                let mut sum_precision = 0.0;
                for (rank, label) in ranked {
                    if label > 0 {
                        hits += 1;
                        sum_precision += hits as f64 / rank_of(rank);
                    }
                }
                sum_precision / self.normalizer
            }
            MetricKind::ReciprocalRank if relevant_before > 0 => 0.0,
            MetricKind::ReciprocalRank => ranked
                .find(|&(_, label)| label > 0)
                .map_or(0.0, |(rank, _)| 1.0 / rank_of(rank)),
        }
    }
}

/// Document indices ordered by score, descending; ties keep input order.
///
/// `-0.0` and `0.0` tie. NaN scores are ordered deterministically by their bit pattern.
#[must_use]
pub fn rank_by_score(scores: &[f64]) -> Vec<usize> {
    let mut order = (0..scores.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or_else(|| scores[b].total_cmp(&scores[a]))
    });
    order
}

/// Mean over the queries that contribute (`Some`), summed in query order.
///
/// Returns `0.0` when no query contributes.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn mean_of_contributing(values: &[Option<f64>]) -> f64 {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0_usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Dataset-level metric of `scores` (one per document, in dataset order).
#[must_use]
pub fn evaluate_dataset(config: MetricConfig, dataset: &Dataset, scores: &[f64]) -> f64 {
    MetricEvaluator::new(config, dataset).evaluate(scores)
}

/// A metric prepared for one dataset: per-query normalizers, labels and document ranges.
///
/// Score slices passed to its methods cover every document of the dataset, in dataset
/// order (the order of [`Dataset::documents`]).
#[derive(Debug, Clone)]
pub struct MetricEvaluator {
    config: MetricConfig,
    labels: Vec<u32>,
    ranges: Vec<Range<usize>>,
    queries: Vec<Option<QueryMetric>>,
}

impl MetricEvaluator {
    #[must_use]
    pub fn new(config: MetricConfig, dataset: &Dataset) -> Self {
        let mut labels = Vec::with_capacity(dataset.document_count());
        let mut ranges = Vec::with_capacity(dataset.queries().len());
        let mut queries = Vec::with_capacity(dataset.queries().len());
        for query in dataset.queries() {
            let start = labels.len();
            labels.extend(query.labels());
            ranges.push(start..labels.len());
            queries.push(config.prepare(query.labels()));
        }
        Self {
            config,
            labels,
            ranges,
            queries,
        }
    }

    #[must_use]
    pub fn config(&self) -> MetricConfig {
        self.config
    }

    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.len()
    }

    /// Number of queries that take part in the dataset mean.
    #[must_use]
    pub fn contributing_count(&self) -> usize {
        self.queries.iter().flatten().count()
    }

    /// Document range of query `q` within a dataset-wide score slice.
    #[must_use]
    pub fn query_range(&self, q: usize) -> Range<usize> {
        self.ranges[q].clone()
    }

    #[must_use]
    pub fn query_labels(&self, q: usize) -> &[u32] {
        &self.labels[self.ranges[q].clone()]
    }

    /// Prepared metric of query `q`, or `None` if it does not contribute.
    #[must_use]
    pub fn query_metric(&self, q: usize) -> Option<&QueryMetric> {
        self.queries[q].as_ref()
    }

    /// Metric of query `q` given the scores of that query's documents only.
    #[must_use]
    pub fn evaluate_query(&self, q: usize, query_scores: &[f64]) -> Option<f64> {
        let metric = self.queries[q].as_ref()?;
        let labels = self.query_labels(q);
        debug_assert_eq!(labels.len(), query_scores.len());
        Some(metric.score_ranked(rank_by_score(query_scores).into_iter().map(|i| labels[i])))
    }

    /// Per-query metric values for dataset-wide scores.
    ///
    /// # Panics
    ///
    /// Panics if `scores` does not cover every document.
    #[must_use]
    pub fn per_query(&self, scores: &[f64]) -> Vec<Option<f64>> {
        assert_eq!(scores.len(), self.labels.len());
        (0..self.queries.len())
            .map(|q| self.evaluate_query(q, &scores[self.ranges[q].clone()]))
            .collect()
    }

    /// Takes the normalizer of every query listed in `judgments` from its judged documents.
    ///
    /// `dataset` must be the dataset this evaluator was built for. Queries missing from
    /// `judgments` keep their dataset normalizer; queries judged without any relevant
    /// document stop contributing.
    #[must_use]
    pub fn with_judgments(mut self, dataset: &Dataset, judgments: &Judgments) -> Self {
        debug_assert_eq!(dataset.queries().len(), self.queries.len());
        for (slot, query) in self.queries.iter_mut().zip(dataset.queries()) {
            if let Some(judged) = judgments.query(query.id()) {
                *slot = self.config.prepare(judged.gains());
            }
        }
        self
    }

    /// Dataset-level metric: mean over contributing queries.
    #[must_use]
    pub fn evaluate(&self, scores: &[f64]) -> f64 {
        mean_of_contributing(&self.per_query(scores))
    }
}

#[expect(clippy::cast_precision_loss)]
fn rank_of(index: usize) -> f64 {
    (index + 1) as f64
}

fn take_cutoff<I>(labels: I, cutoff: Option<usize>) -> impl Iterator<Item = u32>
where
    I: Iterator<Item = u32>,
{
    labels.take(cutoff.unwrap_or(usize::MAX))
}

fn dcg<I>(ranked_labels: I, cutoff: Option<usize>) -> f64
where
    I: IntoIterator<Item = u32>,
{
    take_cutoff(ranked_labels.into_iter(), cutoff)
        .enumerate()
        .map(|(i, label)| gain(label) / (rank_of(i) + 1.0).log2())
        .sum()
}

fn gain(label: u32) -> f64 {
    f64::from(label).exp2() - 1.0
}
