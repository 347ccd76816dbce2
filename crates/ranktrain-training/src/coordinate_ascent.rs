//! Coordinate ascent for linear ranking models.
//!
//! The trainer maximizes a ranking metric directly over the weights of a [`LinearModel`],
//! one weight (coordinate) at a time.
//!
//! # Exact line search
//!
//! Fix every weight but `w_j`. Each document's score is then a line in `w_j`:
//!
//! ```text
//! score_d(w_j) = base_d + w_j · x_dj        base_d = score_d - w_j · x_dj
//! ```
//!
//! Two documents `a` and `b` swap places where their lines cross:
//!
//! ```text
//! w* = (base_b - base_a) / (x_aj - x_bj)
//! ```
//!
//! Between consecutive crossings the query's ranking (and therefore its metric) is constant,
//! so each query's metric is a step function of `w_j`. The trainer walks a query's crossings
//! in ascending order, keeping the ranking of the current interval. Documents whose lines
//! meet at a crossing occupy a contiguous block of ranks; only that block is reordered, and
//! the metric changes by the change of the block's contribution. Crossings that leave the
//! labels of the block in place (equally relevant documents swapping, or blocks below the
//! cutoff) are dropped, so a query contributes one event per point where its metric can
//! change.
//!
//! The dataset metric is the sum of these step functions. A sweep over all crossings of all
//! queries, sorted by `(value, query index)`, adds up the per-query changes and yields the
//! dataset value at every global crossing and every global interval midpoint. The best
//! candidate wins; candidates within `1e-12` of the best count as tied, and the one closest to
//! the current weight is taken. The weight moves only when the exactly re-evaluated metric
//! beats the current one by more than `tolerance`.
//!
//! # Restarts
//!
//! - Restart 0 starts from uniform weights `1/F` and visits coordinates by feature id.
//! - Restart `r > 0` draws weights from `N(0, 1)` and visits coordinates in a shuffled order,
//!   both from the generator `derive_rng(seed, r)`.
//!
//! A restart ends after `max_sweeps` sweeps or after a sweep that improved the training
//! metric by less than `tolerance`. The returned model is the restart with the best
//! validation metric (training metric without a validation set); the earlier restart wins
//! ties.

use std::ops::Range;

use ranktrain_data::{Dataset, FeatureMatrix};
use ranktrain_evaluator::{LinearModel, MetricConfig, MetricEvaluator, rank_by_score};
use ranktrain_stats::descriptive::DescriptiveStats;
use serde::{Deserialize, Serialize};

use crate::{
    ConfigError, HeldOut, TraceEntry, TrainError, Trained, TrainingData, parallel,
    seed::derive_rng, weights,
};

/// Candidates whose dataset metric is this close to the best one are tied.
const TIE_EPSILON: f64 = 1e-12;
/// Largest metric drop within a sweep attributed to rounding.
const DECREASE_EPSILON: f64 = 1e-9;

/// Coordinate ascent configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateAscentParams {
    /// Number of independent starts (restart 0 is the uniform start).
    pub restarts: usize,
    /// Upper bound on sweeps per restart.
    pub max_sweeps: usize,
    /// Minimum metric gain for accepting a weight change and for continuing the restart.
    pub tolerance: f64,
    /// Rescale the final weights so that their absolute values sum to 1.
    pub normalize_weights: bool,
    pub seed: u64,
    /// Worker threads for the per-query line search. Does not change results.
    pub threads: usize,
}

impl Default for CoordinateAscentParams {
    fn default() -> Self {
        Self {
            restarts: 5,
            max_sweeps: 25,
            tolerance: 1e-3,
            normalize_weights: false,
            seed: 42,
            threads: 1,
        }
    }
}

impl CoordinateAscentParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.restarts == 0 {
            return Err(ConfigError::ZeroRestarts);
        }
        if self.max_sweeps == 0 {
            return Err(ConfigError::ZeroSweeps);
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(ConfigError::Tolerance {
                value: self.tolerance,
            });
        }
        if self.threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        Ok(())
    }
}

/// Trains [`LinearModel`]s by coordinate ascent on a ranking metric.
#[derive(Debug, Clone)]
pub struct CoordinateAscentTrainer {
    metric: MetricConfig,
    params: CoordinateAscentParams,
}

impl CoordinateAscentTrainer {
    pub fn new(metric: MetricConfig, params: CoordinateAscentParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { metric, params })
    }

    #[must_use]
    pub fn metric(&self) -> MetricConfig {
        self.metric
    }

    #[must_use]
    pub fn params(&self) -> &CoordinateAscentParams {
        &self.params
    }

    pub fn train(&self, data: &TrainingData<'_>) -> Result<Trained<LinearModel>, TrainError> {
        self.train_with_progress(data, |_| {})
    }

    /// Trains a model, calling `progress` once per completed sweep.
    pub fn train_with_progress<F>(
        &self,
        data: &TrainingData<'_>,
        mut progress: F,
    ) -> Result<Trained<LinearModel>, TrainError>
    where
        F: FnMut(&TraceEntry),
    {
        data.check_train()?;
        let search = LineSearch::new(self.metric, data.train, &self.params);
        let validation = data.validation.map(|dataset| HeldOut::new(self.metric, dataset));
        let test = data.test.map(|dataset| HeldOut::new(self.metric, dataset));
        if search.matrix.feature_count() == 0 {
            tracing::warn!(dataset = data.train.name(), "no features to weight");
        }

        let report = |restart, step, train, weights: &[f64]| {
            let model = search.model(weights);
            TraceEntry {
                restart,
                step,
                train,
                validation: validation.as_ref().map(|v| v.evaluate(&model)),
                test: test.as_ref().map(|t| t.evaluate(&model)),
            }
        };

        let mut trace = vec![];
        let mut best: Option<(Vec<f64>, TraceEntry)> = None;
        let mut selection_values = vec![];
        for restart in 0..self.params.restarts {
            let (initial, order) = search.initial_state(restart);
            let mut state = search.start(initial);
            let mut last = report(restart, 0, state.metric, &state.weights);

            for sweep in 1..=self.params.max_sweeps {
                let start = state.metric;
                for &column in &order {
                    search.update_coordinate(&mut state, column);
                }
                debug_assert!(
                    state.metric >= start - DECREASE_EPSILON,
                    "sweep decreased the training metric from {start} to {}",
                    state.metric
                );

                last = report(restart, sweep, state.metric, &state.weights);
                progress(&last);
                trace.push(last);
                if state.metric - start < self.params.tolerance {
                    break;
                }
            }

            let value = selection_value(&last);
            tracing::debug!(restart, train = last.train, selection = value, "restart finished");
            selection_values.push(value);
            if best
                .as_ref()
                .is_none_or(|(_, entry)| value > selection_value(entry))
            {
                best = Some((state.weights, last));
            }
        }

        let Some((mut weights, entry)) = best else {
            unreachable!("restarts is validated to be at least 1");
        };
        if let Some(stats) = DescriptiveStats::new(selection_values) {
            tracing::info!(
                restarts = stats.count,
                best = stats.max,
                mean = stats.mean,
                std_dev = stats.std_dev,
                selected = entry.restart,
                "coordinate ascent finished"
            );
        }
        if self.params.normalize_weights {
            weights::normalize_l1(&mut weights);
        }
        let model = search.model(&weights);
        let summary = TraceEntry {
            train: HeldOut::new(self.metric, data.train).evaluate(&model),
            validation: validation.as_ref().map(|v| v.evaluate(&model)),
            test: test.as_ref().map(|t| t.evaluate(&model)),
            ..entry
        };
        Ok(Trained {
            model,
            trace,
            summary,
        })
    }
}

fn selection_value(entry: &TraceEntry) -> f64 {
    entry.validation.unwrap_or(entry.train)
}

/// Weights with the training scores and metric they produce.
#[derive(Debug, Clone)]
struct State {
    weights: Vec<f64>,
    scores: Vec<f64>,
    metric: f64,
}

/// A change of one query's metric at a crossing point of the coordinate.
#[derive(Debug, Clone, Copy)]
struct StepEvent {
    at: f64,
    query: usize,
    /// Metric on the interval just below `at`.
    before: f64,
    /// Metric at `at` itself (tied scores).
    point: f64,
    /// Metric on the interval just above `at`.
    after: f64,
}

#[derive(Debug)]
struct LineSearch<'a> {
    matrix: FeatureMatrix,
    evaluator: MetricEvaluator,
    params: &'a CoordinateAscentParams,
}

impl<'a> LineSearch<'a> {
    fn new(metric: MetricConfig, dataset: &Dataset, params: &'a CoordinateAscentParams) -> Self {
        Self {
            matrix: FeatureMatrix::new(dataset),
            evaluator: MetricEvaluator::new(metric, dataset),
            params,
        }
    }

    fn initial_state(&self, restart: usize) -> (Vec<f64>, Vec<usize>) {
        let feature_count = self.matrix.feature_count();
        if restart == 0 {
            return (weights::uniform(feature_count), (0..feature_count).collect());
        }
        let mut rng = derive_rng(self.params.seed, restart);
        let initial = weights::gaussian(&mut rng, feature_count);
        let order = weights::shuffled_order(&mut rng, feature_count);
        (initial, order)
    }

    fn start(&self, weights: Vec<f64>) -> State {
        let scores = self.scores(&weights);
        let metric = self.evaluator.evaluate(&scores);
        State {
            weights,
            scores,
            metric,
        }
    }

    fn model(&self, weights: &[f64]) -> LinearModel {
        let ids = self.matrix.feature_ids().iter().copied();
        LinearModel::from_pairs(ids.zip(weights.iter().copied()))
    }

    /// Training scores, summed in feature id order like [`LinearModel`] does.
    fn scores(&self, weights: &[f64]) -> Vec<f64> {
        (0..self.matrix.document_count())
            .map(|doc| {
                self.matrix
                    .row(doc)
                    .iter()
                    .zip(weights)
                    .map(|(x, w)| w * x)
                    .sum()
            })
            .collect()
    }

    fn update_coordinate(&self, state: &mut State, column: usize) {
        let current = state.weights[column];
        let snapshot: &State = state;
        let steps = parallel::map_indexed(self.evaluator.query_count(), self.params.threads, |q| {
            self.query_steps(snapshot, column, q)
        });
        let Some(candidate) = best_candidate(&steps, current) else {
            tracing::debug!(
                feature = %self.matrix.feature_ids()[column],
                "no ranking changes along coordinate; skipped"
            );
            return;
        };
        if candidate.total_cmp(&current).is_eq() {
            return;
        }

        let mut weights = state.weights.clone();
        weights[column] = candidate;
        let scores = self.scores(&weights);
        let metric = self.evaluator.evaluate(&scores);
        if metric > state.metric + self.params.tolerance {
            tracing::trace!(
                feature = %self.matrix.feature_ids()[column],
                from = current,
                to = candidate,
                metric,
                "weight updated"
            );
            *state = State {
                weights,
                scores,
                metric,
            };
        }
    }

    /// Step function of query `q`'s metric along coordinate `column`, as the crossings where
    /// it can change.
    ///
    /// Walks the crossings in ascending order keeping the ranking of the current interval.
    /// At each crossing only the block of ranks holding the crossing documents is reordered,
    /// and the metric moves by the change of that block's contribution.
    fn query_steps(&self, state: &State, column: usize, q: usize) -> Vec<StepEvent> {
        let Some(metric) = self.evaluator.query_metric(q) else {
            return vec![];
        };
        let range: Range<usize> = self.evaluator.query_range(q);
        let labels = self.evaluator.query_labels(q);
        let weight = state.weights[column];
        let xs = range
            .clone()
            .map(|doc| self.matrix.value(doc, column))
            .collect::<Vec<_>>();
        let bases = range
            .zip(&xs)
            .map(|(doc, x)| state.scores[doc] - weight * x)
            .collect::<Vec<_>>();
        let score = |doc: usize, w: f64| bases[doc] + w * xs[doc];

        let crossings = crossings(&xs, &bases);
        let groups = crossings
            .chunk_by(|a, b| a.at.total_cmp(&b.at).is_eq())
            .collect::<Vec<_>>();
        let Some(first) = groups.first() else {
            return vec![];
        };

        let below = first[0].at - 1.0;
        let mut order = rank_docs((0..xs.len()).collect(), |doc| score(doc, below));
        let mut position = vec![0; order.len()];
        // relevant_above[r]: relevant documents among the first r ranks
        let mut relevant_above = vec![0; order.len() + 1];
        for (rank, &doc) in order.iter().enumerate() {
            position[doc] = rank;
            relevant_above[rank + 1] = relevant_above[rank] + usize::from(labels[doc] > 0);
        }
        let cutoff = metric.config().cutoff.unwrap_or(usize::MAX);
        let mut value = metric.score_ranked(order.iter().map(|&doc| labels[doc]));

        let mut events = vec![];
        for (g, group) in groups.iter().enumerate() {
            let at = group[0].at;
            let above = groups
                .get(g + 1)
                .map_or(at + 1.0, |next| midpoint(at, next[0].at));
            let (lo, hi) = group
                .iter()
                .flat_map(|c| [position[c.a], position[c.b]])
                .fold((usize::MAX, 0), |(lo, hi), rank| (lo.min(rank), hi.max(rank)));
            let block = &order[lo..=hi];
            let reordered = rank_docs(block.to_vec(), |doc| score(doc, above));

            if lo < cutoff {
                let block_labels = |docs: &[usize]| {
                    docs.iter().map(|&doc| labels[doc]).collect::<Vec<_>>()
                };
                let current = block_labels(block);
                let tied = block_labels(&rank_docs(block.to_vec(), |doc| score(doc, at)));
                let next = block_labels(&reordered);
                if tied != current || next != current {
                    let relevant = relevant_above[lo];
                    let rest = value - metric.score_span(lo, relevant, &current);
                    let event = StepEvent {
                        at,
                        query: q,
                        before: value,
                        point: rest + metric.score_span(lo, relevant, &tied),
                        after: rest + metric.score_span(lo, relevant, &next),
                    };
                    value = event.after;
                    events.push(event);
                }
            }

            for (offset, &doc) in reordered.iter().enumerate() {
                let rank = lo + offset;
                order[rank] = doc;
                position[doc] = rank;
                relevant_above[rank + 1] = relevant_above[rank] + usize::from(labels[doc] > 0);
            }
        }
        events
    }
}

/// Coordinate value at which the score lines of documents `a` and `b` meet.
#[derive(Debug, Clone, Copy)]
struct Crossing {
    at: f64,
    a: usize,
    b: usize,
}

/// Crossings of every pair of non-parallel score lines, in ascending order.
fn crossings(xs: &[f64], bases: &[f64]) -> Vec<Crossing> {
    let mut crossings = vec![];
    for a in 0..xs.len() {
        for b in a + 1..xs.len() {
            let dx = xs[a] - xs[b];
            if dx == 0.0 {
                continue;
            }
            let at = (bases[b] - bases[a]) / dx;
            if at.is_finite() {
                // -0.0 and 0.0 are one crossing
                let at = if at == 0.0 { 0.0 } else { at };
                crossings.push(Crossing { at, a, b });
            }
        }
    }
    crossings.sort_by(|l, r| l.at.total_cmp(&r.at));
    crossings
}

/// Orders `docs` the way [`rank_by_score`] orders a query: by score, descending, with ties
/// in document order.
fn rank_docs<F>(mut docs: Vec<usize>, score: F) -> Vec<usize>
where
    F: Fn(usize) -> f64,
{
    docs.sort_unstable();
    let scores = docs.iter().map(|&doc| score(doc)).collect::<Vec<_>>();
    rank_by_score(&scores).into_iter().map(|i| docs[i]).collect()
}

fn midpoint(a: f64, b: f64) -> f64 {
    a + (b - a) / 2.0
}

/// Best coordinate value over all queries' step functions, or `None` without crossings.
///
/// `steps` holds each query's events, in query order and ascending position.
fn best_candidate(steps: &[Vec<StepEvent>], current: f64) -> Option<f64> {
    let mut events = steps.iter().flatten().collect::<Vec<_>>();
    if events.is_empty() {
        return None;
    }
    events.sort_by(|a, b| a.at.total_cmp(&b.at).then(a.query.cmp(&b.query)));

    // queries without crossings add the same constant everywhere and are left out
    let mut level = steps
        .iter()
        .filter_map(|events| events.first())
        .map(|event| event.before)
        .sum::<f64>();
    let mut candidates = vec![(events[0].at - 1.0, level)];
    let mut i = 0;
    while i < events.len() {
        let at = events[i].at;
        let mut point = level;
        let mut next = level;
        while i < events.len() && events[i].at.total_cmp(&at).is_eq() {
            point += events[i].point - events[i].before;
            next += events[i].after - events[i].before;
            i += 1;
        }
        candidates.push((at, point));
        let above = events.get(i).map_or(at + 1.0, |event| midpoint(at, event.at));
        candidates.push((above, next));
        level = next;
    }

    let best = candidates
        .iter()
        .map(|(_, total)| *total)
        .fold(f64::NEG_INFINITY, f64::max);
    candidates
        .iter()
        .filter(|(_, total)| *total >= best - TIE_EPSILON)
        .min_by(|a, b| (a.0 - current).abs().total_cmp(&(b.0 - current).abs()))
        .map(|(value, _)| *value)
}

#[cfg(test)]
mod tests {
    use rand::{Rng as _, SeedableRng as _};
    use rand_pcg::Pcg64;
    use ranktrain_evaluator::{Model as _, score_all};

    use super::*;
    use crate::testing::{fid, synthetic};

    fn trainer(params: CoordinateAscentParams) -> CoordinateAscentTrainer {
        CoordinateAscentTrainer::new(MetricConfig::ndcg(10), params).unwrap()
    }

    #[test]
    fn test_validation() {
        let invalid = [
            CoordinateAscentParams {
                restarts: 0,
                ..Default::default()
            },
            CoordinateAscentParams {
                max_sweeps: 0,
                ..Default::default()
            },
            CoordinateAscentParams {
                tolerance: 0.0,
                ..Default::default()
            },
            CoordinateAscentParams {
                tolerance: f64::NAN,
                ..Default::default()
            },
            CoordinateAscentParams {
                threads: 0,
                ..Default::default()
            },
        ];
        for params in invalid {
            assert!(CoordinateAscentTrainer::new(MetricConfig::ndcg(10), params).is_err());
        }
    }

    #[test]
    fn test_sweeps_never_decrease_within_restart() {
        let dataset = synthetic(1, 20, 8);
        let trained = trainer(CoordinateAscentParams {
            restarts: 3,
            ..Default::default()
        })
        .train(&TrainingData::new(&dataset))
        .unwrap();
        for pair in trained.trace.windows(2) {
            if pair[0].restart == pair[1].restart {
                assert_eq!(pair[1].step, pair[0].step + 1);
                assert!(pair[1].train >= pair[0].train - DECREASE_EPSILON);
            }
        }
        assert!(trained.trace.iter().all(|e| e.step >= 1));
    }

    #[test]
    fn test_learns_relevant_feature() {
        let dataset = synthetic(2, 30, 10);
        let trained = trainer(CoordinateAscentParams::default())
            .train(&TrainingData::new(&dataset))
            .unwrap();
        assert!(trained.summary.train > 0.95, "{:?}", trained.summary);
        let model = &trained.model;
        assert!(model.weight(fid(1)).abs() > model.weight(fid(2)).abs());
    }

    #[test]
    fn test_summary_matches_model_scores() {
        let dataset = synthetic(3, 10, 6);
        let trained = trainer(CoordinateAscentParams::default())
            .train(&TrainingData::new(&dataset))
            .unwrap();
        let evaluator = MetricEvaluator::new(MetricConfig::ndcg(10), &dataset);
        let metric = evaluator.evaluate(&score_all(&trained.model, &dataset));
        assert_eq!(trained.summary.train, metric);
    }

    #[test]
    fn test_deterministic_across_threads() {
        let dataset = synthetic(4, 15, 7);
        let validation = synthetic(5, 5, 7);
        let data = TrainingData::new(&dataset).with_validation(Some(&validation));
        let run = |threads| {
            trainer(CoordinateAscentParams {
                restarts: 3,
                threads,
                ..Default::default()
            })
            .train(&data)
            .unwrap()
        };
        let single = run(1);
        for threads in [2, 4] {
            let multi = run(threads);
            assert_eq!(multi, single);
            assert_eq!(
                serde_json::to_string(&multi.model).unwrap(),
                serde_json::to_string(&single.model).unwrap()
            );
        }
    }

    #[test]
    fn test_restart_selection_uses_validation() {
        let dataset = synthetic(6, 12, 6);
        let validation = synthetic(7, 12, 6);
        let trained = trainer(CoordinateAscentParams {
            restarts: 4,
            ..Default::default()
        })
        .train(&TrainingData::new(&dataset).with_validation(Some(&validation)))
        .unwrap();
        let best = trained
            .trace
            .iter()
            .map(|e| e.validation.unwrap())
            .fold(f64::NEG_INFINITY, f64::max);
        // the selected restart ended on one of the restart-final entries
        assert!(trained.summary.validation.unwrap() <= best + 1e-12);
        assert!(trained.trace.iter().all(|e| e.test.is_none()));
    }

    #[test]
    fn test_normalized_weights() {
        let dataset = synthetic(8, 10, 8);
        let params = CoordinateAscentParams {
            restarts: 2,
            ..Default::default()
        };
        let plain = trainer(params.clone())
            .train(&TrainingData::new(&dataset))
            .unwrap();
        let normalized = trainer(CoordinateAscentParams {
            normalize_weights: true,
            ..params
        })
        .train(&TrainingData::new(&dataset))
        .unwrap();
        let norm = normalized
            .model
            .weights()
            .values()
            .map(|w| w.abs())
            .sum::<f64>();
        assert!((norm - 1.0).abs() < 1e-12);
        assert_eq!(normalized.trace, plain.trace);
        assert!((normalized.summary.train - plain.summary.train).abs() < 1e-12);
    }

    #[test]
    fn test_normalization_keeps_rankings() {
        let mut rng = Pcg64::seed_from_u64(9);
        for round in 0..20 {
            let dataset = synthetic(100 + round, 5, 6);
            let mut w = (0..3).map(|_| rng.random_range(-5.0..5.0)).collect::<Vec<f64>>();
            let before = LinearModel::from_pairs((1..=3).map(fid).zip(w.iter().copied()));
            weights::normalize_l1(&mut w);
            let after = LinearModel::from_pairs((1..=3).map(fid).zip(w.iter().copied()));
            for query in dataset.queries() {
                let rank = |model: &LinearModel| {
                    let scores = query
                        .documents()
                        .iter()
                        .map(|doc| model.score(doc))
                        .collect::<Vec<_>>();
                    rank_by_score(&scores)
                };
                assert_eq!(rank(&before), rank(&after));
            }
        }
    }

    #[test]
    fn test_constant_coordinate_is_left_alone() {
        let dataset = synthetic(10, 8, 5);
        let trained = trainer(CoordinateAscentParams {
            restarts: 1,
            ..Default::default()
        })
        .train(&TrainingData::new(&dataset))
        .unwrap();
        // f3 never reorders documents within a query; restart 0 starts at 1/3
        assert_eq!(trained.model.weight(fid(3)), 1.0 / 3.0);
    }

    /// Value of a step function given by its events at coordinate value `w`.
    fn step_value(events: &[StepEvent], w: f64) -> f64 {
        let mut value = events[0].before;
        for event in events {
            match w.total_cmp(&event.at) {
                std::cmp::Ordering::Less => break,
                std::cmp::Ordering::Equal => return event.point,
                std::cmp::Ordering::Greater => value = event.after,
            }
        }
        value
    }

    #[test]
    fn test_query_steps_match_full_rankings() {
        let mut rng = Pcg64::seed_from_u64(12);
        let metrics = ["NDCG@3", "NDCG@10", "MAP", "RR@5"];
        let params = CoordinateAscentParams::default();
        let mut event_count = 0;
        for (round, name) in (200..).zip(metrics) {
            let metric = name.parse::<MetricConfig>().unwrap();
            let dataset = synthetic(round, 4, 9);
            let search = LineSearch::new(metric, &dataset, &params);
            let state = search.start((0..3).map(|_| rng.random_range(-2.0..2.0)).collect());
            for column in 0..2 {
                for q in 0..search.evaluator.query_count() {
                    let range = search.evaluator.query_range(q);
                    let value_at = |w: f64| {
                        let scores = range
                            .clone()
                            .map(|doc| {
                                let x = search.matrix.value(doc, column);
                                state.scores[doc] - state.weights[column] * x + w * x
                            })
                            .collect::<Vec<_>>();
                        search.evaluator.evaluate_query(q, &scores)
                    };
                    let events = search.query_steps(&state, column, q);
                    let Some(constant) = value_at(0.0) else {
                        assert!(events.is_empty());
                        continue;
                    };
                    event_count += events.len();

                    let mut points = (0..20)
                        .map(|_| rng.random_range(-20.0..20.0))
                        .collect::<Vec<f64>>();
                    if let (Some(first), Some(last)) = (events.first(), events.last()) {
                        points.extend([first.at - 1.0, last.at + 1.0]);
                        points.extend(events.iter().map(|e| e.at));
                        points.extend(events.windows(2).map(|w| midpoint(w[0].at, w[1].at)));
                    }
                    for w in points {
                        let expected = value_at(w).unwrap();
                        let stepped = if events.is_empty() {
                            constant
                        } else {
                            step_value(&events, w)
                        };
                        assert!((stepped - expected).abs() < 1e-9, "{name} q{q} w={w}");
                    }
                }
            }
        }
        assert!(event_count > 0);
    }

    #[test]
    fn test_best_candidate_prefers_closest_tie() {
        let event = |at, query, before, point, after| StepEvent {
            at,
            query,
            before,
            point,
            after,
        };
        // metric 1 only above 2.0
        let steps = vec![vec![event(2.0, 0, 0.0, 0.0, 1.0)]];
        assert_eq!(best_candidate(&steps, 0.0), Some(3.0));
        // flat everywhere: stay as close to the current weight as possible
        let steps = vec![vec![event(2.0, 0, 0.5, 0.5, 0.5)]];
        assert_eq!(best_candidate(&steps, 1.9), Some(2.0));
        // two queries pulling in different directions
        let steps = vec![
            vec![event(-1.0, 0, 1.0, 0.5, 0.0)],
            vec![event(1.0, 1, 0.0, 0.0, 0.4)],
        ];
        assert_eq!(best_candidate(&steps, 5.0), Some(-2.0));
        assert_eq!(best_candidate(&[vec![], vec![]], 0.0), None);
    }
}
