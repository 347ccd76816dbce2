//! Random forests of regression trees over relevance labels.
//!
//! Each tree is grown independently from its own generator `derive_rng(seed, tree)`:
//!
//! 1. **Bagging** - draw `max(1, round(srate · Q))` queries with replacement; the documents of
//!    the drawn queries (repeated as often as their query was drawn) form the root. Queries
//!    never drawn are out of bag.
//! 2. **Partitioning** - a node becomes a leaf holding its mean label when it reaches
//!    `max_depth`, holds fewer than `min_leaf_support` documents, or all its labels are equal.
//!    Otherwise a subspace of `max(1, round(frate · F))` distinct features is drawn and
//!    `split_candidates` random `(feature, threshold)` pairs are tried, each threshold being
//!    the feature value of a random document in the node.
//! 3. **Split scoring** - variance reduction of the labels: squared error of the node minus
//!    the squared error of both children. Trials that leave a child empty are rejected; the
//!    largest reduction wins and the earlier trial wins ties. A node without a valid trial
//!    becomes a leaf.
//!
//! Documents with `value <= threshold` go left, matching [`Tree::predict`].
//!
//! Trees are grown in batches of `threads` on scoped worker threads and collected by tree
//! index. After each batch the metric trace is extended, in tree order, from the running sum
//! of tree predictions.

use std::collections::BTreeMap;

use rand::{Rng, seq::index};
use ranktrain_data::{Dataset, FeatureId, FeatureMatrix};
use ranktrain_evaluator::{MetricConfig, MetricEvaluator, Node, NodeId, Tree, TreeEnsemble};
use ranktrain_stats::{descriptive::DescriptiveStats, moments::SumOfSquares};
use serde::{Deserialize, Serialize};

use crate::{
    ConfigError, TraceEntry, TrainError, Trained, TrainingData, parallel, seed::derive_rng,
};

/// Random forest configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestParams {
    pub num_trees: usize,
    /// Fraction of queries drawn (with replacement) for each tree.
    pub srate: f64,
    /// Fraction of features in each node's random subspace.
    pub frate: f64,
    /// Random split trials per node.
    pub split_candidates: usize,
    /// Depth at which nodes always become leaves; 0 grows single-leaf trees.
    pub max_depth: u32,
    /// Nodes with fewer documents become leaves.
    pub min_leaf_support: usize,
    pub seed: u64,
    /// Worker threads for growing trees. Does not change results.
    pub threads: usize,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            num_trees: 100,
            srate: 0.5,
            frate: 0.25,
            split_candidates: 3,
            max_depth: 8,
            min_leaf_support: 10,
            seed: 42,
            threads: 1,
        }
    }
}

impl RandomForestParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_trees == 0 {
            return Err(ConfigError::ZeroTrees);
        }
        if !is_rate(self.srate) {
            return Err(ConfigError::SamplingRate { value: self.srate });
        }
        if !is_rate(self.frate) {
            return Err(ConfigError::FeatureRate { value: self.frate });
        }
        if self.split_candidates == 0 {
            return Err(ConfigError::SplitCandidates);
        }
        if self.threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        Ok(())
    }
}

fn is_rate(value: f64) -> bool {
    value > 0.0 && value <= 1.0
}

/// Trains [`TreeEnsemble`]s by bagged, randomized regression trees.
#[derive(Debug, Clone)]
pub struct RandomForestTrainer {
    metric: MetricConfig,
    params: RandomForestParams,
}

impl RandomForestTrainer {
    pub fn new(metric: MetricConfig, params: RandomForestParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { metric, params })
    }

    #[must_use]
    pub fn metric(&self) -> MetricConfig {
        self.metric
    }

    #[must_use]
    pub fn params(&self) -> &RandomForestParams {
        &self.params
    }

    pub fn train(&self, data: &TrainingData<'_>) -> Result<Trained<TreeEnsemble>, TrainError> {
        self.train_with_progress(data, |_| {})
    }

    /// Trains a forest, calling `progress` once per tree in tree order.
    ///
    /// Trees are grown in batches of `threads`; progress for a batch is reported once the
    /// whole batch is grown.
    pub fn train_with_progress<F>(
        &self,
        data: &TrainingData<'_>,
        mut progress: F,
    ) -> Result<Trained<TreeEnsemble>, TrainError>
    where
        F: FnMut(&TraceEntry),
    {
        data.check_train()?;
        let matrix = FeatureMatrix::new(data.train);
        if matrix.feature_count() == 0 {
            tracing::warn!(dataset = data.train.name(), "no features to split on");
        }
        let mut train = RunningScores::new(self.metric, data.train);
        let mut validation = data.validation.map(|d| RunningScores::new(self.metric, d));
        let mut test = data.test.map(|d| RunningScores::new(self.metric, d));
        let mut trees = Vec::with_capacity(self.params.num_trees);
        let mut trace = Vec::with_capacity(self.params.num_trees);
        // one tree per worker at a time, so progress keeps up with the growing forest
        while trees.len() < self.params.num_trees {
            let first = trees.len();
            let batch_len = usize::min(self.params.threads, self.params.num_trees - first);
            let batch = parallel::map_indexed(batch_len, self.params.threads, |offset| {
                grow_tree(&matrix, &self.params, first + offset)
            });
            for tree in batch {
                let entry = TraceEntry {
                    restart: 0,
                    step: trees.len() + 1,
                    train: train.add(&tree),
                    validation: validation.as_mut().map(|v| v.add(&tree)),
                    test: test.as_mut().map(|t| t.add(&tree)),
                };
                progress(&entry);
                trace.push(entry);
                trees.push(tree);
            }
        }
        log_forest_summary(data.train, &trees);

        let Some(&summary) = trace.last() else {
            unreachable!("num_trees is validated to be at least 1");
        };
        Ok(Trained {
            model: TreeEnsemble::new(trees),
            trace,
            summary,
        })
    }
}

/// Per-document prediction sums of a growing ensemble over one dataset.
#[derive(Debug)]
struct RunningScores<'a> {
    dataset: &'a Dataset,
    evaluator: MetricEvaluator,
    sums: Vec<f64>,
    trees: usize,
}

impl<'a> RunningScores<'a> {
    fn new(metric: MetricConfig, dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            evaluator: MetricEvaluator::new(metric, dataset),
            sums: vec![0.0; dataset.document_count()],
            trees: 0,
        }
    }

    /// Adds one tree and returns the metric of the ensemble so far.
    #[expect(clippy::cast_precision_loss)]
    fn add(&mut self, tree: &Tree) -> f64 {
        for (sum, doc) in self.sums.iter_mut().zip(self.dataset.documents()) {
            *sum += tree.predict(doc);
        }
        self.trees += 1;
        let count = self.trees as f64;
        let scores = self.sums.iter().map(|sum| sum / count).collect::<Vec<_>>();
        self.evaluator.evaluate(&scores)
    }
}

fn log_forest_summary(dataset: &Dataset, trees: &[Tree]) {
    let mut usage = BTreeMap::<FeatureId, usize>::new();
    for node in trees.iter().flat_map(Tree::nodes) {
        if let Node::Split { feature, .. } = node {
            *usage.entry(*feature).or_default() += 1;
        }
    }
    #[expect(clippy::cast_precision_loss)]
    let depths = trees.iter().map(|tree| tree.depth() as f64);
    if let Some(stats) = DescriptiveStats::new(depths) {
        tracing::info!(
            trees = stats.count,
            mean_depth = stats.mean,
            max_depth = stats.max,
            "random forest finished"
        );
    }
    let mut usage = usage.into_iter().collect::<Vec<_>>();
    usage.sort_by(|a, b| b.1.cmp(&a.1));
    for (feature, splits) in usage {
        tracing::info!(feature = %dataset.feature_name(feature), splits, "split feature usage");
    }
}

/// `max(1, round(rate · total))`.
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn rounded_count(rate: f64, total: usize) -> usize {
    ((rate * total as f64).round() as usize).max(1)
}

fn grow_tree(matrix: &FeatureMatrix, params: &RandomForestParams, index: usize) -> Tree {
    let mut rng = derive_rng(params.seed, index);
    let queries = matrix.query_ranges();
    let mut drawn = vec![false; queries.len()];
    let mut docs = vec![];
    for _ in 0..rounded_count(params.srate, queries.len()) {
        let q = rng.random_range(0..queries.len());
        drawn[q] = true;
        docs.extend(queries[q].clone());
    }
    let out_of_bag = drawn.iter().filter(|drawn| !**drawn).count();
    tracing::debug!(tree = index, documents = docs.len(), out_of_bag, "bootstrap sample drawn");

    let feature_count = matrix.feature_count();
    let mut builder = TreeBuilder {
        matrix,
        params,
        subspace_len: rounded_count(params.frate, feature_count).min(feature_count),
        rng,
        nodes: vec![],
    };
    builder.grow(&docs, 0);
    Tree::from_nodes(builder.nodes)
}

#[derive(Debug, Clone, Copy)]
struct Split {
    column: usize,
    threshold: f64,
    reduction: f64,
}

#[derive(Debug)]
struct TreeBuilder<'a, R> {
    matrix: &'a FeatureMatrix,
    params: &'a RandomForestParams,
    subspace_len: usize,
    rng: R,
    nodes: Vec<Node>,
}

impl<R> TreeBuilder<'_, R>
where
    R: Rng,
{
    fn label(&self, doc: usize) -> f64 {
        f64::from(self.matrix.labels()[doc])
    }

    /// Grows the subtree for `docs` and returns its root.
    fn grow(&mut self, docs: &[usize], depth: u32) -> NodeId {
        let Ok(id) = NodeId::try_from(self.nodes.len()) else {
            panic!("tree has more nodes than NodeId can address");
        };
        // placeholder, patched once the children are known
        self.nodes.push(Node::Leaf { value: 0.0 });

        let labels = docs.iter().map(|&doc| self.label(doc)).collect::<SumOfSquares>();
        let all_labels = self.matrix.labels();
        let uniform = docs
            .first()
            .is_none_or(|&first| docs.iter().all(|&doc| all_labels[doc] == all_labels[first]));
        let splittable = depth < self.params.max_depth
            && docs.len() >= self.params.min_leaf_support
            && !uniform;

        if splittable {
            if let Some(split) = self.best_split(docs, labels) {
                let (left, right): (Vec<usize>, Vec<usize>) = docs
                    .iter()
                    .copied()
                    .partition(|&doc| self.matrix.value(doc, split.column) <= split.threshold);
                let left = self.grow(&left, depth + 1);
                let right = self.grow(&right, depth + 1);
                self.nodes[id as usize] = Node::Split {
                    feature: self.matrix.feature_ids()[split.column],
                    threshold: split.threshold,
                    left,
                    right,
                };
                return id;
            }
            tracing::trace!(depth, documents = docs.len(), "no valid split; leaf emitted");
        }

        self.nodes[id as usize] = Node::Leaf {
            value: labels.mean().unwrap_or(0.0),
        };
        id
    }

    fn best_split(&mut self, docs: &[usize], parent: SumOfSquares) -> Option<Split> {
        if self.subspace_len == 0 {
            return None;
        }
        let subspace = index::sample(&mut self.rng, self.matrix.feature_count(), self.subspace_len)
            .into_vec();
        let mut best: Option<Split> = None;
        for _ in 0..self.params.split_candidates {
            let column = subspace[self.rng.random_range(0..subspace.len())];
            let threshold = self
                .matrix
                .value(docs[self.rng.random_range(0..docs.len())], column);

            let left = docs
                .iter()
                .filter(|&&doc| self.matrix.value(doc, column) <= threshold)
                .map(|&doc| self.label(doc))
                .collect::<SumOfSquares>();
            let right = parent - left;
            if left.count() == 0 || right.count() == 0 {
                continue;
            }
            let reduction = parent.squared_error() - left.squared_error() - right.squared_error();
            if best.is_none_or(|best| reduction > best.reduction) {
                best = Some(Split {
                    column,
                    threshold,
                    reduction,
                });
            }
        }
        best
    }
}
