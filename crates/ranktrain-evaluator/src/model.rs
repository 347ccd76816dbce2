//! Trained ranking models.
//!
//! Every model maps a [`Document`] to a real score through [`Model::score`]; higher scores
//! rank first. Models are plain immutable values once a trainer returns them, and they
//! serialize with `serde` so they can be stored and reloaded bit-exactly.
//!
//! # Linear model
//!
//! ```text
//! score(doc) = Σ weight[f] × doc[f]      (summed in ascending feature id order)
//! ```
//!
//! # Tree ensemble
//!
//! Each [`Tree`] is an arena of [`Node`]s addressed by [`NodeId`], root at index 0. A split
//! node sends a document left when its feature value is `<= threshold`. The ensemble score
//! is the mean of the leaf values the document reaches, summed in tree order.

use std::{collections::BTreeMap, fmt};

use ranktrain_data::{Dataset, Document, FeatureId};
use serde::{Deserialize, Serialize};

use crate::{MetricConfig, evaluate_dataset};

/// Scores documents.
pub trait Model: fmt::Debug + Send + Sync {
    /// Score of one document (higher ranks first).
    fn score(&self, doc: &Document) -> f64;
}

/// Scores every document of `dataset`, in dataset order.
pub fn score_all<M>(model: &M, dataset: &Dataset) -> Vec<f64>
where
    M: Model + ?Sized,
{
    dataset.documents().map(|doc| model.score(doc)).collect()
}

/// Dataset-level metric of the ranking `model` induces on `dataset`.
pub fn evaluate_model<M>(config: MetricConfig, dataset: &Dataset, model: &M) -> f64
where
    M: Model + ?Sized,
{
    evaluate_dataset(config, dataset, &score_all(model, dataset))
}

/// A weighted sum of feature values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    weights: BTreeMap<FeatureId, f64>,
}

impl LinearModel {
    #[must_use]
    pub fn new(weights: BTreeMap<FeatureId, f64>) -> Self {
        Self { weights }
    }

    #[must_use]
    pub fn from_pairs<I>(weights: I) -> Self
    where
        I: IntoIterator<Item = (FeatureId, f64)>,
    {
        Self::new(weights.into_iter().collect())
    }

    #[must_use]
    pub fn weights(&self) -> &BTreeMap<FeatureId, f64> {
        &self.weights
    }

    /// Weight of feature `id`; features without a weight count as `0.0`.
    #[must_use]
    pub fn weight(&self, id: FeatureId) -> f64 {
        self.weights.get(&id).copied().unwrap_or(0.0)
    }
}

impl Model for LinearModel {
    fn score(&self, doc: &Document) -> f64 {
        doc.features()
            .iter()
            .map(|(id, value)| self.weight(*id) * value)
            .sum()
    }
}

/// Index of a node inside its tree's arena.
pub type NodeId = u32;

/// A tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: FeatureId,
        threshold: f64,
        left: NodeId,
        right: NodeId,
    },
    Leaf {
        value: f64,
    },
}

/// A tree arena that breaks the pre-order layout.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum InvalidTreeError {
    #[display("a tree needs at least a root node")]
    Empty,
    #[display("node {node}: child index {child} out of range")]
    ChildOutOfRange { node: usize, child: NodeId },
    #[display("node {node}: child {child} does not come after its parent")]
    ChildBeforeParent { node: usize, child: NodeId },
}

/// A regression tree stored as a flat node arena (root = node 0).
///
/// Every child index is greater than its parent's index, so routing a document always
/// terminates. Deserialization checks the layout too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TreeNodes")]
pub struct Tree {
    nodes: Vec<Node>,
}

#[derive(Deserialize)]
struct TreeNodes {
    nodes: Vec<Node>,
}

impl TryFrom<TreeNodes> for Tree {
    type Error = InvalidTreeError;

    fn try_from(raw: TreeNodes) -> Result<Self, Self::Error> {
        Self::try_from(raw.nodes)
    }
}

impl TryFrom<Vec<Node>> for Tree {
    type Error = InvalidTreeError;

    fn try_from(nodes: Vec<Node>) -> Result<Self, Self::Error> {
        if nodes.is_empty() {
            return Err(InvalidTreeError::Empty);
        }
        for (node, entry) in nodes.iter().enumerate() {
            let Node::Split { left, right, .. } = entry else {
                continue;
            };
            for &child in [left, right] {
                if child as usize >= nodes.len() {
                    return Err(InvalidTreeError::ChildOutOfRange { node, child });
                }
                if child as usize <= node {
                    return Err(InvalidTreeError::ChildBeforeParent { node, child });
                }
            }
        }
        Ok(Self { nodes })
    }
}

impl Tree {
    /// Creates a tree from a pre-order arena.
    ///
    /// # Panics
    ///
    /// Panics if the arena is empty or a child index is out of range or not after its parent.
    #[must_use]
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        match Self::try_from(nodes) {
            Ok(tree) => tree,
            Err(error) => panic!("{error}"),
        }
    }

    /// A tree consisting of a single leaf.
    #[must_use]
    pub fn leaf(value: f64) -> Self {
        Self {
            nodes: vec![Node::Leaf { value }],
        }
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of split levels on the longest root-to-leaf path.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0, 0)];
        while let Some((node, depth)) = stack.pop() {
            match &self.nodes[node as usize] {
                Node::Split { left, right, .. } => {
                    stack.push((*left, depth + 1));
                    stack.push((*right, depth + 1));
                }
                Node::Leaf { .. } => max_depth = usize::max(max_depth, depth),
            }
        }
        max_depth
    }

    /// Leaf value reached by `doc`.
    #[must_use]
    pub fn predict(&self, doc: &Document) -> f64 {
        let mut node = 0;
        loop {
            match &self.nodes[node as usize] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => node = if doc.feature(*feature) <= *threshold { *left } else { *right },
                Node::Leaf { value } => return *value,
            }
        }
    }
}

/// The mean of a sequence of trees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    trees: Vec<Tree>,
}

impl TreeEnsemble {
    #[must_use]
    pub fn new(trees: Vec<Tree>) -> Self {
        Self { trees }
    }

    #[must_use]
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }
}

impl Model for TreeEnsemble {
    #[expect(clippy::cast_precision_loss)]
    fn score(&self, doc: &Document) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum = self.trees.iter().map(|tree| tree.predict(doc)).sum::<f64>();
        sum / self.trees.len() as f64
    }
}

/// Any trained model, as persisted in model files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Linear(LinearModel),
    Forest(TreeEnsemble),
}

impl Model for ModelKind {
    fn score(&self, doc: &Document) -> f64 {
        match self {
            Self::Linear(model) => model.score(doc),
            Self::Forest(model) => model.score(doc),
        }
    }
}

impl From<LinearModel> for ModelKind {
    fn from(model: LinearModel) -> Self {
        Self::Linear(model)
    }
}

impl From<TreeEnsemble> for ModelKind {
    fn from(model: TreeEnsemble) -> Self {
        Self::Forest(model)
    }
}
