//! Gradient-boosted regression trees (inference side)
//!
//! Trees are stored as flat node arrays in pre-order, so every child index is
//! greater than its parent's. Loading checks this, which keeps traversal
//! bounded for artifacts that came from disk.

use aprender::metrics::r_squared;
use aprender::primitives::Vector;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One node of a regression tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Internal node: `x[feature] <= threshold` goes left
    Split {
        /// Feature index
        feature: usize,
        /// Split threshold
        threshold: f64,
        /// Index of the left child
        left: usize,
        /// Index of the right child
        right: usize,
    },
    /// Terminal node
    Leaf {
        /// Output value
        value: f64,
    },
}

/// A CART regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Build a tree from pre-ordered nodes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelFormat`] if the structure is malformed.
    pub fn from_nodes(nodes: Vec<TreeNode>, n_features: usize) -> Result<Self> {
        let tree = Self { nodes };
        tree.validate(n_features)?;
        Ok(tree)
    }

    /// Single-leaf tree.
    #[must_use]
    pub fn leaf(value: f64) -> Self {
        Self {
            nodes: vec![TreeNode::Leaf { value }],
        }
    }

    /// Nodes in pre-order.
    #[must_use]
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Depth of the deepest leaf, root at 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match nodes[idx] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Raw output for one sample.
    #[must_use]
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    pub(crate) fn validate(&self, n_features: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::ModelFormat("tree has no nodes".to_string()));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Leaf { value } if !value.is_finite() => {
                    return Err(Error::ModelFormat(format!("leaf {idx} is not finite")));
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= n_features {
                        return Err(Error::ModelFormat(format!(
                            "node {idx} splits on feature {feature}, model has {n_features}"
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(Error::ModelFormat(format!("node {idx} threshold is NaN")));
                    }
                    for child in [left, right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(Error::ModelFormat(format!(
                                "node {idx} has out-of-order child {child}"
                            )));
                        }
                    }
                }
                TreeNode::Leaf { .. } => {}
            }
        }
        Ok(())
    }
}

/// Additive tree ensemble: `init + learning_rate * sum(tree(x))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedModel {
    n_features: usize,
    init: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
    feature_importances: Vec<f64>,
}

impl GradientBoostedModel {
    /// Assemble a model from fitted parts.
    ///
    /// `feature_importances` may be empty when unknown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelFormat`] if any part is inconsistent.
    pub fn new(
        n_features: usize,
        init: f64,
        learning_rate: f64,
        trees: Vec<RegressionTree>,
        feature_importances: Vec<f64>,
    ) -> Result<Self> {
        let model = Self {
            n_features,
            init,
            learning_rate,
            trees,
            feature_importances,
        };
        model.validate()?;
        Ok(model)
    }

    /// Number of input features.
    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    /// Initial prediction (training target mean).
    #[must_use]
    pub const fn init(&self) -> f64 {
        self.init
    }

    /// Shrinkage applied to each tree.
    #[must_use]
    pub const fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Ensemble members.
    #[must_use]
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Impurity-based importances, one per feature, summing to 1.
    ///
    /// `None` when the model carries no importances.
    #[must_use]
    pub fn feature_importances(&self) -> Option<&[f64]> {
        if self.feature_importances.is_empty() {
            None
        } else {
            Some(&self.feature_importances)
        }
    }

    /// Ensemble prediction.
    #[must_use]
    pub fn predict(&self, x: &[f64]) -> f64 {
        self.init + self.learning_rate * self.trees.iter().map(|t| t.predict(x)).sum::<f64>()
    }

    /// Raw output of every tree, before shrinkage.
    #[must_use]
    pub fn member_predictions(&self, x: &[f64]) -> Vec<f64> {
        self.trees.iter().map(|t| t.predict(x)).collect()
    }

    /// Coefficient of determination on `(rows, targets)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] on shape mismatch.
    pub fn score(&self, rows: &[Vec<f64>], targets: &[f64]) -> Result<f64> {
        if rows.len() != targets.len() {
            return Err(Error::InvalidInput(format!(
                "{} rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        if let Some(row) = rows.iter().find(|r| r.len() != self.n_features) {
            return Err(Error::InvalidInput(format!(
                "expected {} features, got {}",
                self.n_features,
                row.len()
            )));
        }
        let predictions: Vec<f64> = rows.iter().map(|r| self.predict(r)).collect();
        Ok(r2_score(targets, &predictions))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.init.is_finite() || !self.learning_rate.is_finite() {
            return Err(Error::ModelFormat(
                "init and learning_rate must be finite".to_string(),
            ));
        }
        if !self.feature_importances.is_empty()
            && self.feature_importances.len() != self.n_features
        {
            return Err(Error::ModelFormat(format!(
                "{} importances for {} features",
                self.feature_importances.len(),
                self.n_features
            )));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| Error::ModelFormat(format!("tree {i}: {e}")))?;
        }
        Ok(())
    }
}

/// Coefficient of determination, computed by `aprender::metrics::r_squared`.
///
/// 0 when the targets are empty, constant, or a different length from the
/// predictions.
#[must_use]
pub fn r2_score(targets: &[f64], predictions: &[f64]) -> f64 {
    let Some(&first) = targets.first() else {
        return 0.0;
    };
    if targets.len() != predictions.len() || targets.iter().all(|&t| t == first) {
        return 0.0;
    }
    #[allow(clippy::cast_possible_truncation)]
    let to_vector = |values: &[f64]| Vector::from_vec(values.iter().map(|&v| v as f32).collect());
    f64::from(r_squared(&to_vector(predictions), &to_vector(targets)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, low: f64, high: f64) -> RegressionTree {
        RegressionTree::from_nodes(
            vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: low },
                TreeNode::Leaf { value: high },
            ],
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_tree_predict() {
        let tree = stump(0, 0.5, -1.0, 1.0);
        assert_eq!(tree.predict(&[0.5, 0.0]), -1.0);
        assert_eq!(tree.predict(&[0.6, 0.0]), 1.0);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_tree_rejects_backward_child() {
        let nodes = vec![
            TreeNode::Split {
                feature: 0,
                threshold: 0.0,
                left: 0,
                right: 1,
            },
            TreeNode::Leaf { value: 0.0 },
        ];
        assert!(matches!(
            RegressionTree::from_nodes(nodes, 1),
            Err(Error::ModelFormat(_))
        ));
    }

    #[test]
    fn test_tree_rejects_unknown_feature() {
        let nodes = vec![
            TreeNode::Split {
                feature: 5,
                threshold: 0.0,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf { value: 0.0 },
            TreeNode::Leaf { value: 0.0 },
        ];
        assert!(RegressionTree::from_nodes(nodes, 2).is_err());
    }

    #[test]
    fn test_ensemble_predict() {
        let model = GradientBoostedModel::new(
            2,
            0.5,
            0.1,
            vec![stump(0, 0.0, -1.0, 1.0), stump(1, 0.0, -2.0, 2.0)],
            vec![0.25, 0.75],
        )
        .unwrap();

        assert!((model.predict(&[1.0, 1.0]) - 0.8).abs() < 1e-12);
        assert_eq!(model.member_predictions(&[1.0, -1.0]), vec![1.0, -2.0]);
        assert_eq!(model.feature_importances(), Some(&[0.25, 0.75][..]));
    }

    #[test]
    fn test_importance_length_checked() {
        assert!(GradientBoostedModel::new(2, 0.0, 0.1, Vec::new(), vec![1.0]).is_err());
        let bare = GradientBoostedModel::new(2, 0.0, 0.1, Vec::new(), Vec::new()).unwrap();
        assert!(bare.feature_importances().is_none());
    }

    #[test]
    fn test_r2() {
        assert!((r2_score(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-6);
        assert!(r2_score(&[1.0, 2.0, 3.0], &[2.0, 2.0, 2.0]).abs() < 1e-6);
        assert!(r2_score(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) < 0.0);
        assert_eq!(r2_score(&[1.0, 1.0], &[0.0, 0.0]), 0.0);
        assert_eq!(r2_score(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(r2_score(&[], &[]), 0.0);
    }
}
