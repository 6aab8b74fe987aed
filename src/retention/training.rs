//! Gradient boosting for squared error
//!
//! Each stage fits a CART tree to the current residuals with exact greedy
//! splits (best variance reduction over every feature and cut point). The
//! fit is fully deterministic for a given input.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::{GradientBoostedModel, RegressionTree, TreeNode};
use crate::{Error, Result};

/// Smallest variance reduction worth a split.
const MIN_SPLIT_GAIN: f64 = 1e-12;

/// Boosting hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    /// Number of boosting stages
    pub n_estimators: usize,
    /// Shrinkage per stage
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples to consider splitting a node
    pub min_samples_split: usize,
    /// Minimum samples in each leaf
    pub min_samples_leaf: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 5,
            min_samples_split: 5,
            min_samples_leaf: 3,
        }
    }
}

impl BoostingParams {
    /// Larger model used when retraining on production data.
    #[must_use]
    pub fn production() -> Self {
        Self {
            n_estimators: 150,
            max_depth: 6,
            ..Self::default()
        }
    }

    /// Validate parameters
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a non-positive learning rate or
    /// a zero leaf size.
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.min_samples_leaf == 0 {
            return Err(Error::InvalidInput(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fit a boosted ensemble on row-major `rows` and `targets`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for empty, ragged, or non-finite data, or
/// invalid parameters.
pub fn fit(rows: &[Vec<f64>], targets: &[f64], params: &BoostingParams) -> Result<GradientBoostedModel> {
    params.validate()?;
    let n_features = check_training_data(rows, targets)?;

    let init = targets.iter().sum::<f64>() / targets.len() as f64;
    let mut current = vec![init; targets.len()];
    let mut importances = vec![0.0; n_features];
    let mut trees = Vec::with_capacity(params.n_estimators);

    for stage in 0..params.n_estimators {
        let residuals: Vec<f64> = targets.iter().zip(&current).map(|(y, f)| y - f).collect();

        let mut builder = TreeBuilder {
            rows,
            residuals: &residuals,
            params,
            nodes: Vec::new(),
            importances: &mut importances,
        };
        let mut samples: Vec<usize> = (0..rows.len()).collect();
        builder.grow(&mut samples, 0);
        let tree = RegressionTree::from_nodes(builder.nodes, n_features)?;

        for (f, row) in current.iter_mut().zip(rows) {
            *f += params.learning_rate * tree.predict(row);
        }
        if stage % 25 == 0 {
            debug!(stage, nodes = tree.nodes().len(), "fitted boosting stage");
        }
        trees.push(tree);
    }

    let total: f64 = importances.iter().sum();
    if total > 0.0 {
        importances.iter_mut().for_each(|v| *v /= total);
    }

    GradientBoostedModel::new(n_features, init, params.learning_rate, trees, importances)
}

fn check_training_data(rows: &[Vec<f64>], targets: &[f64]) -> Result<usize> {
    if rows.is_empty() {
        return Err(Error::InvalidInput("no training rows".to_string()));
    }
    if rows.len() != targets.len() {
        return Err(Error::InvalidInput(format!(
            "{} rows but {} targets",
            rows.len(),
            targets.len()
        )));
    }
    let n_features = rows[0].len();
    for (i, row) in rows.iter().enumerate() {
        if row.len() != n_features {
            return Err(Error::InvalidInput(format!(
                "row {i} has {} features, expected {n_features}",
                row.len()
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(format!("row {i} has a non-finite value")));
        }
    }
    if targets.iter().any(|t| !t.is_finite()) {
        return Err(Error::InvalidInput("targets must be finite".to_string()));
    }
    Ok(n_features)
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    residuals: &'a [f64],
    params: &'a BoostingParams,
    nodes: Vec<TreeNode>,
    importances: &'a mut Vec<f64>,
}

impl TreeBuilder<'_> {
    /// Grow the subtree over `samples`, returning its root index.
    fn grow(&mut self, samples: &mut [usize], depth: usize) -> usize {
        let idx = self.nodes.len();
        let mean = samples.iter().map(|&i| self.residuals[i]).sum::<f64>() / samples.len() as f64;
        self.nodes.push(TreeNode::Leaf { value: mean });

        let n = samples.len();
        if depth >= self.params.max_depth
            || n < self.params.min_samples_split
            || n < 2 * self.params.min_samples_leaf
        {
            return idx;
        }

        let Some(best) = self.best_split(samples) else {
            return idx;
        };
        self.importances[best.feature] += best.gain;

        let rows = self.rows;
        samples.sort_by(|&a, &b| rows[a][best.feature].total_cmp(&rows[b][best.feature]));
        let cut = samples.partition_point(|&i| rows[i][best.feature] <= best.threshold);
        let (left_samples, right_samples) = samples.split_at_mut(cut);

        let left = self.grow(left_samples, depth + 1);
        let right = self.grow(right_samples, depth + 1);
        self.nodes[idx] = TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }

    /// Exact greedy search. Gain is the reduction in squared error.
    fn best_split(&self, samples: &[usize]) -> Option<BestSplit> {
        let n = samples.len();
        let min_leaf = self.params.min_samples_leaf;
        let total: f64 = samples.iter().map(|&i| self.residuals[i]).sum();
        let parent = total * total / n as f64;

        let mut best: Option<BestSplit> = None;
        let mut order = samples.to_vec();
        let n_features = self.rows[samples[0]].len();

        for feature in 0..n_features {
            order.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));

            let mut left_sum = 0.0;
            for k in 1..n {
                left_sum += self.residuals[order[k - 1]];
                if k < min_leaf || n - k < min_leaf {
                    continue;
                }
                let lo = self.rows[order[k - 1]][feature];
                let hi = self.rows[order[k]][feature];
                if lo >= hi {
                    continue;
                }
                let right_sum = total - left_sum;
                let gain = left_sum * left_sum / k as f64
                    + right_sum * right_sum / (n - k) as f64
                    - parent;
                if gain > MIN_SPLIT_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    // Adjacent floats can round the midpoint up to `hi`.
                    let mid = lo + (hi - lo) / 2.0;
                    best = Some(BestSplit {
                        feature,
                        threshold: if mid < hi { mid } else { lo },
                        gain,
                    });
                }
            }
        }
        best
    }
}
