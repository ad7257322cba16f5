//! Random forest regression used as the outcome model
//!
//! Each tree is a CART regression tree grown on a bootstrap sample with
//! squared-error splits. Trees are built in parallel; tree `k` draws its
//! randomness from `seed + k`, so a forest is fully determined by its seed.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::{validate_fit_input, validate_predict_input, EstimatorError, Matrix, Regressor};

const MODEL_NAME: &str = "RandomForestRegressor";

/// Values closer than this are treated as identical when searching splits
const VALUE_TOLERANCE: f64 = 1e-10;

/// Hyperparameters of the random forest
#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted regression tree stored as a flat node arena (root at index 0)
#[derive(Debug, Clone)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Best split found for a node
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    score: f64,
}

struct TreeBuilder<'a> {
    x: &'a Matrix,
    y: &'a [f64],
    params: &'a ForestParams,
    rng: StdRng,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn build(mut self, indices: &mut [usize]) -> RegressionTree {
        self.grow(indices, 0);
        RegressionTree { nodes: self.nodes }
    }

    /// Grow the subtree for `indices` and return its node index
    fn grow(&mut self, indices: &mut [usize], depth: usize) -> usize {
        let n = indices.len();
        let sum: f64 = indices.iter().map(|&i| self.y[i]).sum();
        let mean = sum / n as f64;

        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        let is_pure = indices
            .iter()
            .all(|&i| (self.y[i] - self.y[indices[0]]).abs() < VALUE_TOLERANCE);

        if depth_reached
            || is_pure
            || n < self.params.min_samples_split
            || n < 2 * self.params.min_samples_leaf
        {
            return self.push_leaf(mean);
        }

        let Some(split) = self.find_best_split(indices, sum) else {
            return self.push_leaf(mean);
        };

        // Stable partition: rows with value <= threshold go left
        let (mut left, mut right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x.get(i, split.feature) <= split.threshold);
        let mid = left.len();
        if mid == 0 || mid == n {
            return self.push_leaf(mean);
        }
        left.append(&mut right);
        indices.copy_from_slice(&left);

        let node_idx = self.push_leaf(mean);
        let (left_indices, right_indices) = indices.split_at_mut(mid);
        let left_idx = self.grow(left_indices, depth + 1);
        let right_idx = self.grow(right_indices, depth + 1);
        self.nodes[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_idx,
            right: right_idx,
        };
        node_idx
    }

    fn push_leaf(&mut self, value: f64) -> usize {
        self.nodes.push(Node::Leaf { value });
        self.nodes.len() - 1
    }

    /// Features in visiting order plus how many non-constant ones to evaluate
    fn candidate_features(&mut self) -> (Vec<usize>, usize) {
        let n_features = self.x.cols();
        match self.params.max_features {
            Some(k) if k < n_features => {
                let order = sample(&mut self.rng, n_features, n_features).into_vec();
                (order, k)
            }
            _ => ((0..n_features).collect(), n_features),
        }
    }

    /// Find the split that maximizes the reduction in squared error
    ///
    /// Minimizing the children's summed squared error is equivalent to
    /// maximizing `S_l^2 / n_l + S_r^2 / n_r`, where `S` is the sum of targets.
    fn find_best_split(&mut self, indices: &[usize], total_sum: f64) -> Option<SplitCandidate> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf;
        let parent_score = total_sum * total_sum / n as f64;

        let mut best: Option<SplitCandidate> = None;
        let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

        // Constant features do not count towards the budget
        let (order, budget) = self.candidate_features();
        let mut evaluated = 0;
        for feature in order {
            if evaluated == budget {
                break;
            }
            pairs.clear();
            pairs.extend(indices.iter().map(|&i| (self.x.get(i, feature), self.y[i])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
            if (pairs[n - 1].0 - pairs[0].0).abs() < VALUE_TOLERANCE {
                continue;
            }
            evaluated += 1;

            let mut left_sum = 0.0;
            for i in 0..n - 1 {
                left_sum += pairs[i].1;

                let left_count = i + 1;
                let right_count = n - left_count;
                if left_count < min_leaf || right_count < min_leaf {
                    continue;
                }

                // Never split between identical values
                if (pairs[i + 1].0 - pairs[i].0).abs() < VALUE_TOLERANCE {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let score = left_sum * left_sum / left_count as f64
                    + right_sum * right_sum / right_count as f64;

                if score <= parent_score + VALUE_TOLERANCE {
                    continue;
                }

                if best.as_ref().map_or(true, |b| score > b.score) {
                    let mut threshold = (pairs[i].0 + pairs[i + 1].0) / 2.0;
                    if threshold >= pairs[i + 1].0 {
                        threshold = pairs[i].0;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        score,
                    });
                }
            }
        }

        best
    }
}

/// Bagged ensemble of regression trees
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    params: ForestParams,
    trees: Vec<RegressionTree>,
    n_features: Option<usize>,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(ForestParams::default())
    }
}

impl RandomForestRegressor {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            n_features: None,
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Number of fitted trees (0 before `fit`)
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Deepest fitted tree
    pub fn max_fitted_depth(&self) -> usize {
        self.trees.iter().map(|t| t.depth()).max().unwrap_or(0)
    }

    fn build_tree(&self, x: &Matrix, y: &[f64], tree_index: usize) -> RegressionTree {
        let mut rng = StdRng::seed_from_u64(self.params.seed.wrapping_add(tree_index as u64));
        let n = x.rows();

        let mut indices: Vec<usize> = if self.params.bootstrap {
            (0..n).map(|_| rng.gen_range(0..n)).collect()
        } else {
            (0..n).collect()
        };

        TreeBuilder {
            x,
            y,
            params: &self.params,
            rng,
            nodes: Vec::new(),
        }
        .build(&mut indices)
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), EstimatorError> {
        validate_fit_input(x, y, MODEL_NAME)?;
        if self.params.n_estimators == 0 {
            return Err(EstimatorError::InvalidConfig(
                "n_estimators must be at least 1".to_string(),
            ));
        }

        // Collected in tree order regardless of scheduling
        self.trees = (0..self.params.n_estimators)
            .into_par_iter()
            .map(|k| self.build_tree(x, y, k))
            .collect();
        self.n_features = Some(x.cols());
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, EstimatorError> {
        let n_features = self.n_features.ok_or(EstimatorError::NotFitted(MODEL_NAME))?;
        validate_predict_input(x, n_features, MODEL_NAME)?;

        let n_trees = self.trees.len() as f64;
        let predictions = (0..x.rows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees
            })
            .collect();
        Ok(predictions)
    }
}
