//! Random forest of CART trees.
//!
//! Trees are grown on bootstrap samples with Gini impurity and a random
//! subset of `floor(sqrt(n_features))` candidate features per split. The
//! RNG is seeded, so the same data always yields the same forest.

use super::{check_training_data, Estimator, Row, CLASS_COUNT};
use crate::{Error, Result, FEATURE_COUNT};
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Forest hyperparameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

/// A node in a flattened decision tree
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Node {
    Leaf {
        distribution: [f64; CLASS_COUNT],
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single fitted tree; node 0 is the root
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn predict_proba(&self, x: &Row) -> [f64; CLASS_COUNT] {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { distribution }) => return *distribution,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
                None => return [0.0; CLASS_COUNT],
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Children must come after their parent, so traversal always terminates
    fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::InvalidArtifact("tree has no nodes".into()));
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { distribution } => {
                    if distribution.iter().any(|p| !p.is_finite() || *p < 0.0) {
                        return Err(Error::InvalidArtifact(format!(
                            "leaf {} has an invalid distribution",
                            idx
                        )));
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(Error::InvalidArtifact(format!(
                            "split {} uses feature {}",
                            idx, feature
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(Error::InvalidArtifact(format!(
                            "split {} has a NaN threshold",
                            idx
                        )));
                    }
                    let in_range = |child: usize| child > idx && child < self.nodes.len();
                    if !in_range(*left) || !in_range(*right) {
                        return Err(Error::InvalidArtifact(format!(
                            "split {} points to nodes {} and {}",
                            idx, left, right
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Candidate split found while growing a node
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// Grows one tree from a bootstrap sample
struct TreeBuilder<'a> {
    x: &'a [Row],
    y: &'a [usize],
    params: &'a ForestParams,
    max_features: usize,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn build(mut self, indices: &[usize], rng: &mut ChaCha8Rng) -> DecisionTree {
        self.grow(indices, 0, rng);
        DecisionTree { nodes: self.nodes }
    }

    fn grow(&mut self, indices: &[usize], depth: usize, rng: &mut ChaCha8Rng) -> usize {
        let counts = class_counts(self.y, indices);
        let node_id = self.nodes.len();

        let is_pure = counts.iter().filter(|&&c| c > 0.0).count() <= 1;
        if is_pure
            || depth >= self.params.max_depth
            || indices.len() < self.params.min_samples_split
        {
            self.nodes.push(leaf(&counts));
            return node_id;
        }

        let Some(split) = self.best_split(indices, rng) else {
            self.nodes.push(leaf(&counts));
            return node_id;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[i][split.feature] <= split.threshold);

        // Reserve the slot, children are patched in once built
        self.nodes.push(leaf(&counts));
        let left = self.grow(&left_idx, depth + 1, rng);
        let right = self.grow(&right_idx, depth + 1, rng);
        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }

    /// Best Gini split over a random feature subset
    ///
    /// Falls back to the remaining features when every sampled feature is
    /// constant within the node.
    fn best_split(&self, indices: &[usize], rng: &mut ChaCha8Rng) -> Option<SplitCandidate> {
        let sampled = sample(rng, FEATURE_COUNT, self.max_features).into_vec();

        let mut best: Option<SplitCandidate> = None;
        for &feature in &sampled {
            self.consider_feature(indices, feature, &mut best);
        }

        if best.is_none() {
            for feature in (0..FEATURE_COUNT).filter(|f| !sampled.contains(f)) {
                self.consider_feature(indices, feature, &mut best);
            }
        }

        best
    }

    fn consider_feature(
        &self,
        indices: &[usize],
        feature: usize,
        best: &mut Option<SplitCandidate>,
    ) {
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

        let total = class_counts(self.y, &sorted);
        let n = sorted.len() as f64;
        let mut left = [0.0; CLASS_COUNT];

        for pos in 0..sorted.len() - 1 {
            left[self.y[sorted[pos]]] += 1.0;

            let current = self.x[sorted[pos]][feature];
            let next = self.x[sorted[pos + 1]][feature];
            if next <= current {
                continue;
            }

            let mut right = total;
            for c in 0..CLASS_COUNT {
                right[c] -= left[c];
            }

            let n_left = (pos + 1) as f64;
            let n_right = n - n_left;
            let impurity = (n_left * gini(&left) + n_right * gini(&right)) / n;

            if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                let mut threshold = (current + next) / 2.0;
                if threshold >= next {
                    threshold = current;
                }
                *best = Some(SplitCandidate {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
    }
}

/// Bagged ensemble of decision trees
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(Error::InvalidArtifact("forest has no trees".into()));
        }
        self.trees.iter().try_for_each(DecisionTree::validate)
    }
}

impl Estimator for RandomForest {
    fn fit(&mut self, x: &[Row], y: &[usize]) -> Result<()> {
        check_training_data(x, y)?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed);
        let max_features = ((FEATURE_COUNT as f64).sqrt().floor() as usize).max(1);
        let n = x.len();

        self.trees = (0..self.params.n_estimators)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                TreeBuilder {
                    x,
                    y,
                    params: &self.params,
                    max_features,
                    nodes: Vec::new(),
                }
                .build(&bootstrap, &mut rng)
            })
            .collect();

        tracing::debug!(
            "Fitted random forest with {} trees ({} nodes total)",
            self.trees.len(),
            self.trees.iter().map(DecisionTree::node_count).sum::<usize>()
        );
        Ok(())
    }

    fn predict_proba(&self, x: &Row) -> [f64; CLASS_COUNT] {
        if self.trees.is_empty() {
            return [1.0 / CLASS_COUNT as f64; CLASS_COUNT];
        }

        let mut sum = [0.0; CLASS_COUNT];
        for tree in &self.trees {
            let p = tree.predict_proba(x);
            for c in 0..CLASS_COUNT {
                sum[c] += p[c];
            }
        }

        let n = self.trees.len() as f64;
        sum.map(|s| s / n)
    }
}

fn class_counts(y: &[usize], indices: &[usize]) -> [f64; CLASS_COUNT] {
    let mut counts = [0.0; CLASS_COUNT];
    for &i in indices {
        counts[y[i]] += 1.0;
    }
    counts
}

fn gini(counts: &[f64; CLASS_COUNT]) -> f64 {
    let total: f64 = counts.iter().sum();
    if total == 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
}

fn leaf(counts: &[f64; CLASS_COUNT]) -> Node {
    let total: f64 = counts.iter().sum();
    let distribution = if total > 0.0 {
        counts.map(|c| c / total)
    } else {
        [1.0 / CLASS_COUNT as f64; CLASS_COUNT]
    };
    Node::Leaf { distribution }
}
