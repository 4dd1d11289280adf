use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{check_training_set, sample_weights};
use crate::domain::estimator::{Capabilities, Classifier, EstimatorError};

#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub random_state: u64,
    pub class_weight_balanced: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 2,
            random_state: 42,
            class_weight_balanced: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        /// Weighted share of positive samples reaching this leaf
        positive_fraction: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// CART tree stored as a flat node list, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    /// Children must sit after their parent, so traversal always terminates
    pub fn validate(&self, n_features: usize) -> Result<(), EstimatorError> {
        if self.nodes.is_empty() {
            return Err(EstimatorError::Numeric("tree has no nodes".into()));
        }

        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { positive_fraction } => {
                    if !(0.0..=1.0).contains(positive_fraction) {
                        return Err(EstimatorError::Numeric(format!(
                            "leaf {} has positive fraction {} outside [0, 1]",
                            index, positive_fraction
                        )));
                    }
                }
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(EstimatorError::Numeric(format!(
                            "node {} splits on feature {} but the forest has {}",
                            index, feature, n_features
                        )));
                    }
                    for child in [*left, *right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(EstimatorError::Numeric(format!(
                                "node {} points at invalid child {}",
                                index, child
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn positive_fraction(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { positive_fraction } => return *positive_fraction,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Bagged Gini trees with sqrt(n_features) candidates per split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
    /// Normalised mean impurity decrease per feature
    pub feature_importances: Vec<f64>,
}

impl RandomForest {
    pub fn validate(&self) -> Result<(), EstimatorError> {
        if self.n_features == 0 || self.trees.is_empty() {
            return Err(EstimatorError::Numeric("forest has no features or no trees".into()));
        }
        self.trees
            .iter()
            .try_for_each(|tree| tree.validate(self.n_features))
    }

    pub fn fit(x: ArrayView2<'_, f64>, y: &[u8], params: &ForestParams) -> Result<Self, EstimatorError> {
        check_training_set(x, y)?;
        if params.n_estimators == 0 || params.max_depth == 0 {
            return Err(EstimatorError::Numeric(
                "n_estimators and max_depth must be positive".into(),
            ));
        }

        let weights = sample_weights(y, params.class_weight_balanced);
        let mut rng = StdRng::seed_from_u64(params.random_state);
        let n = x.nrows();
        let max_features = ((x.ncols() as f64).sqrt().ceil() as usize).clamp(1, x.ncols());

        let mut importances = vec![0.0; x.ncols()];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut builder = TreeBuilder {
                x: x.view(),
                y,
                weights: &weights,
                params,
                max_features,
                rng: &mut rng,
                nodes: Vec::new(),
                importances: vec![0.0; x.ncols()],
            };
            builder.build(sample, 0);

            let total: f64 = builder.importances.iter().sum();
            if total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(&builder.importances) {
                    *acc += v / total;
                }
            }
            trees.push(DecisionTree {
                nodes: builder.nodes,
            });
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        Ok(Self {
            n_features: x.ncols(),
            trees,
            feature_importances: importances,
        })
    }
}

struct TreeBuilder<'a, 'r, R: Rng> {
    x: ArrayView2<'a, f64>,
    y: &'a [u8],
    weights: &'a [f64],
    params: &'a ForestParams,
    max_features: usize,
    rng: &'r mut R,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    decrease: f64,
}

fn gini(positive: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    let p = positive / total;
    2.0 * p * (1.0 - p)
}

impl<R: Rng> TreeBuilder<'_, '_, R> {
    fn totals(&self, samples: &[usize]) -> (f64, f64) {
        samples.iter().fold((0.0, 0.0), |(pos, tot), &i| {
            let w = self.weights[i];
            (pos + w * f64::from(self.y[i]), tot + w)
        })
    }

    fn build(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let (positive, total) = self.totals(&samples);
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf {
            positive_fraction: if total > 0.0 { positive / total } else { 0.0 },
        });

        let pure = positive <= 0.0 || positive >= total;
        if pure || depth >= self.params.max_depth || samples.len() < self.params.min_samples_split {
            return index;
        }

        let Some(split) = self.best_split(&samples, positive, total) else {
            return index;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| self.x[[i, split.feature]] <= split.threshold);

        self.importances[split.feature] += split.decrease;

        let left = self.build(left, depth + 1);
        let right = self.build(right, depth + 1);
        self.nodes[index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }

    fn best_split(&mut self, samples: &[usize], positive: f64, total: f64) -> Option<BestSplit> {
        let parent = gini(positive, total);
        let candidates = rand::seq::index::sample(&mut *self.rng, self.x.ncols(), self.max_features);

        let mut best: Option<BestSplit> = None;
        let mut order = samples.to_vec();

        for feature in candidates.iter() {
            order.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));

            let (mut left_pos, mut left_tot) = (0.0, 0.0);
            for k in 0..order.len().saturating_sub(1) {
                let i = order[k];
                left_pos += self.weights[i] * f64::from(self.y[i]);
                left_tot += self.weights[i];

                let here = self.x[[i, feature]];
                let next = self.x[[order[k + 1], feature]];
                if next <= here {
                    continue;
                }

                let right_pos = positive - left_pos;
                let right_tot = total - left_tot;
                let child = (left_tot * gini(left_pos, left_tot)
                    + right_tot * gini(right_pos, right_tot))
                    / total;
                let decrease = (parent - child) * total;

                // equal decreases go to the lower feature index
                let better = best.as_ref().is_none_or(|b| {
                    decrease > b.decrease + 1e-12
                        || ((decrease - b.decrease).abs() <= 1e-12 && feature < b.feature)
                });
                if decrease > 1e-12 && better {
                    best = Some(BestSplit {
                        feature,
                        threshold: (here + next) / 2.0,
                        decrease,
                    });
                }
            }
        }

        best
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &'static str {
        "random_forest"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            probability: true,
            decision: false,
        }
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<u8>, EstimatorError> {
        Ok(self.predict_proba(x)?.mapv(|p| u8::from(p > 0.5)))
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, EstimatorError> {
        EstimatorError::check_features(self.n_features, x.ncols())?;
        if self.trees.is_empty() {
            return Err(EstimatorError::Numeric("forest has no trees".into()));
        }

        let n_trees = self.trees.len() as f64;
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                self.trees
                    .iter()
                    .map(|t| t.positive_fraction(row))
                    .sum::<f64>()
                    / n_trees
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::infrastructure::estimator::fixtures::separable;

    fn params() -> ForestParams {
        ForestParams {
            n_estimators: 15,
            max_depth: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_fits_separable_data() {
        let (x, y) = separable();
        let model = RandomForest::fit(x.view(), &y, &params()).unwrap();

        assert_eq!(model.trees.len(), 15);
        assert_eq!(model.predict(x.view()).unwrap().to_vec(), y);

        let probabilities = model.predict_proba(x.view()).unwrap();
        assert!(probabilities.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_importances_are_normalised() {
        let (x, y) = separable();
        let model = RandomForest::fit(x.view(), &y, &params()).unwrap();

        let total: f64 = model.feature_importances.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(model.feature_importances[0] > model.feature_importances[1]);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = separable();
        let a = RandomForest::fit(x.view(), &y, &params()).unwrap();
        let b = RandomForest::fit(x.view(), &y, &params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fitted_forest_validates() {
        let (x, y) = separable();
        let model = RandomForest::fit(x.view(), &y, &params()).unwrap();
        assert!(model.validate().is_ok());
    }

    fn forest(nodes: Vec<Node>) -> RandomForest {
        RandomForest {
            n_features: 13,
            trees: vec![DecisionTree { nodes }],
            feature_importances: vec![0.0; 13],
        }
    }

    fn split(feature: usize, left: usize, right: usize) -> Node {
        Node::Split {
            feature,
            threshold: 0.5,
            left,
            right,
        }
    }

    fn leaf() -> Node {
        Node::Leaf {
            positive_fraction: 0.5,
        }
    }

    #[test]
    fn test_malformed_trees_are_rejected() {
        let cases = [
            ("empty tree", forest(vec![])),
            ("child out of range", forest(vec![split(0, 7, 7)])),
            ("feature out of range", forest(vec![split(99, 1, 2), leaf(), leaf()])),
            ("self reference", forest(vec![split(0, 0, 1), leaf()])),
            ("backward edge", forest(vec![split(0, 1, 2), split(1, 0, 2), leaf()])),
            (
                "fraction out of range",
                forest(vec![Node::Leaf {
                    positive_fraction: 1.5,
                }]),
            ),
        ];

        for (label, model) in cases {
            assert!(model.validate().is_err(), "{label} should be rejected");
        }
        assert!(forest(vec![split(12, 1, 2), leaf(), leaf()]).validate().is_ok());
    }

    #[test]
    fn test_no_decision_function() {
        let forest = RandomForest {
            n_features: 1,
            trees: vec![DecisionTree {
                nodes: vec![Node::Leaf {
                    positive_fraction: 0.25,
                }],
            }],
            feature_importances: vec![0.0],
        };
        let x = array![[1.0]];
        assert_eq!(forest.predict_proba(x.view()).unwrap()[0], 0.25);
        assert!(forest.decision_function(x.view()).is_err());
        assert_eq!(forest.predict(x.view()).unwrap()[0], 0);
    }
}
