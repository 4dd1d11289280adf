use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{check_training_set, linear_decision, sample_weights};
use crate::domain::estimator::{Capabilities, Classifier, EstimatorError};
use crate::domain::scoring::sigmoid;

#[derive(Debug, Clone, PartialEq)]
pub struct LogisticParams {
    /// L2 penalty strength
    pub l2: f64,
    pub max_iter: usize,
    pub tolerance: f64,
    pub class_weight_balanced: bool,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            l2: 1e-3,
            max_iter: 200,
            tolerance: 1e-6,
            class_weight_balanced: true,
        }
    }
}

/// Binary logistic regression fitted by full-batch gradient descent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticRegression {
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: &[u8],
        params: &LogisticParams,
    ) -> Result<Self, EstimatorError> {
        check_training_set(x, y)?;

        let weights = Array1::from(sample_weights(y, params.class_weight_balanced));
        let total_weight = weights.sum();
        let targets: Array1<f64> = y.iter().map(|&v| f64::from(v)).collect();

        // step 1/L with L bounding the Hessian of the weighted log-loss
        let mean_sq_norm = x
            .rows()
            .into_iter()
            .zip(weights.iter())
            .map(|(row, w)| w * (row.dot(&row) + 1.0))
            .sum::<f64>()
            / total_weight;
        let step = 1.0 / (0.25 * mean_sq_norm + params.l2);

        let mut w = Array1::<f64>::zeros(x.ncols());
        let mut b = 0.0;

        for _ in 0..params.max_iter {
            let z = x.dot(&w) + b;
            let residual = (z.mapv(sigmoid) - &targets) * &weights;

            let grad_w = x.t().dot(&residual) / total_weight + &w * params.l2;
            let grad_b = residual.sum() / total_weight;

            w.scaled_add(-step, &grad_w);
            b -= step * grad_b;

            let norm = grad_w.dot(&grad_w) + grad_b * grad_b;
            if !norm.is_finite() {
                return Err(EstimatorError::Numeric("gradient diverged".into()));
            }
            if norm.sqrt() < params.tolerance {
                break;
            }
        }

        Ok(Self {
            coefficients: w.to_vec(),
            intercept: b,
        })
    }

    fn margin(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, EstimatorError> {
        linear_decision(x, &self.coefficients, self.intercept)
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &'static str {
        "logistic_regression"
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            probability: true,
            decision: true,
        }
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<u8>, EstimatorError> {
        Ok(self.margin(x)?.mapv(|s| u8::from(s > 0.0)))
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, EstimatorError> {
        Ok(self.margin(x)?.mapv(sigmoid))
    }

    fn decision_function(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, EstimatorError> {
        self.margin(x)
    }
}
