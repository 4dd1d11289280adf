use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{check_training_set, linear_decision, sample_weights};
use crate::domain::estimator::{Capabilities, Classifier, EstimatorError};

#[derive(Debug, Clone, PartialEq)]
pub struct SvmParams {
    /// L2 regularisation strength
    pub lambda: f64,
    pub learning_rate: f64,
    pub max_iter: usize,
    pub class_weight_balanced: bool,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            lambda: 1e-3,
            learning_rate: 0.1,
            max_iter: 500,
            class_weight_balanced: true,
        }
    }
}

/// Linear support vector classifier; exposes margins but no probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSvm {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearSvm {
    /// Full-batch hinge-loss sub-gradient descent with a decaying step
    pub fn fit(x: ArrayView2<'_, f64>, y: &[u8], params: &SvmParams) -> Result<Self, EstimatorError> {
        check_training_set(x, y)?;

        let weights = sample_weights(y, params.class_weight_balanced);
        let signs: Vec<f64> = y.iter().map(|&v| if v == 1 { 1.0 } else { -1.0 }).collect();
        let n = x.nrows() as f64;

        let mut w = Array1::<f64>::zeros(x.ncols());
        let mut b = 0.0;

        for epoch in 0..params.max_iter {
            let step = params.learning_rate / ((epoch + 1) as f64).sqrt();
            let margins = x.dot(&w) + b;

            let mut grad_w = &w * params.lambda;
            let mut grad_b = 0.0;
            for (i, row) in x.rows().into_iter().enumerate() {
                if signs[i] * margins[i] < 1.0 {
                    let coeff = weights[i] * signs[i] / n;
                    grad_w.scaled_add(-coeff, &row);
                    grad_b -= coeff;
                }
            }

            w.scaled_add(-step, &grad_w);
            b -= step * grad_b;
        }

        if w.iter().any(|v| !v.is_finite()) || !b.is_finite() {
            return Err(EstimatorError::Numeric("hinge-loss descent diverged".into()));
        }

        Ok(Self {
            coefficients: w.to_vec(),
            intercept: b,
        })
    }
}

impl Classifier for LinearSvm {
    fn name(&self) -> &'static str {
        "linear_svm"
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            probability: false,
            decision: true,
        }
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<u8>, EstimatorError> {
        let margins = linear_decision(x, &self.coefficients, self.intercept)?;
        Ok(margins.mapv(|s| u8::from(s > 0.0)))
    }

    fn decision_function(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, EstimatorError> {
        linear_decision(x, &self.coefficients, self.intercept)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::infrastructure::estimator::fixtures::separable;

    #[test]
    fn test_fits_separable_data() {
        let (x, y) = separable();
        let model = LinearSvm::fit(x.view(), &y, &SvmParams::default()).unwrap();
        assert_eq!(model.predict(x.view()).unwrap().to_vec(), y);
    }

    #[test]
    fn test_has_no_native_probability() {
        let model = LinearSvm {
            coefficients: vec![1.0],
            intercept: 0.0,
        };
        assert!(model.predict_proba(array![[1.0]].view()).is_err());
        assert_eq!(model.decision_function(array![[3.0]].view()).unwrap()[0], 3.0);
    }
}
