use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::domain::estimator::EstimatorError;

/// Per-column standardisation to zero mean and unit variance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(x: ArrayView2<'_, f64>) -> Result<Self, EstimatorError> {
        if x.nrows() == 0 {
            return Err(EstimatorError::Numeric("cannot fit scaler on zero rows".into()));
        }

        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| EstimatorError::Numeric("cannot compute column means".into()))?;
        let std = x.std_axis(Axis(0), 0.0);

        // constant columns pass through unscaled
        let scale = std
            .iter()
            .map(|&s| if s > f64::EPSILON { s } else { 1.0 })
            .collect();

        Ok(Self {
            mean: mean.to_vec(),
            scale,
        })
    }

    pub fn validate(&self, n_features: usize) -> Result<(), EstimatorError> {
        if self.mean.len() != n_features || self.scale.len() != n_features {
            return Err(EstimatorError::Numeric(format!(
                "scaler has {} means and {} scales for {} features",
                self.mean.len(),
                self.scale.len(),
                n_features
            )));
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(EstimatorError::Numeric("scaler has a zero or non-finite scale".into()));
        }
        Ok(())
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, EstimatorError> {
        EstimatorError::check_features(self.mean.len(), x.ncols())?;

        let mut out = x.to_owned();
        for (j, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (mean, scale) = (self.mean[j], self.scale[j]);
            column.mapv_inplace(|v| (v - mean) / scale);
        }
        Ok(out)
    }
}
