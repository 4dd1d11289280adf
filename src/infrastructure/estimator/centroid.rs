use ndarray::{Array1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::check_training_set;
use crate::domain::estimator::{Capabilities, Classifier, EstimatorError};

/// Assigns each row to the class with the closest mean; labels only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestCentroid {
    /// `centroids[label]`
    pub centroids: [Vec<f64>; 2],
}

impl NearestCentroid {
    pub fn fit(x: ArrayView2<'_, f64>, y: &[u8]) -> Result<Self, EstimatorError> {
        check_training_set(x, y)?;

        let centroid = |label: u8| -> Result<Vec<f64>, EstimatorError> {
            let rows: Vec<usize> = (0..y.len()).filter(|&i| y[i] == label).collect();
            x.select(Axis(0), &rows)
                .mean_axis(Axis(0))
                .map(|m| m.to_vec())
                .ok_or_else(|| EstimatorError::Numeric(format!("no rows for class {}", label)))
        };

        Ok(Self {
            centroids: [centroid(0)?, centroid(1)?],
        })
    }
}

impl Classifier for NearestCentroid {
    fn name(&self) -> &'static str {
        "nearest_centroid"
    }

    fn n_features(&self) -> usize {
        self.centroids[0].len()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LABEL_ONLY
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<u8>, EstimatorError> {
        EstimatorError::check_features(self.n_features(), x.ncols())?;

        let distance = |row: &[f64], centroid: &[f64]| -> f64 {
            row.iter().zip(centroid).map(|(a, b)| (a - b).powi(2)).sum()
        };

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let row = row.to_vec();
                let to_negative = distance(&row, &self.centroids[0]);
                let to_positive = distance(&row, &self.centroids[1]);
                u8::from(to_positive < to_negative)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::infrastructure::estimator::fixtures::separable;

    #[test]
    fn test_fit_and_predict() {
        let (x, y) = separable();
        let model = NearestCentroid::fit(x.view(), &y).unwrap();
        assert_eq!(model.predict(x.view()).unwrap().to_vec(), y);
    }

    #[test]
    fn test_exposes_neither_probability_nor_decision() {
        let model = NearestCentroid {
            centroids: [vec![0.0], vec![1.0]],
        };
        let x = array![[0.9]];
        assert_eq!(model.capabilities(), Capabilities::LABEL_ONLY);
        assert!(model.predict_proba(x.view()).is_err());
        assert!(model.decision_function(x.view()).is_err());
        assert_eq!(model.predict(x.view()).unwrap()[0], 1);
    }
}
