//! Fitted estimators stored inside model artifacts
//!
//! Every estimator is a plain serde struct; `Estimator` is the tagged union
//! written to and read from the artifact file (`"kind": "random_forest"`, ...).

mod centroid;
mod forest;
mod logistic;
mod scaler;
mod svm;

pub use centroid::NearestCentroid;
pub use forest::{ForestParams, RandomForest};
pub use logistic::{LogisticParams, LogisticRegression};
pub use scaler::StandardScaler;
pub use svm::{LinearSvm, SvmParams};

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::domain::estimator::{Capabilities, Classifier, EstimatorError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
    LinearSvm(LinearSvm),
    NearestCentroid(NearestCentroid),
    Pipeline(Pipeline),
}

impl Estimator {
    fn inner(&self) -> &dyn Classifier {
        match self {
            Self::LogisticRegression(m) => m,
            Self::RandomForest(m) => m,
            Self::LinearSvm(m) => m,
            Self::NearestCentroid(m) => m,
            Self::Pipeline(m) => m,
        }
    }

    /// Structural checks for a deserialized estimator, run before it can score anything
    pub fn validate(&self) -> Result<(), EstimatorError> {
        match self {
            Self::LogisticRegression(m) if m.coefficients.is_empty() => {
                Err(EstimatorError::Numeric("logistic regression has no coefficients".into()))
            }
            Self::LinearSvm(m) if m.coefficients.is_empty() => {
                Err(EstimatorError::Numeric("linear svm has no coefficients".into()))
            }
            Self::NearestCentroid(m)
                if m.centroids[0].is_empty() || m.centroids[0].len() != m.centroids[1].len() =>
            {
                Err(EstimatorError::Numeric("centroids are empty or of unequal length".into()))
            }
            Self::RandomForest(m) => m.validate(),
            Self::Pipeline(p) => {
                p.estimator.validate()?;
                if let Some(scaler) = &p.preprocessor {
                    scaler.validate(p.estimator.n_features())?;
                }
                match &p.feature_names_in {
                    Some(names) if names.len() != p.estimator.n_features() => {
                        Err(EstimatorError::Numeric(format!(
                            "pipeline names {} features but the estimator has {}",
                            names.len(),
                            p.estimator.n_features()
                        )))
                    }
                    _ => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    /// Column names recorded by a fitted pipeline
    pub fn feature_names_in(&self) -> Option<&[String]> {
        match self {
            Self::Pipeline(p) => p.feature_names_in.as_deref(),
            _ => None,
        }
    }

    /// Importances (forest) or coefficients (linear models), one per input column
    pub fn feature_weights(&self) -> Option<Vec<f64>> {
        match self {
            Self::LogisticRegression(m) => Some(m.coefficients.clone()),
            Self::LinearSvm(m) => Some(m.coefficients.clone()),
            Self::RandomForest(m) => Some(m.feature_importances.clone()),
            Self::NearestCentroid(_) => None,
            Self::Pipeline(p) => p.estimator.feature_weights(),
        }
    }
}

impl Classifier for Estimator {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn capabilities(&self) -> Capabilities {
        self.inner().capabilities()
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<u8>, EstimatorError> {
        self.inner().predict(x)
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, EstimatorError> {
        self.inner().predict_proba(x)
    }

    fn decision_function(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, EstimatorError> {
        self.inner().decision_function(x)
    }
}

/// Optional scaling step in front of an estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names_in: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessor: Option<StandardScaler>,
    pub estimator: Box<Estimator>,
}

impl Pipeline {
    fn with_transformed<T>(
        &self,
        x: ArrayView2<'_, f64>,
        f: impl FnOnce(ArrayView2<'_, f64>) -> Result<T, EstimatorError>,
    ) -> Result<T, EstimatorError> {
        match &self.preprocessor {
            Some(scaler) => {
                let scaled = scaler.transform(x)?;
                f(scaled.view())
            }
            None => f(x),
        }
    }
}

impl Classifier for Pipeline {
    fn name(&self) -> &'static str {
        self.estimator.name()
    }

    fn n_features(&self) -> usize {
        self.estimator.n_features()
    }

    fn capabilities(&self) -> Capabilities {
        self.estimator.capabilities()
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<u8>, EstimatorError> {
        self.with_transformed(x, |x| self.estimator.predict(x))
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, EstimatorError> {
        self.with_transformed(x, |x| self.estimator.predict_proba(x))
    }

    fn decision_function(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, EstimatorError> {
        self.with_transformed(x, |x| self.estimator.decision_function(x))
    }
}

/// Validate a training set: matching lengths, both classes present
pub(crate) fn check_training_set(x: ArrayView2<'_, f64>, y: &[u8]) -> Result<(), EstimatorError> {
    if x.nrows() != y.len() {
        return Err(EstimatorError::Numeric(format!(
            "{} rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(EstimatorError::Numeric("empty training set".into()));
    }
    if y.iter().any(|&v| v > 1) {
        return Err(EstimatorError::Numeric("labels must be 0 or 1".into()));
    }
    if !(y.contains(&0) && y.contains(&1)) {
        return Err(EstimatorError::Numeric("training labels contain a single class".into()));
    }
    Ok(())
}

/// Per-sample weights, `n / (2 * n_class)` when balanced
pub(crate) fn sample_weights(y: &[u8], balanced: bool) -> Vec<f64> {
    if !balanced {
        return vec![1.0; y.len()];
    }

    let positives = y.iter().filter(|&&v| v == 1).count() as f64;
    let negatives = y.len() as f64 - positives;
    let n = y.len() as f64;

    y.iter()
        .map(|&v| {
            let count = if v == 1 { positives } else { negatives };
            if count > 0.0 { n / (2.0 * count) } else { 1.0 }
        })
        .collect()
}

/// `x . w + b` for every row
pub(crate) fn linear_decision(
    x: ArrayView2<'_, f64>,
    coefficients: &[f64],
    intercept: f64,
) -> Result<Array1<f64>, EstimatorError> {
    EstimatorError::check_features(coefficients.len(), x.ncols())?;
    let w = ArrayView1::from(coefficients);
    Ok(x.dot(&w) + intercept)
}
