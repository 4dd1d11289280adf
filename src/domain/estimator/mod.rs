//! Estimator domain - the fitted-classifier seam the scorer works against

use std::fmt::Debug;

use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised by a fitted estimator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimatorError {
    #[error("{operation} is not supported by {estimator}")]
    Unsupported {
        estimator: &'static str,
        operation: &'static str,
    },

    #[error("input has {actual} features, estimator was fitted with {expected}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("numeric failure: {0}")]
    Numeric(String),
}

impl EstimatorError {
    pub fn unsupported(estimator: &'static str, operation: &'static str) -> Self {
        Self::Unsupported {
            estimator,
            operation,
        }
    }

    pub fn check_features(expected: usize, actual: usize) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::FeatureCount { expected, actual })
        }
    }
}

/// Highest probability tier an estimator can deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    NativeProbability,
    DecisionScore,
    LabelOnly,
}

/// Which optional outputs an estimator exposes, resolved once at load time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub probability: bool,
    pub decision: bool,
}

impl Capabilities {
    pub const LABEL_ONLY: Self = Self {
        probability: false,
        decision: false,
    };

    pub fn primary(&self) -> Capability {
        if self.probability {
            Capability::NativeProbability
        } else if self.decision {
            Capability::DecisionScore
        } else {
            Capability::LabelOnly
        }
    }
}

/// A fitted binary classifier over a numeric matrix
///
/// `predict` is mandatory. `predict_proba` returns the probability of the
/// positive class per row and `decision_function` a signed margin per row;
/// both default to `Unsupported`.
pub trait Classifier: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    /// Number of input columns the estimator was fitted with
    fn n_features(&self) -> usize;

    fn capabilities(&self) -> Capabilities;

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<u8>, EstimatorError>;

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, EstimatorError> {
        let _ = x;
        Err(EstimatorError::unsupported(self.name(), "predict_proba"))
    }

    fn decision_function(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, EstimatorError> {
        let _ = x;
        Err(EstimatorError::unsupported(self.name(), "decision_function"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_capability_order() {
        let both = Capabilities {
            probability: true,
            decision: true,
        };
        assert_eq!(both.primary(), Capability::NativeProbability);

        let decision = Capabilities {
            probability: false,
            decision: true,
        };
        assert_eq!(decision.primary(), Capability::DecisionScore);
        assert_eq!(Capabilities::LABEL_ONLY.primary(), Capability::LabelOnly);
    }

    #[test]
    fn test_feature_count_check() {
        assert!(EstimatorError::check_features(13, 13).is_ok());
        assert_eq!(
            EstimatorError::check_features(13, 12),
            Err(EstimatorError::FeatureCount {
                expected: 13,
                actual: 12
            })
        );
    }

    #[test]
    fn test_capability_serialization() {
        assert_eq!(
            serde_json::to_string(&Capability::DecisionScore).unwrap(),
            "\"decision_score\""
        );
    }
}
