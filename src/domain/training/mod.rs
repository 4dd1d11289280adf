//! Training domain - options, algorithms and evaluation report

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::artifact::TargetMapping;
use crate::domain::DomainError;

/// Default binary target column
pub const DEFAULT_TARGET: &str = "output";

/// Estimator family to fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[default]
    LogisticRegression,
    RandomForest,
    LinearSvm,
    NearestCentroid,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LogisticRegression => "logistic_regression",
            Self::RandomForest => "random_forest",
            Self::LinearSvm => "linear_svm",
            Self::NearestCentroid => "nearest_centroid",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "logistic_regression" | "logistic" => Ok(Self::LogisticRegression),
            "random_forest" | "forest" => Ok(Self::RandomForest),
            "linear_svm" | "svm" => Ok(Self::LinearSvm),
            "nearest_centroid" | "centroid" => Ok(Self::NearestCentroid),
            other => Err(DomainError::validation(format!(
                "unknown algorithm '{}' (expected logistic_regression, random_forest, linear_svm or nearest_centroid)",
                other
            ))),
        }
    }
}

/// Caller-tunable training parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingOptions {
    pub target: String,
    pub algorithm: Algorithm,
    pub test_size: f64,
    pub random_state: u64,
    pub class_weight_balanced: bool,
    pub scale_features: bool,
    pub n_estimators: usize,
    pub max_depth: usize,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            algorithm: Algorithm::default(),
            test_size: 0.2,
            random_state: 42,
            class_weight_balanced: true,
            scale_features: true,
            n_estimators: 100,
            max_depth: 10,
        }
    }
}

impl TrainingOptions {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.target.trim().is_empty() {
            return Err(DomainError::validation("target column must not be empty"));
        }
        if !(0.1..=0.4).contains(&self.test_size) {
            return Err(DomainError::validation(format!(
                "test_size must be between 0.1 and 0.4, got {}",
                self.test_size
            )));
        }
        if self.algorithm == Algorithm::RandomForest && (self.n_estimators == 0 || self.max_depth == 0) {
            return Err(DomainError::validation(
                "n_estimators and max_depth must be positive",
            ));
        }
        Ok(())
    }
}

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: u8,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// 2x2 confusion matrix, `matrix[actual][predicted]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub matrix: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    pub fn from_labels(actual: &[u8], predicted: &[u8]) -> Self {
        let mut cm = Self::default();
        for (&a, &p) in actual.iter().zip(predicted) {
            if a <= 1 && p <= 1 {
                cm.matrix[a as usize][p as usize] += 1;
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        self.matrix[0][0] + self.matrix[1][1]
    }
}

/// Per-feature weight reported after fitting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    pub feature: String,
    pub value: f64,
}

/// Result of one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub algorithm: Algorithm,
    pub target: String,
    pub features: Vec<String>,
    pub rows_used: usize,
    pub rows_dropped: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub accuracy: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roc_auc: Option<f64>,
    pub confusion_matrix: ConfusionMatrix,
    pub classes: Vec<ClassMetrics>,
    /// Importances (forest) or coefficients (linear models)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub feature_weights: Vec<FeatureWeight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_mapping: Option<TargetMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("random-forest".parse::<Algorithm>().unwrap(), Algorithm::RandomForest);
        assert_eq!("SVM".parse::<Algorithm>().unwrap(), Algorithm::LinearSvm);
        assert!("xgboost".parse::<Algorithm>().is_err());
        assert_eq!(Algorithm::NearestCentroid.to_string(), "nearest_centroid");
    }

    #[test]
    fn test_options_validation() {
        assert!(TrainingOptions::default().validate().is_ok());

        let options = TrainingOptions {
            test_size: 0.5,
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(DomainError::Validation { .. })));

        let options = TrainingOptions {
            target: " ".into(),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_confusion_matrix_counts() {
        let cm = ConfusionMatrix::from_labels(&[0, 0, 1, 1, 1], &[0, 1, 1, 1, 0]);
        assert_eq!(cm.matrix, [[1, 1], [1, 2]]);
        assert_eq!(cm.total(), 5);
        assert_eq!(cm.correct(), 3);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: TrainingOptions =
            serde_json::from_str(r#"{"algorithm": "random_forest"}"#).unwrap();
        assert_eq!(options.algorithm, Algorithm::RandomForest);
        assert_eq!(options.target, "output");
        assert_eq!(options.random_state, 42);
    }
}
