//! Risk scoring - labels plus a best-effort probability from a fitted model
//!
//! The probability comes from the first tier that succeeds:
//! 1. the estimator's native positive-class probability,
//! 2. its decision score squashed through a logistic sigmoid (an
//!    approximation, not a calibrated probability),
//! 3. nothing: label only.
//!
//! A failing tier is logged and skipped; it never aborts the prediction.

mod batch;

pub use batch::{
    annotate, clamp_top_n, BatchSummary, RankedRow, MIN_TOP_N, PREDICTION_COLUMN, RISK_PERCENT_COLUMN,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::artifact::ModelArtifact;
use crate::domain::estimator::{Capabilities, Classifier, EstimatorError};
use crate::domain::feature::ReconciledInput;
use crate::domain::DomainError;

/// Probability at or above which a result is high risk
pub const HIGH_RISK_THRESHOLD: f64 = 0.70;
/// Probability at or above which a result is medium risk
pub const MID_RISK_THRESHOLD: f64 = 0.30;

/// Logistic squashing of a decision score
pub fn sigmoid(score: f64) -> f64 {
    1.0 / (1.0 + (-score).exp())
}

/// Which tier produced the probability values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbabilitySource {
    /// The estimator's own class probability
    Native,
    /// Sigmoid of the decision score; uncalibrated
    SigmoidApproximation,
    /// Binary label scaled to 0/1, a display value only
    LabelOnly,
    /// No probability; coarse classification only
    Unavailable,
}

impl ProbabilitySource {
    /// Caveat the caller must show next to the value, if any
    pub fn note(&self) -> Option<&'static str> {
        match self {
            Self::Native => None,
            Self::SigmoidApproximation => Some(
                "probability approximated from the decision score with a sigmoid; it is not calibrated",
            ),
            Self::LabelOnly => Some(
                "the model provides no probabilities; risk values are the binary label scaled to 0% or 100%",
            ),
            Self::Unavailable => Some(
                "the model provides no probabilities; only a coarse classification is available",
            ),
        }
    }

    pub fn is_probabilistic(&self) -> bool {
        matches!(self, Self::Native | Self::SigmoidApproximation)
    }
}

/// Risk band used by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Mid,
    High,
}

impl RiskLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= HIGH_RISK_THRESHOLD {
            Self::High
        } else if probability >= MID_RISK_THRESHOLD {
            Self::Mid
        } else {
            Self::Low
        }
    }
}

/// Label and optional probability for one row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: u8,
    pub probability: Option<f64>,
}

impl PredictionResult {
    pub fn risk_percent(&self) -> Option<f64> {
        self.probability.map(|p| p * 100.0)
    }

    pub fn risk_level(&self) -> Option<RiskLevel> {
        self.probability.map(RiskLevel::from_probability)
    }

    /// Two-line CSV result report
    pub fn report_csv(&self) -> String {
        let risk = self
            .risk_percent()
            .map(|r| format!("{:.2}", r))
            .unwrap_or_else(|| "NA".to_string());

        format!("prediction,{}\nrisk_percent,{}\n", self.label, risk)
    }
}

/// Results for every input row plus the tier that produced the probabilities
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOutcome {
    pub results: Vec<PredictionResult>,
    pub source: ProbabilitySource,
}

impl ScoreOutcome {
    pub fn first(&self) -> Option<&PredictionResult> {
        self.results.first()
    }
}

/// Scores reconciled input against a fitted classifier
#[derive(Debug, Clone, Copy)]
pub struct RiskScorer<'a> {
    classifier: &'a dyn Classifier,
    capabilities: Capabilities,
}

impl<'a> RiskScorer<'a> {
    pub fn new(classifier: &'a dyn Classifier, capabilities: Capabilities) -> Self {
        Self {
            classifier,
            capabilities,
        }
    }

    pub fn for_artifact(artifact: &'a ModelArtifact) -> Self {
        Self::new(artifact.classifier(), artifact.capabilities())
    }

    /// Labels plus the best available probability
    pub fn score(&self, input: &ReconciledInput) -> Result<ScoreOutcome, DomainError> {
        let x = input.matrix().view();
        let labels = self.classifier.predict(x).map_err(predict_error)?;

        if labels.len() != input.n_rows() {
            return Err(DomainError::internal(format!(
                "{} returned {} labels for {} rows",
                self.classifier.name(),
                labels.len(),
                input.n_rows()
            )));
        }

        let (probabilities, source) = match self.estimate(input) {
            Some((values, source)) => (values.into_iter().map(Some).collect(), source),
            None => (vec![None; labels.len()], ProbabilitySource::Unavailable),
        };

        debug!(
            estimator = self.classifier.name(),
            rows = labels.len(),
            source = ?source,
            "Scored input"
        );

        let results = labels
            .iter()
            .zip(probabilities)
            .map(|(&label, probability)| PredictionResult { label, probability })
            .collect();

        Ok(ScoreOutcome { results, source })
    }

    /// Like `score`, but substitutes the label as a 0/1 value when no
    /// probability tier is available
    pub fn score_with_label_fallback(
        &self,
        input: &ReconciledInput,
    ) -> Result<ScoreOutcome, DomainError> {
        let mut outcome = self.score(input)?;

        if outcome.source == ProbabilitySource::Unavailable {
            for result in &mut outcome.results {
                result.probability = Some(f64::from(result.label));
            }
            outcome.source = ProbabilitySource::LabelOnly;
        }

        Ok(outcome)
    }

    fn estimate(&self, input: &ReconciledInput) -> Option<(Vec<f64>, ProbabilitySource)> {
        let x = input.matrix().view();
        let rows = input.n_rows();

        if self.capabilities.probability {
            match self
                .classifier
                .predict_proba(x)
                .and_then(|p| validated(p.to_vec(), rows, true))
            {
                Ok(values) => return Some((values, ProbabilitySource::Native)),
                Err(e) => debug!(error = %e, "Native probability unavailable"),
            }
        }

        if self.capabilities.decision {
            match self
                .classifier
                .decision_function(x)
                .and_then(|s| validated(s.to_vec(), rows, false))
            {
                Ok(scores) => {
                    let values = scores.into_iter().map(sigmoid).collect();
                    return Some((values, ProbabilitySource::SigmoidApproximation));
                }
                Err(e) => debug!(error = %e, "Decision score unavailable"),
            }
        }

        None
    }
}

fn validated(values: Vec<f64>, rows: usize, unit_interval: bool) -> Result<Vec<f64>, EstimatorError> {
    if values.len() != rows {
        return Err(EstimatorError::Numeric(format!(
            "expected {} values, got {}",
            rows,
            values.len()
        )));
    }

    let in_range = |v: &f64| {
        if unit_interval {
            (0.0..=1.0).contains(v)
        } else {
            v.is_finite()
        }
    };

    if let Some(bad) = values.iter().find(|v| !in_range(v)) {
        return Err(EstimatorError::Numeric(format!("out-of-range value {}", bad)));
    }

    Ok(values)
}

fn predict_error(error: EstimatorError) -> DomainError {
    match error {
        EstimatorError::FeatureCount { .. } => DomainError::schema_mismatch(format!(
            "{}; check the input against the model's features or retrain",
            error
        )),
        other => DomainError::internal(format!("prediction failed: {}", other)),
    }
}
