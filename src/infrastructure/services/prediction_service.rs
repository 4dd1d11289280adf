//! Prediction service - reconcile, score and annotate against the active model

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::ModelRegistry;
use crate::domain::scoring::annotate;
use crate::domain::{
    plausibility_warnings, DataTable, DomainError, FeatureReconciler, PredictionResult,
    ProbabilitySource, RawRecord, RiskLevel, RiskScorer, ScoreOutcome,
};

/// One scored record, ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SinglePrediction {
    pub prediction: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_name: Option<String>,
    pub probability: Option<f64>,
    pub risk_percent: Option<f64>,
    pub risk_level: Option<RiskLevel>,
    pub probability_source: ProbabilitySource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub warnings: Vec<String>,
}

impl SinglePrediction {
    pub fn result(&self) -> PredictionResult {
        PredictionResult {
            label: self.prediction,
            probability: self.probability,
        }
    }
}

/// Scored upload: the annotated table plus the raw outcome for summaries
#[derive(Debug, Clone)]
pub struct BatchPrediction {
    pub table: DataTable,
    pub outcome: ScoreOutcome,
}

#[derive(Debug)]
pub struct PredictionService {
    registry: Arc<ModelRegistry>,
}

impl PredictionService {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Score a single record; plausibility and schema issues become warnings
    pub async fn predict_record(&self, record: &RawRecord) -> Result<SinglePrediction, DomainError> {
        let model = self.registry.current().await?;

        let input = FeatureReconciler::new(model.feature_schema()).reconcile(record)?;
        if input.n_rows() != 1 {
            return Err(DomainError::validation(format!(
                "expected a single record, got {} rows",
                input.n_rows()
            )));
        }

        let outcome = RiskScorer::for_artifact(&model).score(&input)?;
        let result = outcome
            .first()
            .copied()
            .ok_or_else(|| DomainError::internal("scorer returned no result"))?;

        let mut warnings = plausibility_warnings(&input, 0);
        warnings.extend(model.schema_warning());

        debug!(
            label = result.label,
            source = ?outcome.source,
            warnings = warnings.len(),
            "Scored single record"
        );

        Ok(SinglePrediction {
            prediction: result.label,
            label_name: model.label_name(result.label).map(str::to_string),
            probability: result.probability,
            risk_percent: result.risk_percent(),
            risk_level: result.risk_level(),
            probability_source: outcome.source,
            note: outcome.source.note().map(str::to_string),
            warnings,
        })
    }

    /// Score every row of an uploaded table
    ///
    /// Any missing required column rejects the whole table before scoring.
    pub async fn predict_table(&self, table: &DataTable) -> Result<BatchPrediction, DomainError> {
        let model = self.registry.current().await?;

        let input = FeatureReconciler::new(model.feature_schema()).reconcile_table(table)?;
        let outcome = RiskScorer::for_artifact(&model).score_with_label_fallback(&input)?;

        if outcome.source == ProbabilitySource::LabelOnly {
            warn!(rows = table.n_rows(), "Model exposes no probabilities, reporting labels as 0/100%");
        }

        Ok(BatchPrediction {
            table: annotate(table, &outcome),
            outcome,
        })
    }
}
