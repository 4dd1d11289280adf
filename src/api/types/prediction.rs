//! Request and response bodies for the model and prediction endpoints

use serde::{Deserialize, Serialize};

use crate::domain::{
    Capability, ModelArtifact, ModelMetrics, RawRecord, RawValue, SchemaSource, TargetMapping,
    CANONICAL_FEATURES,
};

/// A single record, either positional or keyed by feature name
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecordInput {
    Positional(Vec<RawValue>),
    Keyed(serde_json::Map<String, serde_json::Value>),
}

impl From<RecordInput> for RawRecord {
    fn from(input: RecordInput) -> Self {
        match input {
            RecordInput::Positional(values) => RawRecord::positional(values),
            RecordInput::Keyed(map) => {
                RawRecord::keyed(map.into_iter().map(|(k, v)| (k, RawValue::from(v))))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    pub record: RecordInput,
}

/// Query parameters for batch scoring
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchQuery {
    /// Risk percent at or above which a row counts as high risk
    pub threshold: Option<f64>,
    pub top_n: Option<usize>,
}

/// Description of the active model
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfoResponse {
    pub estimator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub capability: Capability,
    pub features: Vec<String>,
    pub schema_source: SchemaSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ModelMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_mapping: Option<TargetMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<String>,
    pub warnings: Vec<String>,
}

impl ModelInfoResponse {
    pub fn from_artifact(artifact: &ModelArtifact) -> Self {
        let features = artifact
            .feature_schema()
            .map(|s| s.names().to_vec())
            .unwrap_or_else(|| CANONICAL_FEATURES.iter().map(|s| s.to_string()).collect());
        let metadata = artifact.metadata();

        Self {
            estimator: artifact.classifier().name().to_string(),
            algorithm: metadata.algorithm.clone(),
            origin: artifact.origin().map(str::to_string),
            capability: artifact.capabilities().primary(),
            features,
            schema_source: artifact.schema_source(),
            metrics: metadata.metrics.clone(),
            target_mapping: metadata.target_mapping.clone(),
            trained_at: metadata.trained_at.map(|t| t.to_rfc3339()),
            warnings: artifact.schema_warning().into_iter().collect(),
        }
    }
}
