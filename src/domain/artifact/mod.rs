//! Model artifact domain - a fitted classifier plus its training metadata

mod repository;

pub use repository::ArtifactSource;

#[cfg(test)]
pub use repository::MockArtifactSource;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::estimator::{Capabilities, Classifier};
use crate::domain::feature::FeatureSchema;

/// Evaluation metrics recorded at training time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roc_auc: Option<f64>,
}

/// Encoded label -> original target value
pub type TargetMapping = BTreeMap<u8, String>;

/// Optional metadata stored next to the estimator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ModelMetrics>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_keyed_mapping"
    )]
    pub target_mapping: Option<TargetMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<DateTime<Utc>>,
}

/// JSON object keys always arrive as strings, including inside flattened structs
fn string_keyed_mapping<'de, D>(deserializer: D) -> Result<Option<TargetMapping>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, String>> = Option::deserialize(deserializer)?;
    raw.map(|map| {
        map.into_iter()
            .map(|(key, value)| {
                key.trim().parse::<u8>().map(|label| (label, value)).map_err(|_| {
                    serde::de::Error::custom(format!("target mapping key '{}' is not a class label", key))
                })
            })
            .collect()
    })
    .transpose()
}

/// Where the active feature schema came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaSource {
    /// Stored explicitly in the artifact metadata
    Declared,
    /// Read from the fitted preprocessing step
    Pipeline,
    /// Neither available; reconciliation uses the canonical list
    CanonicalFallback,
}

/// A loaded, immutable model. Replaced wholesale on activation, never mutated.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    classifier: Arc<dyn Classifier>,
    metadata: ArtifactMetadata,
    inferred_schema: Option<FeatureSchema>,
    capabilities: Capabilities,
    origin: Option<String>,
}

impl ModelArtifact {
    /// Wrap a classifier, probing its capabilities once
    pub fn new(classifier: Arc<dyn Classifier>, metadata: ArtifactMetadata) -> Self {
        let capabilities = classifier.capabilities();
        Self {
            classifier,
            metadata,
            inferred_schema: None,
            capabilities,
            origin: None,
        }
    }

    /// Schema discovered from the fitted pipeline, used when metadata has none
    pub fn with_inferred_schema(mut self, schema: Option<FeatureSchema>) -> Self {
        self.inferred_schema = schema.filter(|s| !s.is_empty());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn feature_schema(&self) -> Option<&FeatureSchema> {
        self.metadata
            .features
            .as_ref()
            .filter(|s| !s.is_empty())
            .or(self.inferred_schema.as_ref())
    }

    pub fn schema_source(&self) -> SchemaSource {
        if self.metadata.features.as_ref().is_some_and(|s| !s.is_empty()) {
            SchemaSource::Declared
        } else if self.inferred_schema.is_some() {
            SchemaSource::Pipeline
        } else {
            SchemaSource::CanonicalFallback
        }
    }

    /// Warning when the model expects different names or order than the input form
    pub fn schema_warning(&self) -> Option<String> {
        let schema = self.feature_schema()?;
        if schema.is_canonical() {
            return None;
        }

        Some(format!(
            "the loaded model expects different fields (names or order) than the input form: {}; retrain or use a model fitted on the standard features",
            schema.names().join(", ")
        ))
    }

    /// Original target value for an encoded label, when a mapping was stored
    pub fn label_name(&self, label: u8) -> Option<&str> {
        self.metadata
            .target_mapping
            .as_ref()?
            .get(&label)
            .map(String::as_str)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::StubClassifier;
    use super::*;

    fn artifact(metadata: ArtifactMetadata) -> ModelArtifact {
        ModelArtifact::new(Arc::new(StubClassifier::label_only(vec![1])), metadata)
    }

    #[test]
    fn test_target_mapping_reads_string_keys() {
        let metadata = ArtifactMetadata {
            target_mapping: Some(TargetMapping::from([(0, "no".into()), (1, "yes".into())])),
            ..Default::default()
        };
        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains(r#""0":"no""#));

        let back: ArtifactMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metadata);

        let err = serde_json::from_str::<ArtifactMetadata>(r#"{"target_mapping": {"zero": "no"}}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_declared_schema_wins_over_inferred() {
        let declared = FeatureSchema::new(vec!["a".into()]);
        let model = artifact(ArtifactMetadata {
            features: Some(declared.clone()),
            ..Default::default()
        })
        .with_inferred_schema(Some(FeatureSchema::new(vec!["b".into()])));

        assert_eq!(model.feature_schema(), Some(&declared));
        assert_eq!(model.schema_source(), SchemaSource::Declared);
    }

    #[test]
    fn test_inferred_schema_and_fallback() {
        let model = artifact(ArtifactMetadata::default())
            .with_inferred_schema(Some(FeatureSchema::canonical()));
        assert_eq!(model.schema_source(), SchemaSource::Pipeline);
        assert!(model.schema_warning().is_none());

        let bare = artifact(ArtifactMetadata::default());
        assert_eq!(bare.feature_schema(), None);
        assert_eq!(bare.schema_source(), SchemaSource::CanonicalFallback);
    }

    #[test]
    fn test_non_canonical_schema_warns() {
        let model = artifact(ArtifactMetadata {
            features: Some(FeatureSchema::new(vec!["sex".into(), "age".into()])),
            ..Default::default()
        });
        let warning = model.schema_warning().unwrap();
        assert!(warning.contains("sex, age"));
    }

    #[test]
    fn test_capabilities_are_probed_at_construction() {
        let model = ModelArtifact::new(
            Arc::new(StubClassifier::label_only(vec![0]).with_scores(vec![0.5])),
            ArtifactMetadata::default(),
        );
        assert!(model.capabilities().decision);
        assert!(!model.capabilities().probability);
    }

    #[test]
    fn test_label_name_uses_target_mapping() {
        let mut mapping = TargetMapping::new();
        mapping.insert(0, "healthy".into());
        mapping.insert(1, "disease".into());

        let model = artifact(ArtifactMetadata {
            target_mapping: Some(mapping),
            ..Default::default()
        });
        assert_eq!(model.label_name(1), Some("disease"));
        assert_eq!(artifact(ArtifactMetadata::default()).label_name(1), None);
    }

    #[test]
    fn test_metadata_json_shape() {
        let mut mapping = TargetMapping::new();
        mapping.insert(1, "yes".into());
        let metadata = ArtifactMetadata {
            metrics: Some(ModelMetrics {
                accuracy: 0.8,
                roc_auc: None,
            }),
            target_mapping: Some(mapping),
            ..Default::default()
        };

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["metrics"]["accuracy"], 0.8);
        assert_eq!(json["target_mapping"]["1"], "yes");
        assert!(json.get("features").is_none());
    }
}
