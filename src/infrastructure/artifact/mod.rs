//! File-backed model artifacts

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ModelConfig;
use crate::domain::{
    ArtifactMetadata, ArtifactSource, Classifier, DomainError, FeatureSchema, ModelArtifact,
};
use crate::infrastructure::estimator::Estimator;

/// On-disk artifact: an estimator plus optional training metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub estimator: Estimator,
    #[serde(flatten)]
    pub metadata: ArtifactMetadata,
}

impl ArtifactBundle {
    /// Decode either a bundle or a bare estimator (an object carrying `kind`)
    pub fn decode(bytes: &[u8]) -> Result<Self, DomainError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| DomainError::artifact(format!("artifact is not valid JSON: {}", e)))?;

        let Some(object) = value.as_object() else {
            return Err(DomainError::artifact("artifact must be a JSON object"));
        };

        let bundle = if object.contains_key("kind") {
            let estimator: Estimator = serde_json::from_value(value)
                .map_err(|e| DomainError::artifact(format!("unreadable estimator: {}", e)))?;
            Self {
                estimator,
                metadata: ArtifactMetadata::default(),
            }
        } else if object.contains_key("estimator") {
            serde_json::from_value(value)
                .map_err(|e| DomainError::artifact(format!("unreadable artifact bundle: {}", e)))?
        } else {
            return Err(DomainError::artifact(
                "artifact has neither an 'estimator' entry nor an estimator 'kind'",
            ));
        };

        bundle
            .estimator
            .validate()
            .map_err(|e| DomainError::artifact(format!("inconsistent estimator: {}", e)))?;
        Ok(bundle)
    }

    pub fn encode(&self) -> Result<Vec<u8>, DomainError> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| DomainError::artifact(format!("cannot serialize artifact: {}", e)))
    }

    /// Build the immutable runtime model, resolving the feature schema
    pub fn into_artifact(self) -> ModelArtifact {
        let inferred = self
            .estimator
            .feature_names_in()
            .map(|names| FeatureSchema::new(names.to_vec()));

        if let Some(features) = &self.metadata.features {
            if features.len() != self.estimator.n_features() {
                warn!(
                    declared = features.len(),
                    fitted = self.estimator.n_features(),
                    "Declared feature list does not match the fitted estimator"
                );
            }
        }

        ModelArtifact::new(Arc::new(self.estimator), self.metadata).with_inferred_schema(inferred)
    }
}

/// Looks up the artifact in an ordered list of candidate paths
#[derive(Debug, Clone)]
pub struct FileArtifactRepository {
    candidates: Vec<PathBuf>,
    output: PathBuf,
}

impl FileArtifactRepository {
    pub fn new(candidates: Vec<PathBuf>, output: PathBuf) -> Self {
        Self { candidates, output }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.candidate_paths(), config.output_path())
    }

    /// A repository reading and writing exactly one path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::new(vec![path.clone()], path)
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub async fn load_from(&self, path: &Path) -> Result<ModelArtifact, DomainError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            DomainError::artifact(format!("cannot read {}: {}", path.display(), e))
        })?;

        let artifact = ArtifactBundle::decode(&bytes)
            .map_err(|e| match e {
                DomainError::Artifact { message } => {
                    DomainError::artifact(format!("{}: {}", path.display(), message))
                }
                other => other,
            })?
            .into_artifact()
            .with_origin(path.display().to_string());

        info!(
            path = %path.display(),
            estimator = artifact.classifier().name(),
            capability = ?artifact.capabilities().primary(),
            schema = ?artifact.schema_source(),
            "Loaded model artifact"
        );

        Ok(artifact)
    }

    /// Write the bundle atomically: temp file in the target directory, then rename
    pub async fn save(&self, bundle: &ArtifactBundle) -> Result<PathBuf, DomainError> {
        let bytes = bundle.encode()?;
        // never replace a working model with one that cannot be read back
        ArtifactBundle::decode(&bytes)?;
        let target = self.output.clone();

        if let Some(dir) = target.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                DomainError::artifact(format!("cannot create {}: {}", dir.display(), e))
            })?;
        }

        let tmp = target.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &bytes).await.map_err(|e| {
            DomainError::artifact(format!("cannot write {}: {}", tmp.display(), e))
        })?;

        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(DomainError::artifact(format!(
                "cannot move artifact into {}: {}",
                target.display(),
                e
            )));
        }

        info!(path = %target.display(), bytes = bytes.len(), "Saved model artifact");
        Ok(target)
    }
}

#[async_trait]
impl ArtifactSource for FileArtifactRepository {
    async fn load(&self) -> Result<ModelArtifact, DomainError> {
        for path in &self.candidates {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                return self.load_from(path).await;
            }
            debug!(path = %path.display(), "No artifact at candidate path");
        }

        Err(DomainError::artifact_not_found(
            self.candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        ))
    }

    fn describe(&self) -> String {
        self.candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModelMetrics, SchemaSource};
    use crate::infrastructure::estimator::{LinearSvm, LogisticRegression, Pipeline, StandardScaler};

    fn logistic() -> Estimator {
        Estimator::LogisticRegression(LogisticRegression {
            coefficients: vec![0.1; 13],
            intercept: 0.0,
        })
    }

    #[test]
    fn test_decode_bare_estimator() {
        let bytes = serde_json::to_vec(&logistic()).unwrap();
        let bundle = ArtifactBundle::decode(&bytes).unwrap();

        assert_eq!(bundle.estimator, logistic());
        assert_eq!(bundle.metadata, ArtifactMetadata::default());
        assert_eq!(bundle.into_artifact().schema_source(), SchemaSource::CanonicalFallback);
    }

    #[test]
    fn test_decode_bundle_with_metadata() {
        let json = serde_json::json!({
            "estimator": serde_json::to_value(logistic()).unwrap(),
            "features": ["age", "sex"],
            "metrics": {"accuracy": 0.85, "roc_auc": 0.9},
            "target_mapping": {"0": "no", "1": "yes"}
        });
        let bundle = ArtifactBundle::decode(json.to_string().as_bytes()).unwrap();

        assert_eq!(
            bundle.metadata.metrics,
            Some(ModelMetrics {
                accuracy: 0.85,
                roc_auc: Some(0.9)
            })
        );
        let artifact = bundle.into_artifact();
        assert_eq!(artifact.schema_source(), SchemaSource::Declared);
        assert_eq!(artifact.label_name(1), Some("yes"));
    }

    #[test]
    fn test_pipeline_feature_names_become_the_schema() {
        let pipeline = Estimator::Pipeline(Pipeline {
            feature_names_in: Some(vec!["b".into(), "a".into()]),
            preprocessor: Some(StandardScaler {
                mean: vec![0.0, 0.0],
                scale: vec![1.0, 1.0],
            }),
            estimator: Box::new(Estimator::LinearSvm(LinearSvm {
                coefficients: vec![1.0, 1.0],
                intercept: 0.0,
            })),
        });
        let bytes = serde_json::to_vec(&pipeline).unwrap();
        let artifact = ArtifactBundle::decode(&bytes).unwrap().into_artifact();

        assert_eq!(artifact.schema_source(), SchemaSource::Pipeline);
        assert_eq!(artifact.feature_schema().unwrap().names(), ["b", "a"]);
        assert!(artifact.schema_warning().is_some());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            ArtifactBundle::decode(b"not json"),
            Err(DomainError::Artifact { .. })
        ));
        assert!(matches!(
            ArtifactBundle::decode(br#"{"something": 1}"#),
            Err(DomainError::Artifact { .. })
        ));
        assert!(matches!(
            ArtifactBundle::decode(br#"{"kind": "quantum_forest"}"#),
            Err(DomainError::Artifact { .. })
        ));
    }

    fn forest_artifact(tree: serde_json::Value) -> Vec<u8> {
        serde_json::json!({
            "kind": "random_forest",
            "n_features": 13,
            "trees": [{"nodes": tree}],
            "feature_importances": vec![0.0; 13]
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_decode_rejects_structurally_broken_forests() {
        let broken = [
            serde_json::json!([]),
            serde_json::json!([{"node": "split", "feature": 0, "threshold": 1.0, "left": 7, "right": 7}]),
            serde_json::json!([
                {"node": "split", "feature": 99, "threshold": 1.0, "left": 1, "right": 2},
                {"node": "leaf", "positive_fraction": 0.2},
                {"node": "leaf", "positive_fraction": 0.8}
            ]),
            serde_json::json!([
                {"node": "split", "feature": 0, "threshold": 1.0, "left": 0, "right": 1},
                {"node": "leaf", "positive_fraction": 0.8}
            ]),
        ];

        for tree in broken {
            let result = ArtifactBundle::decode(&forest_artifact(tree.clone()));
            assert!(
                matches!(result, Err(DomainError::Artifact { .. })),
                "accepted {tree}"
            );
        }

        let valid = serde_json::json!([
            {"node": "split", "feature": 12, "threshold": 1.0, "left": 1, "right": 2},
            {"node": "leaf", "positive_fraction": 0.2},
            {"node": "leaf", "positive_fraction": 0.8}
        ]);
        assert!(ArtifactBundle::decode(&forest_artifact(valid)).is_ok());
    }

    #[tokio::test]
    async fn test_save_refuses_an_unreadable_bundle_and_keeps_the_old_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heart_model.json");
        std::fs::write(&path, b"previous").unwrap();

        let bundle = ArtifactBundle {
            estimator: Estimator::LogisticRegression(LogisticRegression {
                coefficients: Vec::new(),
                intercept: 0.0,
            }),
            metadata: ArtifactMetadata::default(),
        };
        let result = FileArtifactRepository::at(&path).save(&bundle).await;

        assert!(matches!(result, Err(DomainError::Artifact { .. })));
        assert_eq!(std::fs::read(&path).unwrap(), b"previous");
    }

    #[tokio::test]
    async fn test_missing_artifact_lists_searched_paths() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileArtifactRepository::new(
            vec![dir.path().join("a.json"), dir.path().join("b.json")],
            dir.path().join("a.json"),
        );

        match repo.load().await {
            Err(DomainError::ArtifactNotFound { searched }) => {
                assert_eq!(searched.len(), 2);
                assert!(searched[1].ends_with("b.json"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_save_then_load_from_second_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("models").join("heart_model.json");
        let repo = FileArtifactRepository::new(
            vec![dir.path().join("missing.json"), target.clone()],
            target.clone(),
        );

        let bundle = ArtifactBundle {
            estimator: logistic(),
            metadata: ArtifactMetadata {
                algorithm: Some("logistic_regression".into()),
                ..Default::default()
            },
        };
        let saved = repo.save(&bundle).await.unwrap();
        assert_eq!(saved, target);

        let leftovers: Vec<_> = std::fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        let artifact = repo.load().await.unwrap();
        assert_eq!(artifact.metadata().algorithm.as_deref(), Some("logistic_regression"));
        assert_eq!(artifact.origin(), Some(target.display().to_string().as_str()));
        assert!(artifact.capabilities().probability);
    }

    #[tokio::test]
    async fn test_corrupt_artifact_is_an_artifact_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heart_model.json");
        std::fs::write(&path, b"{broken").unwrap();

        let result = FileArtifactRepository::at(&path).load().await;
        assert!(matches!(result, Err(DomainError::Artifact { .. })));
    }
}
