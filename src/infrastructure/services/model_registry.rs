//! Model registry - the process-wide active model

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::{ArtifactSource, DomainError, ModelArtifact};

/// Holds the active artifact behind a replace-only `Arc`
///
/// The first `current()` call loads lazily; `activate()` re-reads the
/// source and swaps the reference. A failed activation keeps the old model.
pub struct ModelRegistry {
    source: Arc<dyn ArtifactSource>,
    active: RwLock<Option<Arc<ModelArtifact>>>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("source", &self.source.describe())
            .finish_non_exhaustive()
    }
}

impl ModelRegistry {
    pub fn new(source: Arc<dyn ArtifactSource>) -> Self {
        Self {
            source,
            active: RwLock::new(None),
        }
    }

    /// The active model, loading it on first use
    pub async fn current(&self) -> Result<Arc<ModelArtifact>, DomainError> {
        if let Some(model) = self.active.read().await.as_ref() {
            return Ok(Arc::clone(model));
        }

        let mut active = self.active.write().await;
        if let Some(model) = active.as_ref() {
            return Ok(Arc::clone(model));
        }

        let model = Arc::new(self.source.load().await?);
        *active = Some(Arc::clone(&model));
        Ok(model)
    }

    /// Re-read the artifact and make it the active model
    pub async fn activate(&self) -> Result<Arc<ModelArtifact>, DomainError> {
        let model = match self.source.load().await {
            Ok(model) => Arc::new(model),
            Err(e) => {
                warn!(error = %e, "Model activation failed, keeping the previous model");
                return Err(e);
            }
        };

        *self.active.write().await = Some(Arc::clone(&model));
        info!(
            estimator = model.classifier().name(),
            origin = model.origin().unwrap_or("unknown"),
            "Activated model"
        );
        Ok(model)
    }

    /// The active model without triggering a load
    pub async fn peek(&self) -> Option<Arc<ModelArtifact>> {
        self.active.read().await.clone()
    }

    pub fn describe_source(&self) -> String {
        self.source.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artifact::fixtures::StubClassifier;
    use crate::domain::artifact::MockArtifactSource;
    use crate::domain::ArtifactMetadata;

    fn artifact(algorithm: &str) -> ModelArtifact {
        ModelArtifact::new(
            Arc::new(StubClassifier::label_only(vec![1])),
            ArtifactMetadata {
                algorithm: Some(algorithm.to_string()),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_current_loads_once() {
        let mut source = MockArtifactSource::new();
        source.expect_load().times(1).returning(|| Ok(artifact("first")));

        let registry = ModelRegistry::new(Arc::new(source));
        assert!(registry.peek().await.is_none());

        let a = registry.current().await.unwrap();
        let b = registry.current().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(registry.peek().await.is_some());
    }

    #[tokio::test]
    async fn test_activate_swaps_reference() {
        let mut source = MockArtifactSource::new();
        let mut calls = 0;
        source.expect_load().times(2).returning(move || {
            calls += 1;
            Ok(artifact(if calls == 1 { "first" } else { "second" }))
        });

        let registry = ModelRegistry::new(Arc::new(source));
        let before = registry.current().await.unwrap();
        let after = registry.activate().await.unwrap();

        assert_eq!(before.metadata().algorithm.as_deref(), Some("first"));
        assert_eq!(after.metadata().algorithm.as_deref(), Some("second"));
        assert!(Arc::ptr_eq(&after, &registry.current().await.unwrap()));
    }

    #[tokio::test]
    async fn test_failed_activation_keeps_previous_model() {
        let mut source = MockArtifactSource::new();
        let mut calls = 0;
        source.expect_load().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(artifact("first"))
            } else {
                Err(DomainError::artifact("corrupt"))
            }
        });

        let registry = ModelRegistry::new(Arc::new(source));
        registry.current().await.unwrap();
        assert!(registry.activate().await.is_err());

        let still = registry.current().await.unwrap();
        assert_eq!(still.metadata().algorithm.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_missing_artifact_propagates() {
        let mut source = MockArtifactSource::new();
        source
            .expect_load()
            .returning(|| Err(DomainError::artifact_not_found(vec!["/x/heart_model.json".into()])));

        let registry = ModelRegistry::new(Arc::new(source));
        assert!(matches!(
            registry.current().await,
            Err(DomainError::ArtifactNotFound { .. })
        ));
        assert!(registry.peek().await.is_none());
    }
}
