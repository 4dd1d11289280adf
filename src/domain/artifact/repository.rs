//! Artifact source trait

use async_trait::async_trait;

use super::ModelArtifact;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Loads the serialized model artifact
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Read and decode the artifact; `ArtifactNotFound` when no candidate exists
    async fn load(&self) -> Result<ModelArtifact, DomainError>;

    /// Human-readable description of where artifacts are looked up
    fn describe(&self) -> String;
}
