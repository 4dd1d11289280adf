//! Heart disease risk service
//!
//! Scores patient records against a trained binary classifier:
//! - Feature reconciliation of single records and CSV uploads
//! - Risk scoring with a native probability, sigmoid or label-only fallback
//! - Training, artifact persistence and explicit model activation
//! - Synthetic data generation

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use domain::ArtifactSource;
use infrastructure::artifact::FileArtifactRepository;
use infrastructure::services::{ModelRegistry, TrainingService};
use infrastructure::session::SessionStore;

/// Build the application state from configuration
///
/// Nothing is loaded here; the model is read on first use.
pub fn create_app_state_with_config(config: &AppConfig) -> AppState {
    let repository = Arc::new(FileArtifactRepository::from_config(&config.model));
    create_app_state_with_source(repository.clone(), repository, config)
}

/// Build the application state around a custom artifact source
pub fn create_app_state_with_source(
    source: Arc<dyn ArtifactSource>,
    repository: Arc<FileArtifactRepository>,
    config: &AppConfig,
) -> AppState {
    AppState::new(
        Arc::new(ModelRegistry::new(source)),
        Arc::new(TrainingService::new(repository)),
        Arc::new(
            SessionStore::new(config.auth.password.clone())
                .with_limits(config.auth.session_ttl(), config.auth.max_sessions),
        ),
    )
    .with_batch_config(config.batch.clone())
    .with_training_config(config.training.clone())
}
