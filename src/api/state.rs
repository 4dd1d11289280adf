//! Application state shared by every handler

use std::sync::Arc;

use crate::config::{BatchConfig, TrainingConfig};
use crate::infrastructure::services::{ModelRegistry, PredictionService, TrainingService};
use crate::infrastructure::session::SessionStore;

/// Process-wide services; the active model lives in `registry`
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub prediction_service: Arc<PredictionService>,
    pub training_service: Arc<TrainingService>,
    pub sessions: Arc<SessionStore>,
    pub batch: BatchConfig,
    pub training: TrainingConfig,
}

impl AppState {
    pub fn new(
        registry: Arc<ModelRegistry>,
        training_service: Arc<TrainingService>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            prediction_service: Arc::new(PredictionService::new(Arc::clone(&registry))),
            registry,
            training_service,
            sessions,
            batch: BatchConfig::default(),
            training: TrainingConfig::default(),
        }
    }

    pub fn with_batch_config(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }

    pub fn with_training_config(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }
}
