//! Application services shared by the HTTP surface and the CLI

mod model_registry;
mod prediction_service;
mod training_service;

pub use model_registry::ModelRegistry;
pub use prediction_service::{BatchPrediction, PredictionService, SinglePrediction};
pub use training_service::TrainingService;
