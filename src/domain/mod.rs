//! Domain layer - Core business logic and entities

pub mod artifact;
pub mod error;
pub mod estimator;
pub mod feature;
pub mod scoring;
pub mod training;

pub use artifact::{
    ArtifactMetadata, ArtifactSource, ModelArtifact, ModelMetrics, SchemaSource, TargetMapping,
};
pub use error::{DomainError, InvalidCell};
pub use estimator::{Capabilities, Capability, Classifier, EstimatorError};
pub use feature::{
    plausibility_warnings, DataTable, FeatureReconciler, FeatureSchema, RawRecord, RawValue,
    ReconciledInput, CANONICAL_FEATURES,
};
pub use scoring::{
    BatchSummary, PredictionResult, ProbabilitySource, RiskLevel, RiskScorer, ScoreOutcome,
};
pub use training::{
    Algorithm, ClassMetrics, ConfusionMatrix, FeatureWeight, TrainingOptions, TrainingReport,
};
