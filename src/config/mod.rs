mod app_config;

pub use app_config::{
    AppConfig, AuthConfig, BatchConfig, LogFormat, LoggingConfig, ModelConfig, ServerConfig,
    TrainingConfig,
};
