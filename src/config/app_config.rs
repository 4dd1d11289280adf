use std::path::PathBuf;

use serde::Deserialize;

use crate::domain::{Algorithm, TrainingOptions};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub model: ModelConfig,
    pub auth: AuthConfig,
    pub batch: BatchConfig,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for multipart uploads, in megabytes
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    /// Single-line output on stderr, used by the offline subcommands
    Compact,
}

/// Where model artifacts are looked up and written
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub file_name: String,
    pub search_dirs: Vec<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub password: String,
    /// Sessions older than this are rejected and swept
    pub session_ttl_minutes: u64,
    /// Oldest sessions are evicted beyond this count
    pub max_sessions: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Risk percent at or above which a row counts as high risk
    pub default_threshold: f64,
    pub default_top_n: usize,
    pub max_top_n: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub algorithm: Algorithm,
    pub test_size: f64,
    pub random_state: u64,
    pub class_weight_balanced: bool,
    pub scale_features: bool,
    pub n_estimators: usize,
    pub max_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_mb: 64,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            file_name: "heart_model.json".to_string(),
            search_dirs: Vec::new(),
            output_dir: None,
        }
    }
}

impl AuthConfig {
    pub fn session_ttl(&self) -> chrono::Duration {
        i64::try_from(self.session_ttl_minutes)
            .ok()
            .and_then(chrono::Duration::try_minutes)
            .unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password: "1234".to_string(),
            session_ttl_minutes: 480,
            max_sessions: 1000,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            default_threshold: 50.0,
            default_top_n: 10,
            max_top_n: 100,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        let options = TrainingOptions::default();
        Self {
            algorithm: options.algorithm,
            test_size: options.test_size,
            random_state: options.random_state,
            class_weight_balanced: options.class_weight_balanced,
            scale_features: options.scale_features,
            n_estimators: options.n_estimators,
            max_depth: options.max_depth,
        }
    }
}

impl TrainingConfig {
    /// Training options seeded from configuration, for the given target column
    pub fn options(&self, target: impl Into<String>) -> TrainingOptions {
        TrainingOptions {
            target: target.into(),
            algorithm: self.algorithm,
            test_size: self.test_size,
            random_state: self.random_state,
            class_weight_balanced: self.class_weight_balanced,
            scale_features: self.scale_features,
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
        }
    }
}

impl ModelConfig {
    /// Candidate artifact paths: configured dirs, then the executable's dir, then the cwd
    pub fn candidate_paths(&self) -> Vec<PathBuf> {
        let mut dirs = self.search_dirs.clone();

        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(PathBuf::from))
        {
            dirs.push(exe_dir);
        }
        if let Ok(cwd) = std::env::current_dir() {
            dirs.push(cwd);
        }

        let mut paths: Vec<PathBuf> = Vec::new();
        for dir in dirs {
            let path = dir.join(&self.file_name);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }

    /// Where a freshly trained artifact is written
    pub fn output_path(&self) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.join(&self.file_name);
        }
        self.candidate_paths()
            .into_iter()
            .next()
            .unwrap_or_else(|| PathBuf::from(&self.file_name))
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
