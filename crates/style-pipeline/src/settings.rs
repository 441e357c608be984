//! Pipeline settings and logging setup

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use image_preprocess::Interpolation;
use serde::{Deserialize, Serialize};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

/// Environment variable prefix, e.g. `STYLE_PIPELINE__MODEL_DIR`
pub const ENV_PREFIX: &str = "STYLE_PIPELINE";

/// Process-level pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Directory that model files resolve against
    pub model_dir: PathBuf,
    /// `tracing` level name used by [`init_logging`]
    pub log_level: String,
    /// Interpolation used when a request leaves it unset
    pub interpolation: Interpolation,
    /// Padding color used when a request leaves it unset
    pub pad_color: [u8; 3],
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            log_level: "info".to_string(),
            interpolation: Interpolation::Bilinear,
            pad_color: [0, 0, 0],
        }
    }
}

impl PipelineSettings {
    /// Load settings from an optional file, then `STYLE_PIPELINE__*`
    /// environment variables. Missing keys keep their defaults; a file that
    /// was asked for but does not exist is an error.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!("Reading pipeline settings from {}", path);
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn with_model_dir(mut self, model_dir: impl Into<PathBuf>) -> Self {
        self.model_dir = model_dir.into();
        self
    }

    /// Parsed log level
    pub fn level(&self) -> Result<Level, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::Message(format!("invalid log level '{}'", self.log_level)))
    }
}

/// Install the global fmt subscriber at `level`
pub fn init_logging(level: Level) -> Result<(), ConfigError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ConfigError::Message(format!("failed to set tracing subscriber: {}", e)))
}
