//! Style Transfer Pipeline
//!
//! Caller-facing facade: resolves a style, preprocesses the source image,
//! runs inference through the session cache and falls back to the
//! simulator when the model path is unavailable.

mod pipeline;
mod settings;

pub use pipeline::PipelineContext;
pub use settings::{init_logging, PipelineSettings, ENV_PREFIX};

pub use image_preprocess::{AspectPolicy, Interpolation, PreprocessingOptions};
pub use inference_engine::{ExecutionPath, InferenceError, InferenceResult, Outcome};
pub use model_registry::{ModelConfig, ModelRegistry, StyleCategory};

use image_preprocess::PreprocessError;
use inference_engine::RunError;
use thiserror::Error;

/// Errors returned to callers. Everything else degrades to fallback.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unknown style: {0}")]
    UnknownStyle(String),

    #[error("Preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),
}
