//! Style Transfer Inference Engine
//!
//! Runs prepared tensors through cached ONNX sessions (tract) and degrades
//! to the deterministic fallback simulator whenever validation, loading,
//! execution or decoding fails.

mod cache;
pub mod mock;
mod orchestrator;
mod session;
mod tract_backend;

pub use cache::SessionCache;
pub use orchestrator::{ExecutionPath, InferenceResult, Orchestrator, Outcome};
pub use session::{ModelSession, SessionLoader};
pub use tract_backend::{TractLoader, TractSession};

use output_decoder::DecodeError;
use tensor_validator::ValidationError;
use thiserror::Error;

/// Conditions that prevent the model path; each one triggers fallback
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("Tensor rejected: {0}")]
    ShapeMismatch(#[from] ValidationError),

    #[error("Model load failed for {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("Inference failed: {0}")]
    Runtime(String),

    #[error("Model produced no outputs")]
    MissingOutput,

    #[error("Output decode failed: {0}")]
    OutputDecode(DecodeError),
}

impl From<DecodeError> for InferenceError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::MissingOutput => InferenceError::MissingOutput,
            other => InferenceError::OutputDecode(other),
        }
    }
}

/// Failures surfaced to the caller as hard errors
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Style {style} requires successful inference: {reason}")]
    UnsupportedFallback {
        style: String,
        reason: InferenceError,
    },

    #[error("Failed to encode result image: {0}")]
    Encode(String),
}
