//! Image Preprocessing
//!
//! Turns an arbitrary source image into a tensor whose spatial size,
//! layout and numeric range match what a style model expects:
//! - Decoding with format checks
//! - Fit or stretch resizing with selectable interpolation
//! - Centered padding to the exact target box
//! - Symmetric, channel-statistics or identity normalization
//! - NHWC or NCHW output layout

mod config;
mod preprocessor;
mod tensor;

pub use config::{AspectPolicy, Interpolation, PreprocessingConfig, PreprocessingOptions};
pub use preprocessor::{decode_source, fit_dimensions, Preprocessor};
pub use tensor::PreparedTensor;

use thiserror::Error;

/// Errors during preprocessing. All of them are fatal to the request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreprocessError {
    #[error("Failed to decode source image: {0}")]
    Decode(String),

    #[error("Render surface unavailable: {0}")]
    RenderSurface(String),

    #[error("Invalid preprocessing config: {0}")]
    InvalidConfig(String),
}
