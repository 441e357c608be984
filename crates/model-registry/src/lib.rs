//! Style Model Registry
//!
//! Maps style identifiers to the metadata a model needs at the pipeline
//! boundary: expected tensor shape and layout, normalization statistics,
//! maximum input edge and accepted source formats.

mod config;
mod normalization;
mod registry;

pub use config::{ModelConfig, SourceFormat, StyleCategory, TensorLayout};
pub use normalization::{NormalizationScheme, IMAGENET_MEAN, IMAGENET_STD, SYMMETRIC_MEAN_STD};
pub use registry::ModelRegistry;

use thiserror::Error;

/// Errors raised while building or querying the registry
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("Unknown style: {0}")]
    UnknownStyle(String),

    #[error("Duplicate style identifier: {0}")]
    DuplicateStyle(String),

    #[error("Style {id}: input shape {shape:?} must be [1, height, width, 3]")]
    InvalidShape { id: String, shape: [usize; 4] },

    #[error("Style {id}: std for channel {channel} must be positive, got {value}")]
    InvalidStd { id: String, channel: usize, value: f32 },

    #[error("Style {id}: input edge {edge} exceeds max_input_edge {max}")]
    EdgeTooLarge { id: String, edge: usize, max: u32 },
}
