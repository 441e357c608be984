//! Output Decoding
//!
//! Reconstructs an opaque RGBA image from a model's raw output tensor,
//! reading geometry from the tensor itself and undoing the model's
//! normalization convention.

mod decoder;
mod tensor;

pub use decoder::{encode_png, OutputDecoder};
pub use tensor::OutputTensor;

use thiserror::Error;

/// Errors while decoding model output
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("Model produced no outputs")]
    MissingOutput,

    #[error("Cannot interpret output shape {0:?} as an image")]
    InvalidShape(Vec<usize>),

    #[error("Output holds {actual} samples but its shape declares {expected}")]
    DataLength { expected: usize, actual: usize },
}
