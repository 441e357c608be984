//! Validation Error Types

use std::fmt;

use model_registry::TensorLayout;
use serde::Serialize;
use thiserror::Error;

/// Hard validation failures; the tensor must not reach the model
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Buffer length disagrees with the declared shape
    #[error("Tensor holds {actual} samples but its shape declares {expected}")]
    DataLength { expected: usize, actual: usize },

    /// Channel count other than three
    #[error("Expected 3 channels, got {0}")]
    ChannelCount(usize),

    /// Tensor laid out differently from what the model consumes
    #[error("Layout mismatch: model expects {}, tensor is {}", .expected.as_str(), .actual.as_str())]
    LayoutMismatch {
        expected: TensorLayout,
        actual: TensorLayout,
    },

    /// One shape component differs from the model's declaration
    #[error("Shape mismatch in {dimension}: expected {expected}, got {actual}")]
    ShapeMismatch {
        dimension: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Non-fatal range anomaly, surfaced for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RangeWarning {
    /// Observed min/max fall outside the plausible band for the scheme
    OutOfRange {
        scheme: &'static str,
        min: f32,
        max: f32,
        lower: f32,
        upper: f32,
    },
    /// NaN or infinite samples present
    NonFinite { count: usize },
}

impl fmt::Display for RangeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeWarning::OutOfRange {
                scheme,
                min,
                max,
                lower,
                upper,
            } => write!(
                f,
                "{} samples span [{:.3}, {:.3}], expected within [{}, {}]",
                scheme, min, max, lower, upper
            ),
            RangeWarning::NonFinite { count } => write!(f, "{} non-finite samples", count),
        }
    }
}
