//! Tensor Validation
//!
//! Checks a prepared tensor against a model's declared contract before
//! inference is attempted. Shape, layout and length problems are hard
//! failures; implausible sample ranges are reported as warnings only.

mod error;
mod validator;

pub use error::{RangeWarning, ValidationError};
pub use validator::{ValidationConfig, ValidationReport, Validator};
