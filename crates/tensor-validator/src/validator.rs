//! Tensor Validator

use image_preprocess::PreparedTensor;
use model_registry::{ModelConfig, NormalizationScheme};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RangeWarning, ValidationError};

const DIMENSIONS: [&str; 4] = ["batch", "height", "width", "channels"];

/// Plausible sample bands per normalization scheme
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Band for the -1..1 scheme
    pub symmetric_range: (f32, f32),
    /// Loose sanity band for channel-statistics output
    pub channel_stats_range: (f32, f32),
    /// Band for the 0..1 scheme
    pub identity_range: (f32, f32),
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            symmetric_range: (-1.1, 1.1),
            channel_stats_range: (-3.0, 3.0),
            identity_range: (-0.1, 1.1),
        }
    }
}

/// Outcome of a successful validation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Range anomalies found
    pub warnings: Vec<RangeWarning>,
}

impl ValidationReport {
    /// No warnings raised
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Validator for prepared tensors
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a tensor against a model's contract
    pub fn validate(
        &self,
        tensor: &PreparedTensor,
        model: &ModelConfig,
    ) -> Result<ValidationReport, ValidationError> {
        self.validate_structure(tensor, model)?;

        let warnings = self.check_range(tensor);
        for warning in &warnings {
            warn!("Tensor range warning for {}: {}", model.id, warning);
        }
        debug!(
            "Tensor {:?} validated for {} ({} warnings)",
            tensor.shape,
            model.id,
            warnings.len()
        );

        Ok(ValidationReport { warnings })
    }

    /// Hard checks: channels, layout, buffer length and shape
    pub fn validate_structure(
        &self,
        tensor: &PreparedTensor,
        model: &ModelConfig,
    ) -> Result<(), ValidationError> {
        if tensor.channels != 3 {
            return Err(ValidationError::ChannelCount(tensor.channels));
        }

        if tensor.layout != model.input_layout {
            return Err(ValidationError::LayoutMismatch {
                expected: model.input_layout,
                actual: tensor.layout,
            });
        }

        let expected_len = tensor.declared_len();
        if tensor.len() != expected_len {
            return Err(ValidationError::DataLength {
                expected: expected_len,
                actual: tensor.len(),
            });
        }

        self.validate_shape(tensor.nhwc_shape(), model.input_shape)
    }

    /// Compare two `[batch, height, width, channels]` shapes component-wise
    pub fn validate_shape(
        &self,
        actual: [usize; 4],
        expected: [usize; 4],
    ) -> Result<(), ValidationError> {
        for ((dimension, expected), actual) in DIMENSIONS.into_iter().zip(expected).zip(actual) {
            if expected != actual {
                return Err(ValidationError::ShapeMismatch {
                    dimension,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Soft checks on the sample range
    pub fn check_range(&self, tensor: &PreparedTensor) -> Vec<RangeWarning> {
        let mut warnings = Vec::new();

        let non_finite = tensor.data.iter().filter(|v| !v.is_finite()).count();
        if non_finite > 0 {
            warnings.push(RangeWarning::NonFinite { count: non_finite });
        }

        let (lower, upper) = match tensor.scheme {
            NormalizationScheme::Symmetric => self.config.symmetric_range,
            NormalizationScheme::ChannelStats { .. } => self.config.channel_stats_range,
            NormalizationScheme::Identity => self.config.identity_range,
        };
        if !tensor.is_empty() && (tensor.min < lower || tensor.max > upper) {
            warnings.push(RangeWarning::OutOfRange {
                scheme: tensor.scheme.as_str(),
                min: tensor.min,
                max: tensor.max,
                lower,
                upper,
            });
        }

        warnings
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
