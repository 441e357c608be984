//! Model configuration

use serde::{Deserialize, Serialize};

use crate::normalization::NormalizationScheme;
use crate::RegistryError;

/// Broad family a style belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleCategory {
    /// Classic painting styles (fast neural style models)
    Painterly,
    /// Pencil and ink drawings
    Sketch,
    /// Anime/cel-shading GAN models
    Anime,
}

impl StyleCategory {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleCategory::Painterly => "painterly",
            StyleCategory::Sketch => "sketch",
            StyleCategory::Anime => "anime",
        }
    }

    /// Whether a non-model approximation is acceptable for this category.
    ///
    /// Anime output cannot be faked convincingly, so those styles either
    /// succeed through the model or fail explicitly.
    pub fn allows_fallback(&self) -> bool {
        !matches!(self, StyleCategory::Anime)
    }
}

/// Memory layout of a 4-D image tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// Batch, height, width, channels (interleaved)
    #[default]
    Nhwc,
    /// Batch, channels, height, width (planar)
    Nchw,
}

impl TensorLayout {
    /// Shape of a single-image, three-channel tensor in this layout
    pub fn shape(&self, height: usize, width: usize) -> [usize; 4] {
        match self {
            TensorLayout::Nhwc => [1, height, width, 3],
            TensorLayout::Nchw => [1, 3, height, width],
        }
    }

    /// Reorder a shape in this layout to `[batch, height, width, channels]`
    pub fn to_nhwc(&self, shape: [usize; 4]) -> [usize; 4] {
        match self {
            TensorLayout::Nhwc => shape,
            TensorLayout::Nchw => [shape[0], shape[2], shape[3], shape[1]],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TensorLayout::Nhwc => "NHWC",
            TensorLayout::Nchw => "NCHW",
        }
    }
}

/// Encoded source formats a model page accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Png,
    Jpeg,
    WebP,
    Bmp,
}

impl SourceFormat {
    /// Formats accepted by every built-in style
    pub fn common() -> Vec<SourceFormat> {
        vec![SourceFormat::Png, SourceFormat::Jpeg, SourceFormat::WebP]
    }
}

/// Static metadata for one style model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Style identifier used for lookup
    pub id: String,
    /// Human readable name
    pub display_name: String,
    /// Style family
    pub category: StyleCategory,
    /// Model file name, resolved against the model directory
    pub file: String,
    /// Declared input shape as `[batch, height, width, channels]`
    pub input_shape: [usize; 4],
    /// Layout the model actually consumes
    #[serde(default)]
    pub input_layout: TensorLayout,
    /// Per-channel mean (0-1 scale)
    pub mean: [f32; 3],
    /// Per-channel standard deviation (0-1 scale)
    pub std: [f32; 3],
    /// Largest target edge a caller may request
    pub max_input_edge: u32,
    /// Accepted encoded source formats
    pub accepted_formats: Vec<SourceFormat>,
}

impl ModelConfig {
    /// Nominal input height
    pub fn input_height(&self) -> usize {
        self.input_shape[1]
    }

    /// Nominal input width
    pub fn input_width(&self) -> usize {
        self.input_shape[2]
    }

    /// Shape the model expects in its own layout
    pub fn layout_shape(&self) -> [usize; 4] {
        self.input_layout
            .shape(self.input_height(), self.input_width())
    }

    /// Normalization scheme implied by the declared mean/std
    pub fn normalization(&self) -> NormalizationScheme {
        NormalizationScheme::from_mean_std(self.mean, self.std)
    }

    /// Whether the model accepts the given source format
    pub fn accepts(&self, format: SourceFormat) -> bool {
        self.accepted_formats.contains(&format)
    }

    /// Check structural constraints
    pub fn validate(&self) -> Result<(), RegistryError> {
        let [batch, height, width, channels] = self.input_shape;
        if batch != 1 || channels != 3 || height == 0 || width == 0 {
            return Err(RegistryError::InvalidShape {
                id: self.id.clone(),
                shape: self.input_shape,
            });
        }

        for (channel, &value) in self.std.iter().enumerate() {
            if value.is_nan() || value <= 0.0 {
                return Err(RegistryError::InvalidStd {
                    id: self.id.clone(),
                    channel,
                    value,
                });
            }
        }

        let edge = height.max(width);
        if edge > self.max_input_edge as usize {
            return Err(RegistryError::EdgeTooLarge {
                id: self.id.clone(),
                edge,
                max: self.max_input_edge,
            });
        }

        Ok(())
    }
}
