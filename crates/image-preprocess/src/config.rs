//! Preprocessing configuration

use image::imageops::FilterType;
use model_registry::{ModelConfig, NormalizationScheme, TensorLayout};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::PreprocessError;

/// How the source aspect ratio is treated when resizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectPolicy {
    /// Resize straight to the target box, discarding aspect ratio
    Stretch,
    /// Scale to fit inside the target box, preserving aspect ratio
    #[default]
    Fit,
}

/// Resampling quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
}

impl Interpolation {
    /// Matching `image` resize filter
    pub fn filter_type(&self) -> FilterType {
        match self {
            Interpolation::Nearest => FilterType::Nearest,
            Interpolation::Bilinear => FilterType::Triangle,
            Interpolation::Bicubic => FilterType::CatmullRom,
        }
    }
}

/// Caller overrides; anything left unset comes from the model config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub aspect: Option<AspectPolicy>,
    pub pad: Option<bool>,
    pub pad_color: Option<[u8; 3]>,
    pub interpolation: Option<Interpolation>,
    pub normalize: Option<bool>,
    /// Explicit `(mean, std)` pair replacing the model's statistics
    pub mean_std: Option<([f32; 3], [f32; 3])>,
    pub layout: Option<TensorLayout>,
}

/// Fully resolved preprocessing parameters for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Output tensor width
    pub target_width: u32,
    /// Output tensor height
    pub target_height: u32,
    /// Aspect ratio policy
    pub aspect: AspectPolicy,
    /// Composite onto a target-size canvas after a fit resize
    pub pad: bool,
    /// RGB fill for the padded margins
    pub pad_color: [u8; 3],
    /// Resampling quality
    pub interpolation: Interpolation,
    /// Apply normalization (identity 0..1 mapping when false)
    pub normalize: bool,
    /// Statistics used when normalizing; `None` means symmetric
    pub mean_std: Option<([f32; 3], [f32; 3])>,
    /// Output tensor layout
    pub layout: TensorLayout,
}

impl PreprocessingConfig {
    /// Config for a bare target size with default policies
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
            aspect: AspectPolicy::Fit,
            pad: true,
            pad_color: [0, 0, 0],
            interpolation: Interpolation::Bilinear,
            normalize: true,
            mean_std: None,
            layout: TensorLayout::Nhwc,
        }
    }

    /// Derive a config from a model's metadata plus caller overrides
    pub fn for_model(model: &ModelConfig, options: &PreprocessingOptions) -> Self {
        let max_edge = model.max_input_edge;
        let clamp_edge = |requested: Option<u32>, nominal: usize, axis: &str| {
            let edge = requested.unwrap_or(nominal as u32);
            if edge > max_edge {
                warn!(
                    "Requested {} {} for style {} exceeds max edge {}, clamping",
                    axis, edge, model.id, max_edge
                );
                max_edge
            } else {
                edge
            }
        };

        Self {
            target_width: clamp_edge(options.width, model.input_width(), "width"),
            target_height: clamp_edge(options.height, model.input_height(), "height"),
            aspect: options.aspect.unwrap_or_default(),
            pad: options.pad.unwrap_or(true),
            pad_color: options.pad_color.unwrap_or([0, 0, 0]),
            interpolation: options.interpolation.unwrap_or_default(),
            normalize: options.normalize.unwrap_or(true),
            mean_std: options.mean_std.or(Some((model.mean, model.std))),
            layout: options.layout.unwrap_or(model.input_layout),
        }
    }

    pub fn with_aspect(mut self, aspect: AspectPolicy) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn with_padding(mut self, pad: bool, color: [u8; 3]) -> Self {
        self.pad = pad;
        self.pad_color = color;
        self
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_normalization(mut self, normalize: bool, mean_std: Option<([f32; 3], [f32; 3])>) -> Self {
        self.normalize = normalize;
        self.mean_std = mean_std;
        self
    }

    pub fn with_layout(mut self, layout: TensorLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Normalization scheme this config applies
    pub fn scheme(&self) -> Result<NormalizationScheme, PreprocessError> {
        if !self.normalize {
            return Ok(NormalizationScheme::Identity);
        }

        match self.mean_std {
            None => Ok(NormalizationScheme::Symmetric),
            Some((mean, std)) => {
                if let Some(channel) = std.iter().position(|s| s.is_nan() || *s <= 0.0) {
                    return Err(PreprocessError::InvalidConfig(format!(
                        "std for channel {} must be positive, got {}",
                        channel, std[channel]
                    )));
                }
                Ok(NormalizationScheme::from_mean_std(mean, std))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_registry::ModelRegistry;

    #[test]
    fn test_for_model_defaults() {
        let registry = ModelRegistry::builtin();
        let model = registry.lookup("mosaic").unwrap();
        let config = PreprocessingConfig::for_model(model, &PreprocessingOptions::default());

        assert_eq!(config.target_width, 224);
        assert_eq!(config.target_height, 224);
        assert_eq!(config.aspect, AspectPolicy::Fit);
        assert!(config.pad);
        assert_eq!(config.layout, TensorLayout::Nchw);
        assert_eq!(config.scheme().unwrap(), NormalizationScheme::imagenet());
    }

    #[test]
    fn test_overrides_win() {
        let registry = ModelRegistry::builtin();
        let model = registry.lookup("starry-night").unwrap();
        let options = PreprocessingOptions {
            width: Some(300),
            aspect: Some(AspectPolicy::Stretch),
            normalize: Some(false),
            layout: Some(TensorLayout::Nchw),
            ..Default::default()
        };
        let config = PreprocessingConfig::for_model(model, &options);

        assert_eq!(config.target_width, 300);
        assert_eq!(config.target_height, 256);
        assert_eq!(config.aspect, AspectPolicy::Stretch);
        assert_eq!(config.layout, TensorLayout::Nchw);
        assert_eq!(config.scheme().unwrap(), NormalizationScheme::Identity);
    }

    #[test]
    fn test_edges_clamped_to_max() {
        let registry = ModelRegistry::builtin();
        let model = registry.lookup("anime").unwrap();
        let options = PreprocessingOptions {
            width: Some(4096),
            height: Some(2048),
            ..Default::default()
        };
        let config = PreprocessingConfig::for_model(model, &options);
        assert_eq!(config.target_width, model.max_input_edge);
        assert_eq!(config.target_height, model.max_input_edge);
    }

    #[test]
    fn test_zero_std_rejected() {
        let config = PreprocessingConfig::new(8, 8)
            .with_normalization(true, Some(([0.5; 3], [0.5, 0.0, 0.5])));
        assert!(matches!(config.scheme(), Err(PreprocessError::InvalidConfig(_))));
    }

    #[test]
    fn test_options_deserialize_partial() {
        let options: PreprocessingOptions =
            serde_json::from_str(r#"{"width": 128, "interpolation": "bicubic"}"#).unwrap();
        assert_eq!(options.width, Some(128));
        assert_eq!(options.interpolation, Some(Interpolation::Bicubic));
        assert_eq!(options.height, None);
    }
}
