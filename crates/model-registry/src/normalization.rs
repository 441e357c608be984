//! Pixel normalization schemes

use serde::{Deserialize, Serialize};

/// Mean and std shared by every channel of a symmetric (-1..1) model
pub const SYMMETRIC_MEAN_STD: f32 = 0.5;

/// ImageNet channel means
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

const MATCH_TOLERANCE: f32 = 1e-6;

/// Formula mapping 0-255 samples into a model's numeric range.
///
/// The variant is recorded on every prepared tensor so the mapping can be
/// inverted exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum NormalizationScheme {
    /// 0..255 mapped linearly to -1..1 (mean = std = 0.5)
    Symmetric,
    /// 0..255 mapped to 0..1 then standardized per channel
    ChannelStats { mean: [f32; 3], std: [f32; 3] },
    /// 0..255 mapped linearly to 0..1
    Identity,
}

impl NormalizationScheme {
    /// Classify an explicit mean/std pair
    pub fn from_mean_std(mean: [f32; 3], std: [f32; 3]) -> Self {
        let symmetric = mean
            .iter()
            .chain(std.iter())
            .all(|v| (v - SYMMETRIC_MEAN_STD).abs() < MATCH_TOLERANCE);

        if symmetric {
            NormalizationScheme::Symmetric
        } else {
            NormalizationScheme::ChannelStats { mean, std }
        }
    }

    /// ImageNet statistics
    pub fn imagenet() -> Self {
        NormalizationScheme::ChannelStats {
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }

    /// Normalize one 0-255 sample of the given channel
    pub fn normalize_sample(&self, value: u8, channel: usize) -> f32 {
        let v = value as f32;
        match self {
            NormalizationScheme::Symmetric => v / 127.5 - 1.0,
            NormalizationScheme::ChannelStats { mean, std } => {
                (v / 255.0 - mean[channel]) / std[channel]
            }
            NormalizationScheme::Identity => v / 255.0,
        }
    }

    /// Exact inverse of [`normalize_sample`](Self::normalize_sample), on the
    /// 0-255 scale and unclamped
    pub fn denormalize_sample(&self, value: f32, channel: usize) -> f32 {
        match self {
            NormalizationScheme::Symmetric => (value + 1.0) * 127.5,
            NormalizationScheme::ChannelStats { mean, std } => {
                (value * std[channel] + mean[channel]) * 255.0
            }
            NormalizationScheme::Identity => value * 255.0,
        }
    }

    /// Inverse mapping rounded and clamped to a displayable sample
    pub fn denormalize_to_u8(&self, value: f32, channel: usize) -> u8 {
        let v = self.denormalize_sample(value, channel);
        if v.is_nan() {
            return 0;
        }
        v.round().clamp(0.0, 255.0) as u8
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizationScheme::Symmetric => "symmetric",
            NormalizationScheme::ChannelStats { .. } => "channel_stats",
            NormalizationScheme::Identity => "identity",
        }
    }
}
