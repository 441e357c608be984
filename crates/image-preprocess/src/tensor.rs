//! Prepared input tensor

use image::{Rgb, RgbImage};
use model_registry::{NormalizationScheme, TensorLayout};
use serde::{Deserialize, Serialize};

/// Normalized three-channel image tensor with batch size one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedTensor {
    /// Flat sample buffer in `layout` order
    pub data: Vec<f32>,
    /// Spatial width
    pub width: u32,
    /// Spatial height
    pub height: u32,
    /// Channel count (always 3 for tensors built by the preprocessor)
    pub channels: usize,
    /// Four-dimensional shape in `layout` order
    pub shape: [usize; 4],
    /// Memory layout
    pub layout: TensorLayout,
    /// Scheme applied to produce the samples
    pub scheme: NormalizationScheme,
    /// Smallest observed sample
    pub min: f32,
    /// Largest observed sample
    pub max: f32,
}

impl PreparedTensor {
    /// Wrap a buffer, deriving shape and observed range
    pub fn new(
        data: Vec<f32>,
        width: u32,
        height: u32,
        layout: TensorLayout,
        scheme: NormalizationScheme,
    ) -> Self {
        let (min, max) = data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let (min, max) = if data.is_empty() { (0.0, 0.0) } else { (min, max) };

        Self {
            data,
            width,
            height,
            channels: 3,
            shape: layout.shape(height as usize, width as usize),
            layout,
            scheme,
            min,
            max,
        }
    }

    /// Number of samples in the buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of samples the shape declares
    pub fn declared_len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Shape as `[batch, height, width, channels]` regardless of layout
    pub fn nhwc_shape(&self) -> [usize; 4] {
        self.layout.to_nhwc(self.shape)
    }

    /// Sample at pixel `(x, y)` for `channel`
    pub fn sample(&self, x: u32, y: u32, channel: usize) -> Option<f32> {
        if x >= self.width || y >= self.height || channel >= self.channels {
            return None;
        }
        let (w, h) = (self.width as usize, self.height as usize);
        let (x, y) = (x as usize, y as usize);
        let idx = match self.layout {
            TensorLayout::Nhwc => (y * w + x) * self.channels + channel,
            TensorLayout::Nchw => channel * h * w + y * w + x,
        };
        self.data.get(idx).copied()
    }

    /// Rebuild 8-bit RGB pixels by inverting the recorded scheme.
    ///
    /// Samples missing from a short buffer come back black.
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let mut rgb = [0u8; 3];
            for (c, out) in rgb.iter_mut().enumerate() {
                if let Some(v) = self.sample(x, y, c) {
                    *out = self.scheme.denormalize_to_u8(v, c);
                }
            }
            Rgb(rgb)
        })
    }
}
