//! Fallback simulator

use image::{Rgba, RgbaImage};
use image_preprocess::PreparedTensor;
use model_registry::StyleCategory;
use tracing::{debug, info};

use crate::effects::FallbackEffect;

/// Renders model-free approximations of a style
#[derive(Debug, Default)]
pub struct FallbackSimulator;

impl FallbackSimulator {
    pub fn new() -> Self {
        Self
    }

    /// Whether a style category may be served by this simulator
    pub fn supports(&self, category: StyleCategory) -> bool {
        category.allows_fallback()
    }

    /// Render a stand-in for `display_name` from the preprocessed tensor.
    ///
    /// Never fails: a tensor without pixels yields a 1x1 black image.
    pub fn render(&self, tensor: &PreparedTensor, display_name: &str) -> RgbaImage {
        if tensor.width == 0 || tensor.height == 0 {
            debug!("Fallback given an empty tensor, returning 1x1 placeholder");
            return RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, u8::MAX]));
        }

        let effect = FallbackEffect::for_style(display_name);
        info!(
            "Rendering fallback for {} with {} effect ({}x{})",
            display_name,
            effect.as_str(),
            tensor.width,
            tensor.height
        );

        effect.apply(&tensor.to_rgb_image())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_registry::{NormalizationScheme, TensorLayout};

    fn tensor(width: u32, height: u32, layout: TensorLayout, scheme: NormalizationScheme) -> PreparedTensor {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                for c in 0..3u32 {
                    let value = ((x * 13 + y * 7 + c * 50) % 256) as u8;
                    data.push(scheme.normalize_sample(value, c as usize));
                }
            }
        }
        let nhwc = PreparedTensor::new(data, width, height, TensorLayout::Nhwc, scheme);
        if layout == TensorLayout::Nhwc {
            return nhwc;
        }
        let mut planar = Vec::with_capacity(nhwc.len());
        for c in 0..3 {
            for y in 0..height {
                for x in 0..width {
                    planar.push(nhwc.sample(x, y, c).unwrap());
                }
            }
        }
        PreparedTensor::new(planar, width, height, layout, scheme)
    }

    #[test]
    fn test_identity_recovers_source_pixels() {
        let simulator = FallbackSimulator::new();
        for scheme in [
            NormalizationScheme::Symmetric,
            NormalizationScheme::imagenet(),
            NormalizationScheme::Identity,
        ] {
            let input = tensor(6, 4, TensorLayout::Nhwc, scheme);
            let out = simulator.render(&input, "Plain");
            assert_eq!(out.dimensions(), (6, 4));
            let expected = [((3 * 13 + 2 * 7) % 256) as u8, ((3 * 13 + 2 * 7 + 50) % 256) as u8];
            assert_eq!(&out.get_pixel(3, 2).0[..2], &expected, "{:?}", scheme);
        }
    }

    #[test]
    fn test_layout_does_not_change_output() {
        let simulator = FallbackSimulator::new();
        let scheme = NormalizationScheme::Symmetric;
        let a = simulator.render(&tensor(12, 9, TensorLayout::Nhwc, scheme), "Starry Night");
        let b = simulator.render(&tensor(12, 9, TensorLayout::Nchw, scheme), "Starry Night");
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_tensor_yields_placeholder() {
        let simulator = FallbackSimulator::new();
        let empty = PreparedTensor::new(
            Vec::new(),
            0,
            0,
            TensorLayout::Nhwc,
            NormalizationScheme::Identity,
        );
        let out = simulator.render(&empty, "Mosaic");
        assert_eq!(out.dimensions(), (1, 1));
    }

    #[test]
    fn test_category_support() {
        let simulator = FallbackSimulator::new();
        assert!(simulator.supports(StyleCategory::Painterly));
        assert!(simulator.supports(StyleCategory::Sketch));
        assert!(!simulator.supports(StyleCategory::Anime));
    }
}
