//! Output tensor to image conversion

use std::io::Cursor;

use image::{ImageFormat, ImageResult, Rgba, RgbaImage};
use model_registry::{ModelConfig, NormalizationScheme, TensorLayout};
use tracing::debug;

use crate::tensor::OutputTensor;
use crate::DecodeError;

/// Spatial interpretation of an output shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Geometry {
    width: usize,
    height: usize,
    channels: usize,
    planar: bool,
}

/// Decoder for style-model outputs
#[derive(Debug, Default)]
pub struct OutputDecoder;

impl OutputDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode the first output of a run
    pub fn decode_first(
        &self,
        outputs: &[OutputTensor],
        model: &ModelConfig,
    ) -> Result<RgbaImage, DecodeError> {
        let output = outputs.first().ok_or(DecodeError::MissingOutput)?;
        self.decode(output, model)
    }

    /// Decode one output tensor into an opaque RGBA image
    pub fn decode(&self, output: &OutputTensor, model: &ModelConfig) -> Result<RgbaImage, DecodeError> {
        let geometry = geometry(&output.shape, model.input_layout)?;

        let expected = output.declared_len();
        if output.data.len() != expected {
            return Err(DecodeError::DataLength {
                expected,
                actual: output.data.len(),
            });
        }

        let symmetric = model.normalization() == NormalizationScheme::Symmetric;
        debug!(
            "Decoding output {} {:?} range {:?} as {}x{}x{} ({})",
            output.name,
            output.shape,
            output.range(),
            geometry.width,
            geometry.height,
            geometry.channels,
            if geometry.planar { "planar" } else { "interleaved" }
        );

        let Geometry {
            width,
            height,
            channels,
            planar,
        } = geometry;
        let data = &output.data;
        let image = RgbaImage::from_fn(width as u32, height as u32, |x, y| {
            let (x, y) = (x as usize, y as usize);
            let mut rgba = [0, 0, 0, u8::MAX];
            for (c, out) in rgba.iter_mut().take(3).enumerate() {
                // Single-channel output is replicated to gray
                let source = c.min(channels - 1);
                let idx = if planar {
                    source * height * width + y * width + x
                } else {
                    (y * width + x) * channels + source
                };
                *out = to_pixel(data[idx], symmetric);
            }
            Rgba(rgba)
        });

        Ok(image)
    }
}

/// Encode an image as PNG bytes
pub fn encode_png(image: &RgbaImage) -> ImageResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Map a raw sample back to 0-255; never wraps
fn to_pixel(value: f32, symmetric: bool) -> u8 {
    if value.is_nan() {
        return 0;
    }
    let scaled = if symmetric {
        (value + 1.0) * 127.5
    } else {
        value * 255.0
    };
    scaled.round().clamp(0.0, 255.0) as u8
}

fn is_channel_dim(n: usize) -> bool {
    matches!(n, 1 | 3 | 4)
}

fn geometry(shape: &[usize], preferred: TensorLayout) -> Result<Geometry, DecodeError> {
    let invalid = || DecodeError::InvalidShape(shape.to_vec());

    let (a, b, c) = match *shape {
        [1, a, b, c] => (a, b, c),
        [a, b, c] => (a, b, c),
        _ => return Err(invalid()),
    };

    let interleaved = is_channel_dim(c);
    let planar_fits = is_channel_dim(a);
    let planar = match (interleaved, planar_fits) {
        (true, true) => preferred == TensorLayout::Nchw,
        (true, false) => false,
        (false, true) => true,
        (false, false) => return Err(invalid()),
    };

    let geometry = if planar {
        Geometry {
            channels: a,
            height: b,
            width: c,
            planar,
        }
    } else {
        Geometry {
            height: a,
            width: b,
            channels: c,
            planar,
        }
    };

    if geometry.width == 0 || geometry.height == 0 {
        return Err(invalid());
    }
    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_registry::ModelRegistry;
    use proptest::prelude::*;

    fn model(id: &str) -> ModelConfig {
        ModelRegistry::builtin().lookup(id).unwrap().clone()
    }

    #[test]
    fn test_symmetric_nhwc() {
        let decoder = OutputDecoder::new();
        // 2x1: pixel 0 = (-1, 0, 1), pixel 1 = (2, -2, 0.5)
        let output = OutputTensor::new(
            "out",
            vec![1, 1, 2, 3],
            vec![-1.0, 0.0, 1.0, 2.0, -2.0, 0.5],
        );
        let image = decoder.decode(&output, &model("starry-night")).unwrap();

        assert_eq!(image.dimensions(), (2, 1));
        assert_eq!(image.get_pixel(0, 0).0, [0, 128, 255, 255]);
        assert_eq!(image.get_pixel(1, 0).0, [255, 0, 191, 255]);
    }

    #[test]
    fn test_channel_stats_nchw() {
        let decoder = OutputDecoder::new();
        // 1x2 planar: R = [0.0, 1.0], G = [0.5, 1.5], B = [-0.5, 0.25]
        let output = OutputTensor::new(
            "out",
            vec![1, 3, 2, 1],
            vec![0.0, 1.0, 0.5, 1.5, -0.5, 0.25],
        );
        let image = decoder.decode(&output, &model("mosaic")).unwrap();

        assert_eq!(image.dimensions(), (1, 2));
        assert_eq!(image.get_pixel(0, 0).0, [0, 128, 0, 255]);
        assert_eq!(image.get_pixel(0, 1).0, [255, 255, 64, 255]);
    }

    #[test]
    fn test_dimensions_come_from_tensor() {
        let decoder = OutputDecoder::new();
        let output = OutputTensor::new("out", vec![1, 40, 60, 3], vec![0.0; 40 * 60 * 3]);
        let image = decoder.decode(&output, &model("starry-night")).unwrap();
        assert_eq!(image.dimensions(), (60, 40));
    }

    #[test]
    fn test_single_channel_replicated() {
        let decoder = OutputDecoder::new();
        let output = OutputTensor::new("out", vec![1, 1, 1, 1], vec![1.0]);
        let image = decoder.decode(&output, &model("pencil-sketch")).unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_model_alpha_ignored() {
        let decoder = OutputDecoder::new();
        let output = OutputTensor::new("out", vec![1, 1, 1, 4], vec![0.0, 0.0, 0.0, -1.0]);
        let image = decoder.decode(&output, &model("starry-night")).unwrap();
        assert_eq!(image.get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn test_rank3_output() {
        let decoder = OutputDecoder::new();
        let output = OutputTensor::new("out", vec![2, 2, 3], vec![0.5; 12]);
        let image = decoder.decode(&output, &model("mosaic")).unwrap();
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(1, 1).0, [128, 128, 128, 255]);
    }

    #[test]
    fn test_missing_output() {
        let decoder = OutputDecoder::new();
        assert_eq!(
            decoder.decode_first(&[], &model("mosaic")).unwrap_err(),
            DecodeError::MissingOutput
        );
    }

    #[test]
    fn test_invalid_shapes() {
        let decoder = OutputDecoder::new();
        for shape in [vec![1000], vec![1, 7, 7, 7], vec![2, 3, 4, 4], vec![1, 0, 5, 3]] {
            let output = OutputTensor::new("out", shape.clone(), vec![0.0; shape.iter().product()]);
            assert!(matches!(
                decoder.decode(&output, &model("mosaic")),
                Err(DecodeError::InvalidShape(_))
            ));
        }
    }

    #[test]
    fn test_length_mismatch() {
        let decoder = OutputDecoder::new();
        let output = OutputTensor::new("out", vec![1, 2, 2, 3], vec![0.0; 5]);
        assert_eq!(
            decoder.decode(&output, &model("mosaic")).unwrap_err(),
            DecodeError::DataLength {
                expected: 12,
                actual: 5
            }
        );
    }

    #[test]
    fn test_encode_png_round_trip_dimensions() {
        let image = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]));
        let bytes = encode_png(&image).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
    }

    proptest! {
        #[test]
        fn prop_out_of_range_samples_saturate(excess in 0.0f32..1e6, symmetric in any::<bool>()) {
            let (low, high) = if symmetric { (-1.0, 1.0) } else { (0.0, 1.0) };
            prop_assert_eq!(to_pixel(high + excess, symmetric), 255);
            prop_assert_eq!(to_pixel(low - excess, symmetric), 0);
        }

        #[test]
        fn prop_mapping_is_monotonic(a in -2.0f32..2.0, b in -2.0f32..2.0, symmetric in any::<bool>()) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(to_pixel(lo, symmetric) <= to_pixel(hi, symmetric));
        }

        #[test]
        fn prop_symmetric_inverts_normalization(value in 0u8..=255) {
            let normalized = NormalizationScheme::Symmetric.normalize_sample(value, 0);
            prop_assert_eq!(to_pixel(normalized, true), value);
        }
    }
}
