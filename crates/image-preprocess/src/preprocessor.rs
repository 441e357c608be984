//! Source image to tensor conversion

use image::{imageops, DynamicImage, ImageFormat, Rgb, RgbImage};
use model_registry::{NormalizationScheme, SourceFormat, TensorLayout};
use ndarray::Array4;
use tracing::{debug, warn};

use crate::config::{AspectPolicy, PreprocessingConfig};
use crate::tensor::PreparedTensor;
use crate::PreprocessError;

/// Converts images into tensors according to one [`PreprocessingConfig`]
pub struct Preprocessor {
    config: PreprocessingConfig,
}

impl Preprocessor {
    /// Create a new preprocessor
    pub fn new(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    /// Decode encoded bytes and prepare them.
    ///
    /// An empty `accepted` list allows every format the decoder understands.
    pub fn prepare_bytes(
        &self,
        bytes: &[u8],
        accepted: &[SourceFormat],
    ) -> Result<PreparedTensor, PreprocessError> {
        let image = decode_source(bytes, accepted)?;
        self.prepare(&image)
    }

    /// Prepare a decoded image.
    ///
    /// The returned tensor always has exactly the configured target size.
    pub fn prepare(&self, image: &DynamicImage) -> Result<PreparedTensor, PreprocessError> {
        let config = &self.config;
        let scheme = config.scheme()?;
        let (target_w, target_h) = (config.target_width, config.target_height);

        if target_w == 0 || target_h == 0 {
            return Err(PreprocessError::RenderSurface(format!(
                "target surface {}x{} has no pixels",
                target_w, target_h
            )));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(PreprocessError::RenderSurface(format!(
                "source image {}x{} has no pixels",
                image.width(),
                image.height()
            )));
        }

        let filter = config.interpolation.filter_type();
        let (inter_w, inter_h) = match config.aspect {
            AspectPolicy::Fit => fit_dimensions(image.width(), image.height(), target_w, target_h),
            AspectPolicy::Stretch => (target_w, target_h),
        };

        debug!(
            "Preprocessing {}x{} -> {}x{} (target {}x{}, {:?})",
            image.width(),
            image.height(),
            inter_w,
            inter_h,
            target_w,
            target_h,
            config.interpolation
        );

        // Alpha is dropped before any resampling or padding
        let source = image.to_rgb8();
        let mut surface = if source.dimensions() == (inter_w, inter_h) {
            source
        } else {
            imageops::resize(&source, inter_w, inter_h, filter)
        };

        if config.pad && surface.dimensions() != (target_w, target_h) {
            surface = pad_centered(&surface, target_w, target_h, config.pad_color);
        }

        if surface.dimensions() != (target_w, target_h) {
            warn!(
                "Surface is {}x{} after resize, forcing {}x{}",
                surface.width(),
                surface.height(),
                target_w,
                target_h
            );
            surface = imageops::resize(&surface, target_w, target_h, filter);
        }

        tensor_from_surface(&surface, scheme, config.layout)
    }
}

/// Largest size that fits inside the target box with the source aspect ratio
pub fn fit_dimensions(src_w: u32, src_h: u32, target_w: u32, target_h: u32) -> (u32, u32) {
    let scale = (target_w as f64 / src_w as f64).min(target_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).clamp(1, target_w);
    let h = ((src_h as f64 * scale).round() as u32).clamp(1, target_h);
    (w, h)
}

/// Decode bytes, rejecting formats outside `accepted`
pub fn decode_source(bytes: &[u8], accepted: &[SourceFormat]) -> Result<DynamicImage, PreprocessError> {
    let format = image::guess_format(bytes)
        .map_err(|e| PreprocessError::Decode(e.to_string()))?;

    if !accepted.is_empty() {
        let allowed = source_format(format).is_some_and(|f| accepted.contains(&f));
        if !allowed {
            return Err(PreprocessError::Decode(format!(
                "unsupported source format {:?}",
                format
            )));
        }
    }

    image::load_from_memory_with_format(bytes, format)
        .map_err(|e| PreprocessError::Decode(e.to_string()))
}

fn source_format(format: ImageFormat) -> Option<SourceFormat> {
    match format {
        ImageFormat::Png => Some(SourceFormat::Png),
        ImageFormat::Jpeg => Some(SourceFormat::Jpeg),
        ImageFormat::WebP => Some(SourceFormat::WebP),
        ImageFormat::Bmp => Some(SourceFormat::Bmp),
        _ => None,
    }
}

/// Center `image` on a `width` x `height` canvas filled with `color`.
/// Odd margins put the extra pixel after the image.
fn pad_centered(image: &RgbImage, width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(width, height, Rgb(color));
    let x = (width.saturating_sub(image.width()) / 2) as i64;
    let y = (height.saturating_sub(image.height()) / 2) as i64;
    imageops::overlay(&mut canvas, image, x, y);
    canvas
}

fn tensor_from_surface(
    surface: &RgbImage,
    scheme: NormalizationScheme,
    layout: TensorLayout,
) -> Result<PreparedTensor, PreprocessError> {
    let (width, height) = surface.dimensions();

    let mut interleaved = Vec::with_capacity(width as usize * height as usize * 3);
    for pixel in surface.pixels() {
        for channel in 0..3 {
            interleaved.push(scheme.normalize_sample(pixel[channel], channel));
        }
    }

    let data = match layout {
        TensorLayout::Nhwc => interleaved,
        TensorLayout::Nchw => {
            let array = Array4::from_shape_vec((1, height as usize, width as usize, 3), interleaved)
                .map_err(|e| PreprocessError::RenderSurface(e.to_string()))?;
            array.permuted_axes([0, 3, 1, 2]).iter().copied().collect()
        }
    };

    Ok(PreparedTensor::new(data, width, height, layout, scheme))
}
