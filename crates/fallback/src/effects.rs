//! Per-pixel style approximations

use std::f32::consts::PI;

use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::drawing::draw_line_segment_mut;
use imageproc::filter::gaussian_blur_f32;
use serde::{Deserialize, Serialize};

/// Approximation applied by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackEffect {
    /// Contrast curve, sinusoidal color warp and brush strokes
    Swirl,
    /// Block quantization with grout lines
    Mosaic,
    /// Saturated, posterized, tinted
    Pop,
    /// Pencil-like color dodge
    Sketch,
    /// Input passed through unchanged
    Identity,
}

impl FallbackEffect {
    /// Pick an effect from keywords in a style's display name
    pub fn for_style(display_name: &str) -> Self {
        let name = display_name.to_lowercase();
        let has = |keys: &[&str]| keys.iter().any(|k| name.contains(k));

        if has(&["starry", "gogh", "swirl", "impression"]) {
            FallbackEffect::Swirl
        } else if has(&["mosaic", "cubis", "stained"]) {
            FallbackEffect::Mosaic
        } else if has(&["candy", "pop", "neon"]) {
            FallbackEffect::Pop
        } else if has(&["sketch", "pencil", "charcoal"]) {
            FallbackEffect::Sketch
        } else {
            FallbackEffect::Identity
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackEffect::Swirl => "swirl",
            FallbackEffect::Mosaic => "mosaic",
            FallbackEffect::Pop => "pop",
            FallbackEffect::Sketch => "sketch",
            FallbackEffect::Identity => "identity",
        }
    }

    /// Render the effect over an RGB source
    pub fn apply(&self, source: &RgbImage) -> RgbaImage {
        match self {
            FallbackEffect::Swirl => swirl(source),
            FallbackEffect::Mosaic => mosaic(source),
            FallbackEffect::Pop => pop(source),
            FallbackEffect::Sketch => sketch(source),
            FallbackEffect::Identity => map_pixels(source, |_, _, rgb| rgb),
        }
    }
}

/// Logistic S-curve on 0..1, rescaled so 0 and 1 are fixed points
fn contrast_curve(value: f32, strength: f32) -> f32 {
    let s = |t: f32| 1.0 / (1.0 + (-strength * (t - 0.5)).exp());
    let (lo, hi) = (s(0.0), s(1.0));
    (s(value) - lo) / (hi - lo)
}

fn luma(rgb: [f32; 3]) -> f32 {
    0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2]
}

fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn map_pixels<F>(source: &RgbImage, f: F) -> RgbaImage
where
    F: Fn(u32, u32, [f32; 3]) -> [f32; 3],
{
    RgbaImage::from_fn(source.width(), source.height(), |x, y| {
        let Rgb([r, g, b]) = *source.get_pixel(x, y);
        let [r, g, b] = f(x, y, [r as f32, g as f32, b as f32]);
        Rgba([to_u8(r), to_u8(g), to_u8(b), u8::MAX])
    })
}

fn swirl(source: &RgbImage) -> RgbaImage {
    let mut canvas = map_pixels(source, |x, y, rgb| {
        let (fx, fy) = (x as f32, y as f32);
        let wave = (fx * 0.045 + (fy * 0.02).sin() * 2.0).sin();
        let ripple = (fy * 0.06 + fx * 0.01).cos();
        let [r, g, b] = rgb.map(|c| contrast_curve(c / 255.0, 6.0) * 255.0);
        [
            r * 0.9 + 14.0 * wave,
            g * 0.95 + 8.0 * ripple,
            b * 1.1 + 22.0 * (wave + ripple) * 0.5,
        ]
    });

    let (width, height) = canvas.dimensions();
    let spacing = (width.min(height) / 24).max(4);
    let length = spacing as f32 * 0.9;

    for gy in (spacing / 2..height).step_by(spacing as usize) {
        for gx in (spacing / 2..width).step_by(spacing as usize) {
            let angle = ((gx as f32) * 0.05).sin() * ((gy as f32) * 0.05).cos() * PI;
            let (dx, dy) = (angle.cos() * length * 0.5, angle.sin() * length * 0.5);
            let Rgba([r, g, b, _]) = *canvas.get_pixel(gx, gy);
            let stroke = Rgba([
                r.saturating_add(18),
                g.saturating_add(12),
                b.saturating_add(24),
                u8::MAX,
            ]);
            let (cx, cy) = (gx as f32, gy as f32);
            draw_line_segment_mut(&mut canvas, (cx - dx, cy - dy), (cx + dx, cy + dy), stroke);
        }
    }

    canvas
}

fn mosaic(source: &RgbImage) -> RgbaImage {
    let (width, height) = source.dimensions();
    let block = (width.min(height) / 32).max(4);

    map_pixels(source, |x, y, _| {
        let cx = ((x / block) * block + block / 2).min(width - 1);
        let cy = ((y / block) * block + block / 2).min(height - 1);
        let Rgb(center) = *source.get_pixel(cx, cy);
        let grout = if x % block == 0 || y % block == 0 { 0.7 } else { 1.0 };
        center.map(|c| contrast_curve(c as f32 / 255.0, 5.0) * 255.0 * grout)
    })
}

fn pop(source: &RgbImage) -> RgbaImage {
    const LEVELS: f32 = 6.0;

    map_pixels(source, |x, y, rgb| {
        let l = luma(rgb);
        let tint = (y as f32 * 0.03).sin() * 20.0;
        let shift = (x as f32 * 0.02).cos() * 12.0;
        let [r, g, b] = rgb.map(|c| {
            let saturated = (l + (c - l) * 1.6).clamp(0.0, 255.0);
            (saturated / 255.0 * (LEVELS - 1.0)).round() / (LEVELS - 1.0) * 255.0
        });
        [r + tint, g + shift, b - tint]
    })
}

fn sketch(source: &RgbImage) -> RgbaImage {
    let (width, height) = source.dimensions();
    let gray = GrayImage::from_fn(width, height, |x, y| {
        let Rgb([r, g, b]) = *source.get_pixel(x, y);
        Luma([to_u8(luma([r as f32, g as f32, b as f32]))])
    });
    let inverted = GrayImage::from_fn(width, height, |x, y| {
        Luma([u8::MAX - gray.get_pixel(x, y)[0]])
    });
    let blurred = gaussian_blur_f32(&inverted, 3.0);

    RgbaImage::from_fn(width, height, |x, y| {
        let base = gray.get_pixel(x, y)[0] as f32;
        let blur = blurred.get_pixel(x, y)[0] as f32;
        let dodge = (base * 255.0 / (255.0 - blur).max(1.0)).min(255.0);
        let v = to_u8(contrast_curve(dodge / 255.0, 4.0) * 255.0);
        Rgba([v, v, v, u8::MAX])
    })
}
