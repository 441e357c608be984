use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, Rgb, RgbImage};
use image_preprocess::{AspectPolicy, Interpolation, PreprocessingConfig, Preprocessor};
use model_registry::TensorLayout;

fn photo() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(1280, 960, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

fn bench_prepare(c: &mut Criterion) {
    let image = photo();

    for (name, interpolation) in [
        ("nearest", Interpolation::Nearest),
        ("bilinear", Interpolation::Bilinear),
        ("bicubic", Interpolation::Bicubic),
    ] {
        let preprocessor = Preprocessor::new(
            PreprocessingConfig::new(512, 512)
                .with_aspect(AspectPolicy::Fit)
                .with_interpolation(interpolation),
        );
        c.bench_function(&format!("prepare_fit_512_{}", name), |b| {
            b.iter(|| preprocessor.prepare(black_box(&image)))
        });
    }

    let planar = Preprocessor::new(
        PreprocessingConfig::new(224, 224)
            .with_aspect(AspectPolicy::Stretch)
            .with_layout(TensorLayout::Nchw),
    );
    c.bench_function("prepare_stretch_224_nchw", |b| {
        b.iter(|| planar.prepare(black_box(&image)))
    });
}

criterion_group!(benches, bench_prepare);
criterion_main!(benches);
