#[path = "../util/mod.rs"]
mod util;

use criterion::{
    Bencher, BenchmarkId, Criterion, SamplingMode, criterion_group, criterion_main,
    measurement::WallTime,
};
use palette::Srgb;
use patolette::{
    ColorSpace, ImageBuf,
    color::{srgb_to_working, srgb_to_working_par, working_to_srgb, working_to_srgb_par},
};
use std::time::Duration;
use util::benchmark_images;

fn bench(
    c: &mut Criterion,
    group: &str,
    mut f: impl FnMut(&mut Bencher<'_, WallTime>, &ImageBuf<Srgb<f64>>),
) {
    let mut group = c.benchmark_group(group);
    group
        .sample_size(30)
        .noise_threshold(0.05)
        .sampling_mode(SamplingMode::Flat)
        .warm_up_time(Duration::from_secs(2));

    for (label, image) in benchmark_images() {
        let image = ImageBuf::from_srgb8(image.as_ref());
        group.bench_with_input(BenchmarkId::from_parameter(label), &image, &mut f);
    }
}

fn colorspace_to_cieluv_single(c: &mut Criterion) {
    bench(c, "colorspace_to_cieluv_single", |b, image| {
        b.iter(|| srgb_to_working(ColorSpace::CieLuv, image.as_slice()))
    })
}

fn colorspace_to_ictcp_single(c: &mut Criterion) {
    bench(c, "colorspace_to_ictcp_single", |b, image| {
        b.iter(|| srgb_to_working(ColorSpace::ICtCp, image.as_slice()))
    })
}

fn colorspace_to_cieluv_par(c: &mut Criterion) {
    bench(c, "colorspace_to_cieluv_par", |b, image| {
        b.iter(|| srgb_to_working_par(ColorSpace::CieLuv, image.as_slice()))
    })
}

fn colorspace_from_cieluv_single(c: &mut Criterion) {
    bench(c, "colorspace_from_cieluv_single", |b, image| {
        let working = srgb_to_working_par(ColorSpace::CieLuv, image.as_slice());
        b.iter(|| working_to_srgb(ColorSpace::CieLuv, &working))
    })
}

fn colorspace_from_cieluv_par(c: &mut Criterion) {
    bench(c, "colorspace_from_cieluv_par", |b, image| {
        let working = srgb_to_working_par(ColorSpace::CieLuv, image.as_slice());
        b.iter(|| working_to_srgb_par(ColorSpace::CieLuv, &working))
    })
}

criterion_group!(
    benches,
    colorspace_to_cieluv_single,
    colorspace_to_ictcp_single,
    colorspace_to_cieluv_par,
    colorspace_from_cieluv_single,
    colorspace_from_cieluv_par,
);
criterion_main!(benches);
