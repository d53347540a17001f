#[path = "../util/mod.rs"]
mod util;

use criterion::{
    Bencher, BenchmarkId, Criterion, SamplingMode, criterion_group, criterion_main,
    measurement::WallTime,
};
use palette::Srgb;
use patolette::{ColorSpace, Heuristic, ImageBuf, Quantizer};
use std::time::Duration;
use util::benchmark_images;

fn bench(
    c: &mut Criterion,
    group: &str,
    mut f: impl FnMut(&mut Bencher<'_, WallTime>, &ImageBuf<Srgb<u8>>),
) {
    let mut group = c.benchmark_group(group);
    group
        .sample_size(30)
        .noise_threshold(0.05)
        .sampling_mode(SamplingMode::Flat)
        .warm_up_time(Duration::from_secs(2));

    for (label, image) in benchmark_images() {
        group.bench_with_input(BenchmarkId::from_parameter(label), &image, &mut f);
    }
}

fn quantizer(heuristic: Heuristic) -> Quantizer {
    Quantizer::new()
        .color_space(ColorSpace::CieLuv)
        .heuristic(heuristic)
}

fn pipeline_wu_single(c: &mut Criterion) {
    bench(c, "pipeline_wu_single", |b, image| {
        b.iter(|| quantizer(Heuristic::Wu).quantize_srgb8(image.as_ref()).unwrap())
    })
}

fn pipeline_patolette_single(c: &mut Criterion) {
    bench(c, "pipeline_patolette_single", |b, image| {
        b.iter(|| {
            quantizer(Heuristic::Patolette)
                .quantize_srgb8(image.as_ref())
                .unwrap()
        })
    })
}

fn pipeline_wu_par(c: &mut Criterion) {
    bench(c, "pipeline_wu_par", |b, image| {
        b.iter(|| {
            quantizer(Heuristic::Wu)
                .parallel(true)
                .quantize_srgb8(image.as_ref())
                .unwrap()
        })
    })
}

fn pipeline_patolette_par(c: &mut Criterion) {
    bench(c, "pipeline_patolette_par", |b, image| {
        b.iter(|| {
            quantizer(Heuristic::Patolette)
                .parallel(true)
                .quantize_srgb8(image.as_ref())
                .unwrap()
        })
    })
}

criterion_group!(
    benches,
    pipeline_wu_single,
    pipeline_patolette_single,
    pipeline_wu_par,
    pipeline_patolette_par,
);
criterion_main!(benches);
