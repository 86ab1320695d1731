//! Benchmarks for the change pipeline stages

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use verdant_algorithms::imagery::{classify_change, ChangeClass, ChangeThresholds};
use verdant_algorithms::resample::resample_bilinear;
use verdant_algorithms::vector::polygonize;
use verdant_core::{GeoTransform, Raster};

fn create_ndvi(size: usize, shift: usize) -> Raster<f32> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(-79.5, 43.8, 0.0001, -0.0001));
    for row in 0..size {
        for col in 0..size {
            let v = (((row * 7 + col * 13 + shift) % 200) as f32 / 100.0) - 1.0;
            r.set(row, col, v * 0.8).unwrap();
        }
    }
    r
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("change/classify");
    for size in [256, 512, 1024, 2048] {
        let reference = create_ndvi(size, 0);
        let comparison = create_ndvi(size, 37);
        let thresholds = ChangeThresholds::default();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| classify_change(black_box(&reference), black_box(&comparison), &thresholds).unwrap())
        });
    }
    group.finish();
}

fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("change/resample_bilinear");
    for size in [256, 512, 1024] {
        let src = create_ndvi(size, 0);
        let mut dst = *src.transform();
        dst.origin_x += dst.pixel_width * 0.5;
        dst.origin_y += dst.pixel_height * 0.5;
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| resample_bilinear(black_box(&src), (size - 1, size - 1), &dst, None).unwrap())
        });
    }
    group.finish();
}

fn bench_polygonize(c: &mut Criterion) {
    let mut group = c.benchmark_group("change/polygonize");
    group.sample_size(20);
    let targets = ChangeClass::DECREASE.map(ChangeClass::code);
    for size in [128, 256, 512] {
        let grids = classify_change(
            &create_ndvi(size, 0),
            &create_ndvi(size, 37),
            &ChangeThresholds::default(),
        )
        .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| polygonize(black_box(&grids.classes), &targets).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_classify, bench_resample, bench_polygonize);
criterion_main!(benches);
