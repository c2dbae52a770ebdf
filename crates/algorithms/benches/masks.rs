//! Benchmarks for mask generation and metrics

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geo_types::polygon;
use roofarea_algorithms::mask::{gradient_mask, rasterize_polygons};
use roofarea_algorithms::metrics::compute_metrics;
use roofarea_core::{GeoTransform, GridSpec, Mask, Raster};

fn create_band(size: usize, base: f64) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
    for row in 0..size {
        for col in 0..size {
            let v = base + ((row * 7 + col * 13) % 200) as f64;
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn bench_gradient_mask(c: &mut Criterion) {
    let mut group = c.benchmark_group("mask/gradient");
    for size in [256, 512, 1024] {
        let bands = vec![
            create_band(size, 10.0),
            create_band(size, 40.0),
            create_band(size, 80.0),
        ];
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| gradient_mask(black_box(&bands), 0.5).unwrap())
        });
    }
    group.finish();
}

fn bench_rasterize(c: &mut Criterion) {
    let mut group = c.benchmark_group("mask/rasterize");
    for size in [256, 512, 1024] {
        let s = size as f64;
        let grid = GridSpec::new(size, size, GeoTransform::from_origin(0.0, s, 1.0, 1.0), None);
        let polygons: Vec<_> = (0..16)
            .map(|i| {
                let x = (i % 4) as f64 * s / 4.0 + 2.0;
                let y = (i / 4) as f64 * s / 4.0 + 2.0;
                let w = s / 5.0;
                polygon![(x: x, y: y), (x: x + w, y: y), (x: x + w, y: y + w), (x: x, y: y + w)]
            })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| rasterize_polygons(black_box(&polygons), black_box(&grid)).unwrap())
        });
    }
    group.finish();
}

fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics/compute");
    for size in [512, 2048] {
        let pred = Mask::from_raster(&create_band(size, 0.0));
        let gt = Mask::from_raster(&create_band(size, 1.0));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| compute_metrics(black_box(&pred), black_box(&gt), 0.25).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_gradient_mask, bench_rasterize, bench_metrics);
criterion_main!(benches);
