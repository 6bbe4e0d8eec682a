//! Benchmarks for property sampling.
//!
//! Run with: cargo bench --bench at_benchmark

use chrono::{Duration, NaiveDate, NaiveDateTime};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gridprop::{GridRef, GriddedProperty, RectilinearGrid, TimeAxis, VectorGriddedProperty};
use ndarray::{Array2, Array3};
use std::sync::Arc;

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2016, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// A `size`×`size` one-degree grid with `steps` hourly time steps
fn property(grid: GridRef, size: usize, steps: usize, memoize: bool) -> GriddedProperty {
    let data = Array3::from_shape_fn((steps, size, size), |(t, j, i)| {
        (i as f64 * 0.1).sin() + (j as f64 * 0.1).cos() + t as f64
    });
    let time = TimeAxis::new((0..steps).map(|i| t0() + Duration::hours(i as i64)).collect()).unwrap();
    GriddedProperty::builder()
        .units("m/s")
        .grid(grid)
        .data(data.into_dyn())
        .time(time)
        .memoize(memoize)
        .build()
        .unwrap()
}

fn grid(size: usize) -> GridRef {
    let coords: Vec<f64> = (0..size).map(|i| i as f64).collect();
    Arc::new(RectilinearGrid::new(coords.clone(), coords).unwrap())
}

/// Points spread over the interior of the grid
fn points(n: usize, size: usize) -> Array2<f64> {
    let span = (size - 1) as f64;
    Array2::from_shape_fn((n, 2), |(i, c)| {
        let f = (i as f64 * 0.618_034 + c as f64 * 0.414_214).fract();
        f * span
    })
}

fn bench_scalar_at(c: &mut Criterion) {
    let mut group = c.benchmark_group("scalar_at");
    let size = 200;
    let grid = grid(size);
    let time = t0() + Duration::minutes(30);

    for n in [100usize, 10_000] {
        let pts = points(n, size);
        group.throughput(Throughput::Elements(n as u64));

        let uncached = property(grid.clone(), size, 4, false);
        group.bench_with_input(BenchmarkId::new("uncached", n), &pts, |b, pts| {
            b.iter(|| black_box(uncached.at(&pts.view(), time, None, false).unwrap()));
        });

        let cached = property(grid.clone(), size, 4, true);
        group.bench_with_input(BenchmarkId::new("cached", n), &pts, |b, pts| {
            b.iter(|| black_box(cached.at(&pts.view(), time, Some("knots"), false).unwrap()));
        });
    }

    group.finish();
}

fn bench_vector_at(c: &mut Criterion) {
    let mut group = c.benchmark_group("vector_at");
    let size = 200;
    let grid = grid(size);
    let pts = points(10_000, size);

    let current = VectorGriddedProperty::builder()
        .name("current")
        .component(property(grid.clone(), size, 4, true))
        .component(property(grid.clone(), size, 4, true))
        .build()
        .unwrap();

    // A new time on every iteration defeats the result caches
    let mut minute = 0i64;
    group.bench_function("moving_time_10000", |b| {
        b.iter(|| {
            minute = (minute + 1) % 180;
            black_box(
                current
                    .at(&pts.view(), t0() + Duration::minutes(minute), None, false)
                    .unwrap(),
            )
        });
    });

    group.finish();
}

criterion_group!(benches, bench_scalar_at, bench_vector_at);
criterion_main!(benches);
