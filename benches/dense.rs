//! Benchmarks for dense dot products and norms.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lanedot::{dot, dot_compensated, dot_sequential, squared_l2_norm, Kernel, LaneWidth};
use rand::prelude::*;

fn random_vec(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn bench_dot(c: &mut Criterion) {
    let mut group = c.benchmark_group("dot");

    for dim in [16, 64, 128, 256, 1024, 4096, 65536] {
        let a = random_vec(dim, 42);
        let b = random_vec(dim, 43);

        group.throughput(Throughput::Elements(dim as u64));
        group.bench_with_input(BenchmarkId::new("plain", dim), &dim, |bench, _| {
            bench.iter(|| dot(black_box(&a), black_box(&b)))
        });
        group.bench_with_input(BenchmarkId::new("compensated", dim), &dim, |bench, _| {
            bench.iter(|| dot_compensated(black_box(&a), black_box(&b)))
        });
        group.bench_with_input(BenchmarkId::new("sequential", dim), &dim, |bench, _| {
            bench.iter(|| dot_sequential(black_box(&a), black_box(&b)))
        });
    }

    group.finish();
}

fn bench_lane_widths(c: &mut Criterion) {
    let mut group = c.benchmark_group("dot_lanes");
    let dim = 4096;
    let a = random_vec(dim, 7);
    let b = random_vec(dim, 8);

    for n in 1..=lanedot::MAX_LANES {
        let k = Kernel::with_lanes(LaneWidth::new(n).unwrap());
        group.throughput(Throughput::Elements(dim as u64));
        group.bench_with_input(BenchmarkId::new(k.backend().to_string(), n), &n, |bench, _| {
            bench.iter(|| k.dot(black_box(&a), black_box(&b)))
        });
    }

    group.finish();
}

fn bench_norm(c: &mut Criterion) {
    let mut group = c.benchmark_group("squared_l2_norm");

    for dim in [128, 1024, 4096, 65536] {
        let v = random_vec(dim, 42);

        group.throughput(Throughput::Elements(dim as u64));
        group.bench_with_input(BenchmarkId::new("norm", dim), &dim, |bench, _| {
            bench.iter(|| squared_l2_norm(black_box(&v)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dot, bench_lane_widths, bench_norm);
criterion_main!(benches);
