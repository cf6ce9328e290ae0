//! Benchmarks for coregionalization kernel evaluation
//!
//! Measures full-matrix vs. diagonal evaluation and the backward pass across
//! batch sizes and output counts.
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use coregion_kernels::{CoregionalizeKernel, Kernel, KernelOutput};
use scirs2_core::ndarray::Array2;

/// Generate deterministic input rows
fn generate_inputs(rows: usize, dim: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, dim), |(i, j)| ((i * dim + j) as f64).sin())
}

/// Benchmark full covariance evaluation
fn bench_full_covariance(c: &mut Criterion) {
    let mut group = c.benchmark_group("coregionalize_full");

    for rows in [10, 50, 100, 500].iter() {
        let x = generate_inputs(*rows, 8);
        let kernel = CoregionalizeKernel::builder(8)
            .rank(2)
            .seed(0)
            .build()
            .unwrap();

        group.throughput(Throughput::Elements((*rows * *rows) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), rows, |b, _| {
            b.iter(|| {
                black_box(kernel.covariance(x.view(), None).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark diagonal evaluation
fn bench_diag_variance(c: &mut Criterion) {
    let mut group = c.benchmark_group("coregionalize_diag");

    for rows in [10, 50, 100, 500].iter() {
        let x = generate_inputs(*rows, 8);
        let kernel = CoregionalizeKernel::builder(8)
            .rank(2)
            .seed(0)
            .build()
            .unwrap();

        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), rows, |b, _| {
            b.iter(|| {
                black_box(kernel.variance(x.view()).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark evaluation as the number of outputs grows
fn bench_output_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("coregionalize_outputs");

    for dim in [2, 8, 32, 128].iter() {
        let x = generate_inputs(100, *dim);
        let kernel = CoregionalizeKernel::new(*dim, Some(1)).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(dim), dim, |b, _| {
            b.iter(|| {
                black_box(kernel.covariance(x.view(), None).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark the backward pass
fn bench_backward(c: &mut Criterion) {
    let mut group = c.benchmark_group("coregionalize_backward");

    for rows in [10, 100, 500].iter() {
        let x = generate_inputs(*rows, 8);
        let kernel = CoregionalizeKernel::builder(8)
            .rank(2)
            .seed(0)
            .build()
            .unwrap();
        let grad = KernelOutput::Full(Array2::ones((*rows, *rows)));

        group.bench_with_input(BenchmarkId::from_parameter(rows), rows, |b, _| {
            b.iter(|| {
                black_box(kernel.backward(x.view(), None, &grad).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_full_covariance,
    bench_diag_variance,
    bench_output_count,
    bench_backward,
);

criterion_main!(benches);
