//! Benchmarks for kernel matricization and feature-map layout conversion.
//!
//! Run with:
//! ```bash
//! cargo bench --bench layout_ops
//! ```

use cpconv_core::{DataLayout, DenseND, FeatureMap};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

/// Unfold every mode of typical HWIO kernels
fn bench_kernel_unfold(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel_unfold");

    let kernels = vec![
        ("3x3x4x8", vec![3, 3, 4, 8]),
        ("3x3x64x64", vec![3, 3, 64, 64]),
        ("5x5x32x128", vec![5, 5, 32, 128]),
        ("3x3x256x256", vec![3, 3, 256, 256]),
    ];

    for (name, shape) in kernels {
        let tensor = DenseND::<f32>::random_uniform_seeded(&shape, -1.0, 1.0, 42);
        group.throughput(Throughput::Elements(tensor.len() as u64));

        for mode in 0..shape.len() {
            group.bench_with_input(
                BenchmarkId::new(name, format!("mode_{}", mode)),
                &mode,
                |b, &mode| {
                    b.iter(|| {
                        let unfolded = tensor.unfold(black_box(mode)).unwrap();
                        black_box(unfolded);
                    });
                },
            );
        }
    }

    group.finish();
}

/// NHWC <-> NCHW materialization versus the zero-copy view
fn bench_layout_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_conversion");

    let inputs = vec![
        ("1x4x16x16", [1, 4, 16, 16]),
        ("8x64x56x56", [8, 64, 56, 56]),
        ("32x3x224x224", [32, 3, 224, 224]),
    ];

    for (name, dims) in inputs {
        let map = FeatureMap::<f32>::random_uniform_seeded(DataLayout::Nhwc, dims, -1.0, 1.0, 7);
        group.throughput(Throughput::Elements(dims.iter().product::<usize>() as u64));

        group.bench_with_input(BenchmarkId::new("to_nchw", name), &map, |b, map| {
            b.iter(|| black_box(map.to_layout(DataLayout::Nchw)));
        });

        group.bench_with_input(BenchmarkId::new("nchw_view", name), &map, |b, map| {
            b.iter(|| black_box(map.nchw_view().shape().to_vec()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_kernel_unfold, bench_layout_conversion);
criterion_main!(benches);
