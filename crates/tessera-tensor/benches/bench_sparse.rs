use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use tessera_tensor::{ring_of, AlgebraConfig, DenseTensor, SparseTensor, Tensor};

const SHAPE: [usize; 2] = [256, 256];

/// Random data with the given fraction of non-zero elements.
fn random_data(density: f64) -> Vec<f64> {
    let mut rng = rand::rng();
    (0..SHAPE[0] * SHAPE[1])
        .map(|_| {
            if rng.random_bool(density) {
                rng.random_range(-1.0..1.0)
            } else {
                0.0
            }
        })
        .collect()
}

fn bench_sparse_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("sparse_add");

    for density in [0.01, 0.1, 0.5] {
        let lhs = random_data(density);
        let rhs = random_data(density);

        for (label, config) in [
            ("sequential", AlgebraConfig::sequential()),
            ("parallel", AlgebraConfig::with_parallel_threshold(0)),
        ] {
            let a = SparseTensor::from_shape_vec(&SHAPE, lhs.clone(), ring_of::<f64>())
                .unwrap()
                .with_config(config);
            let b = SparseTensor::from_shape_vec(&SHAPE, rhs.clone(), ring_of::<f64>()).unwrap();

            group.bench_with_input(BenchmarkId::new(label, density), &(a, b), |bench, (a, b)| {
                bench.iter(|| black_box(a.add(black_box(b)).unwrap()))
            });
        }
    }
    group.finish();
}

fn bench_dense_add(c: &mut Criterion) {
    let a = DenseTensor::from_shape_vec(&SHAPE, random_data(0.5), ring_of::<f64>()).unwrap();
    let b = DenseTensor::from_shape_vec(&SHAPE, random_data(0.5), ring_of::<f64>()).unwrap();

    c.bench_function("dense_add", |bench| {
        bench.iter(|| black_box(Tensor::add(&a, black_box(&b)).unwrap()))
    });
}

fn bench_sparse_transpose(c: &mut Criterion) {
    let a = SparseTensor::from_shape_vec(&SHAPE, random_data(0.1), ring_of::<f64>()).unwrap();

    c.bench_function("sparse_transpose", |bench| {
        bench.iter(|| black_box(a.transpose(&[1, 0]).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_sparse_add,
    bench_dense_add,
    bench_sparse_transpose
);
criterion_main!(benches);
