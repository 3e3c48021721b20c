use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use foldwise::training::{CVStrategy, CrossValidator};
use ndarray::Array1;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_labels(n_rows: usize, positive_rate: f64) -> Array1<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    Array1::from_iter((0..n_rows).map(|_| if rng.gen::<f64>() < positive_rate { 1.0 } else { 0.0 }))
}

fn create_groups(n_rows: usize, group_size: usize) -> Vec<String> {
    (0..n_rows).map(|i| format!("g{}", i / group_size)).collect()
}

fn bench_stratified(c: &mut Criterion) {
    let mut group = c.benchmark_group("stratified_kfold");

    for n_rows in [1000, 10000].iter() {
        let y = create_labels(*n_rows, 0.3);

        group.bench_with_input(BenchmarkId::new("split", n_rows), &y, |b, y| {
            let cv = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 5, shuffle: true })
                .with_random_state(0);
            b.iter(|| cv.split(black_box(y), None).unwrap())
        });
    }

    group.finish();
}

fn bench_stratified_group(c: &mut Criterion) {
    let mut group = c.benchmark_group("stratified_group_kfold");
    group.sample_size(20);

    for n_rows in [1000, 10000].iter() {
        let y = create_labels(*n_rows, 0.3);
        let groups = create_groups(*n_rows, 10);

        group.bench_with_input(
            BenchmarkId::new("split", n_rows),
            &(y, groups),
            |b, (y, groups)| {
                let cv = CrossValidator::new(CVStrategy::StratifiedGroupKFold {
                    n_splits: 5,
                    shuffle: false,
                });
                b.iter(|| cv.split(black_box(y), Some(groups.as_slice())).unwrap())
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_stratified, bench_stratified_group);
criterion_main!(benches);
