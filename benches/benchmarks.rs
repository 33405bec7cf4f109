use std::hint::black_box;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use easi::ndarray::Array2;
use easi::{whiten, Bss, BssConfig, ContrastEstimator, OnlineConfig, WhiteningMethod};

fn generate_data(n_channels: usize, n_samples: usize, seed: u64) -> Array2<f64> {
    let mut data = Array2::zeros((n_channels, n_samples));
    let mut state = seed;

    for i in 0..n_channels {
        for j in 0..n_samples {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let u = (state >> 33) as f64 / (1u64 << 31) as f64;
            // Alternate uniform and Laplace channels
            data[[i, j]] = if i % 2 == 0 {
                (2.0 * u - 1.0) * 3.0_f64.sqrt()
            } else if u < 0.5 {
                (2.0 * u).ln()
            } else {
                -(2.0 * (1.0 - u)).ln()
            };
        }
    }

    // Diagonally dominant mixing keeps the problem well conditioned
    let mut mixing = Array2::eye(n_channels);
    for i in 0..n_channels {
        for j in 0..n_channels {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            mixing[[i, j]] += 0.5 * ((state >> 33) as f64 / (1u64 << 31) as f64 - 0.5);
        }
    }

    mixing.dot(&data)
}

fn bench_whitening(c: &mut Criterion) {
    let mut group = c.benchmark_group("whitening");
    let data = generate_data(8, 10000, 7);

    for method in [
        WhiteningMethod::Zca,
        WhiteningMethod::Pca,
        WhiteningMethod::Cholesky,
        WhiteningMethod::ZcaCor,
        WhiteningMethod::PcaCor,
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(method), &data, |b, data| {
            b.iter(|| whiten(black_box(data), method))
        });
    }

    group.finish();
}

fn bench_contrast(c: &mut Criterion) {
    let mut group = c.benchmark_group("contrast");
    let estimator = ContrastEstimator::default();

    for n_samples in [1000, 10000, 50000] {
        let data = generate_data(4, n_samples, 11);
        group.bench_with_input(
            BenchmarkId::new("estimate", format!("4x{}", n_samples)),
            &data,
            |b, data| b.iter(|| estimator.estimate(black_box(data).view())),
        );
    }

    group.finish();
}

fn bench_offline(c: &mut Criterion) {
    let mut group = c.benchmark_group("offline");

    for n_samples in [1000, 5000, 10000] {
        for n_channels in [2, 4, 8] {
            let data = generate_data(n_channels, n_samples, 42);
            let config = BssConfig::builder()
                .max_iterations(100)
                .early_stop(false)
                .build();

            group.bench_with_input(
                BenchmarkId::new(format!("{}x{}", n_channels, n_samples), "100it"),
                &data,
                |b, data| b.iter(|| Bss::fit_with_config(black_box(data), &config)),
            );
        }
    }

    group.finish();
}

fn bench_online(c: &mut Criterion) {
    let mut group = c.benchmark_group("online");
    let data = generate_data(2, 44100, 3);

    for block_len in [1024, 4096, 16384] {
        let config = OnlineConfig::builder()
            .epochs(50)
            .block_len(block_len)
            .build();
        group.bench_with_input(BenchmarkId::new("block", block_len), &data, |b, data| {
            b.iter(|| Bss::fit_online(black_box(data), &config))
        });
    }

    group.finish();
}

fn criterion_config() -> Criterion {
    Criterion::default()
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(30)
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_whitening, bench_contrast, bench_offline, bench_online
}
criterion_main!(benches);
