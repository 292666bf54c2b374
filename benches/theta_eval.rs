use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use siegel_theta::*;

fn bench_theta_eval(c: &mut Criterion) {
    let mut rng = ChaCha20Rng::seed_from_u64(1);
    let tau = AcbMat::random_siegel(2, &mut rng);
    let z = vec![Acb::from_f64(0.1, 0.2), Acb::from_f64(-0.3, 0.1)];

    let mut group = c.benchmark_group("genus_two");
    for prec in [64u64, 256, 1024] {
        group.bench_with_input(BenchmarkId::new("naive_all", prec), &prec, |b, &prec| {
            b.iter(|| {
                let th = naive_all(black_box(&[z.clone()]), black_box(&tau), prec);
                black_box(th)
            });
        });
        group.bench_with_input(BenchmarkId::new("theta_all", prec), &prec, |b, &prec| {
            b.iter(|| {
                let th = theta_all(black_box(&z), black_box(&tau), prec);
                black_box(th)
            });
        });
    }
    group.finish();

    // Small imaginary part, where the reduction does most of the work
    let skewed = AcbMat::from_c64_rows(&[vec![(0.3, 0.02)]]).unwrap();
    c.bench_function("theta_all_sqr_reduced", |b| {
        b.iter(|| {
            let th = theta_all_sqr(black_box(&[Acb::from_f64(0.1, 0.0)]), black_box(&skewed), 128);
            black_box(th)
        });
    });
}

criterion_group!(benches, bench_theta_eval);
criterion_main!(benches);
