/// Evaluation latency benchmarks
///
/// Measures end-to-end guardian latency per test family and the cost of the
/// individual checks that dominate it (Shapiro-Wilk and the reduced-grid KDE).
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use statguard::dataset::Dataset;
use statguard::density;
use statguard::distributions::normal_quantile;
use statguard::family::TestFamily;
use statguard::guardian::{Guardian, GuardianOptions};
use statguard::policy::GuardianPolicy;
use statguard::validators::shapiro_wilk;
use std::time::Duration;

/// Normal quantiles, interleaved so the series has no trend
fn sample(n: usize, shift: f64) -> Vec<f64> {
    let sorted: Vec<f64> = (1..=n)
        .map(|i| shift + normal_quantile((i as f64 - 0.5) / n as f64))
        .collect();
    let (mut lo, mut hi) = (0, n - 1);
    let mut out = Vec::with_capacity(n);
    while lo <= hi {
        out.push(sorted[lo]);
        if lo != hi {
            out.push(sorted[hi]);
        }
        lo += 1;
        if hi == 0 {
            break;
        }
        hi -= 1;
    }
    out
}

fn bench_evaluate(c: &mut Criterion) {
    let guardian = Guardian::from_policy(GuardianPolicy::default()).unwrap();
    let mut group = c.benchmark_group("evaluate");
    group.measurement_time(Duration::from_secs(5));

    for n in [50, 500, 5000] {
        group.throughput(Throughput::Elements(2 * n as u64));

        let groups = Dataset::unnamed_groups(vec![sample(n, 0.0), sample(n, 0.5)]).unwrap();
        group.bench_with_input(BenchmarkId::new("t_test", n), &groups, |b, ds| {
            b.iter(|| guardian.evaluate(TestFamily::TTest, black_box(ds.clone()), 0.05))
        });
        group.bench_with_input(BenchmarkId::new("anova", n), &groups, |b, ds| {
            b.iter(|| guardian.evaluate(TestFamily::Anova, black_box(ds.clone()), 0.05))
        });

        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().zip(sample(n, 0.0)).map(|(a, e)| 2.0 * a + e).collect();
        let paired = Dataset::paired(x, y).unwrap();
        group.bench_with_input(BenchmarkId::new("regression", n), &paired, |b, ds| {
            b.iter(|| guardian.evaluate(TestFamily::Regression, black_box(ds.clone()), 0.05))
        });
    }
    group.finish();
}

fn bench_deadline_overhead(c: &mut Criterion) {
    let inline = Guardian::from_policy(GuardianPolicy::default()).unwrap();
    let threaded = inline
        .clone()
        .with_options(GuardianOptions::with_deadline(Duration::from_secs(10)));
    let ds = Dataset::unnamed_groups(vec![sample(500, 0.0), sample(500, 0.5)]).unwrap();

    let mut group = c.benchmark_group("deadline_overhead");
    group.bench_function("inline", |b| {
        b.iter(|| inline.evaluate(TestFamily::TTest, black_box(ds.clone()), 0.05))
    });
    group.bench_function("threaded", |b| {
        b.iter(|| threaded.evaluate(TestFamily::TTest, black_box(ds.clone()), 0.05))
    });
    group.finish();
}

fn bench_checks(c: &mut Criterion) {
    let mut group = c.benchmark_group("checks");
    for n in [100, 1000, 5000] {
        let values = sample(n, 0.0);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("shapiro_wilk", n), &values, |b, v| {
            b.iter(|| shapiro_wilk(black_box(v)))
        });
        group.bench_with_input(BenchmarkId::new("kde_reduced_grid", n), &values, |b, v| {
            b.iter(|| density::estimate(black_box(v), density::MAX_GRID_POINTS))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_deadline_overhead, bench_checks);
criterion_main!(benches);
