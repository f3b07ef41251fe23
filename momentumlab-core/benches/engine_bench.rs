//! Criterion benchmarks for MomentumLab hot paths.
//!
//! Benchmarks:
//! 1. Indicator frame computation
//! 2. Signal scoring across a full series
//! 3. Full backtest simulation
//! 4. Accumulation scoring

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use momentumlab_core::accumulation::AccumulationScorer;
use momentumlab_core::domain::{Bar, Profile};
use momentumlab_core::engine::{BacktestParams, ExitRules, Simulator};
use momentumlab_core::indicators::{compute_indicators, Indicator, Rsi, Sma};
use momentumlab_core::scoring::BenfordParams;
use momentumlab_core::SignalScorer;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 10_000.0 + (i as f64 * 0.1).sin() * 800.0 + i as f64 * 5.0;
            let open = close - 30.0;
            Bar::new(
                base_date + chrono::Duration::days(i as i64),
                open,
                close + 150.0,
                open - 150.0,
                close,
                1_000_000 + (i as u64 * 7_919 % 500_000),
            )
        })
        .collect()
}

// ── 1. Indicators ────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");

    for &bar_count in &[252, 1260, 2520] {
        let bars = make_bars(bar_count);

        group.bench_with_input(BenchmarkId::new("sma_20", bar_count), &bar_count, |b, _| {
            let sma = Sma::new(20);
            b.iter(|| sma.compute(black_box(&bars)));
        });

        group.bench_with_input(BenchmarkId::new("rsi_14", bar_count), &bar_count, |b, _| {
            let rsi = Rsi::new(14);
            b.iter(|| rsi.compute(black_box(&bars)));
        });

        group.bench_with_input(BenchmarkId::new("frame", bar_count), &bar_count, |b, _| {
            b.iter(|| compute_indicators(black_box(&bars)));
        });
    }

    group.finish();
}

// ── 2. Scoring ───────────────────────────────────────────────────────

fn bench_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");
    let bars = make_bars(1260);
    let frame = compute_indicators(&bars);
    let scorer = SignalScorer::new(Profile::default(), BenfordParams::default());

    group.bench_function("momentum_1260_bars", |b| {
        b.iter(|| {
            (60..bars.len())
                .map(|i| scorer.score(black_box(&bars), black_box(&frame), i).score)
                .sum::<f64>()
        });
    });

    let accumulation = AccumulationScorer::default();
    group.bench_function("accumulation_1260_bars", |b| {
        b.iter(|| {
            (60..bars.len())
                .map(|i| accumulation.score(black_box(&bars), black_box(&frame), i).score)
                .sum::<f64>()
        });
    });

    group.finish();
}

// ── 3. Simulation ────────────────────────────────────────────────────

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");

    for &bar_count in &[252, 1260] {
        let bars = make_bars(bar_count);
        let frame = compute_indicators(&bars);
        let profile = Profile::default();
        let scorer = SignalScorer::new(profile.clone(), BenfordParams::default());
        let params = BacktestParams::default();
        let rules = ExitRules::from_profile(&profile);

        group.bench_with_input(
            BenchmarkId::new("momentum", bar_count),
            &bar_count,
            |b, _| {
                let sim = Simulator::new(&scorer, rules, &params);
                b.iter(|| sim.run(black_box(&bars), black_box(&frame), 60));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_indicators, bench_scoring, bench_simulation);
criterion_main!(benches);
