//! Property tests for runner invariants.
//!
//! 1. Trade summaries stay internally consistent on any synthetic series
//! 2. Both fitness functions are finite and the penalties only ever subtract
//! 3. Sweep results keep grid order whether run in parallel or not

use chrono::NaiveDate;
use proptest::prelude::*;

use momentumlab_runner::config::EngineConfig;
use momentumlab_runner::data_loader::generate_synthetic_bars;
use momentumlab_runner::fitness::{profit_fitness, stability_fitness};
use momentumlab_runner::metrics::TradeSummary;
use momentumlab_runner::runner::{run_backtest_on_bars, StrategyMode};
use momentumlab_runner::sweep::{ParamGrid, ParamSweep};

fn arb_symbol() -> impl Strategy<Value = String> {
    "[A-Z]{3,5}"
}

fn arb_summary() -> impl Strategy<Value = TradeSummary> {
    (0usize..40, 0.0..=100.0_f64, -20.0..20.0_f64, -90.0..400.0_f64).prop_map(
        |(closed, win_rate, avg_return, cum_return)| TradeSummary {
            closed,
            win_rate,
            avg_return,
            cum_return,
            ..TradeSummary::default()
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn summary_is_consistent(symbol in arb_symbol(), n in 70usize..320) {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars = generate_synthetic_bars(&symbol, start, n);
        let result = run_backtest_on_bars(
            &symbol,
            &bars,
            &EngineConfig::default(),
            StrategyMode::Momentum,
            None,
        )
        .unwrap();

        let s = result.summary;
        prop_assert_eq!(s.closed, result.trades.len());
        prop_assert_eq!(s.wins + s.losses, s.closed);
        prop_assert!(s.targets + s.stops + s.timeouts <= s.closed);
        prop_assert!((0.0..=100.0).contains(&s.win_rate));
        prop_assert!(s.max_losing_streak <= s.losses);
        if s.closed == 0 {
            prop_assert_eq!(s.avg_return, 0.0);
        }
    }

    #[test]
    fn fitness_is_finite(s in arb_summary()) {
        prop_assert!(stability_fitness(&s).is_finite());
        prop_assert!(profit_fitness(&s).is_finite());
    }

    #[test]
    fn low_win_rate_never_outscores_the_same_summary_above_sixty(s in arb_summary()) {
        let weak = TradeSummary { win_rate: 45.0, ..s };
        let strong = TradeSummary { win_rate: 65.0, ..s };
        prop_assert!(stability_fitness(&weak) < stability_fitness(&strong));
    }
}

#[test]
fn sweep_order_is_grid_order() {
    let grid = ParamGrid {
        take_profits: vec![0.03, 0.05, 0.08],
        stop_losses: vec![0.03, 0.05],
        cooldowns: vec![2, 3, 5],
        benford_windows: vec![20, 30],
        benford_influences: vec![0.1],
        min_hits: vec![2, 3],
    };
    let cells = grid.cells();
    let key = |c: &momentumlab_runner::GridCell| {
        (c.take_profit, c.stop_loss, c.cooldown, c.benford_window, c.min_hits)
    };
    let par = ParamSweep::new().sweep(&cells, key);
    let seq = ParamSweep::new().with_parallelism(false).sweep(&cells, key);
    assert_eq!(par.all(), seq.all());
    assert_eq!(par.len(), grid.size());
}
