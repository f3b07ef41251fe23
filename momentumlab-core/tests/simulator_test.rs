//! Simulator integration: circuit breaker spacing, regime filter, costs.

use chrono::NaiveDate;

use momentumlab_core::circuit_breaker::CircuitBreaker;
use momentumlab_core::domain::{Bar, ExitReason, Trade};
use momentumlab_core::engine::{BacktestParams, ExitRules, Simulator};
use momentumlab_core::indicators::compute_indicators;
use momentumlab_core::regime::RegimeClassifier;
use momentumlab_core::scoring::{Explanation, SignalScore, SignalSource};
use momentumlab_core::IndicatorFrame;

struct Always;

impl SignalSource for Always {
    fn name(&self) -> &str {
        "always"
    }

    fn evaluate(&self, _bars: &[Bar], _frame: &IndicatorFrame, _idx: usize) -> SignalScore {
        SignalScore {
            score: 7.0,
            explanation: Explanation::new(),
        }
    }
}

fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64)
}

fn flat(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| Bar::new(day(i), 10_000.0, 10_050.0, 9_950.0, 10_000.0, 1_000))
        .collect()
}

fn rules() -> ExitRules {
    ExitRules {
        take_profit: 0.17,
        stop_loss: 0.07,
        cooldown: 3,
        max_hold: 0,
    }
}

fn signal_indices(trades: &[Trade]) -> Vec<i64> {
    trades
        .iter()
        .map(|t| (t.signal_date - day(0)).num_days())
        .collect()
}

#[test]
fn loss_streak_extends_cooldown() {
    let bars = flat(120);
    let frame = compute_indicators(&bars);
    // a 0.1% stop sits inside every bar's range
    let params = BacktestParams {
        rsi_min: 0.0,
        stop_loss: Some(0.001),
        ..BacktestParams::default()
    };
    let trades = Simulator::new(&Always, rules(), &params).run(&bars, &frame, 60);

    assert!(trades.iter().all(|t| t.exit_reason == ExitReason::Stop));
    assert_eq!(signal_indices(&trades), vec![60, 63, 66, 69, 72, 90, 108]);

    let breaker = CircuitBreaker::from_trades(&trades);
    assert_eq!(breaker.consecutive_losses(), 7);
    assert_eq!(breaker.effective_cooldown(3), 18);
}

#[test]
fn stop_exit_price_and_costs() {
    let bars = flat(70);
    let frame = compute_indicators(&bars);
    let params = BacktestParams {
        rsi_min: 0.0,
        stop_loss: Some(0.001),
        ..BacktestParams::default()
    };
    let trades = Simulator::new(&Always, rules(), &params).run(&bars, &frame, 60);
    let t = &trades[0];
    assert_eq!(t.entry_price, 10_000.0);
    assert_eq!(t.stop_price, 9_990.0);
    assert_eq!(t.exit_price, 9_990.0);
    // -0.1% gross, -0.21% costs
    assert_eq!(t.pnl_pct, -0.31);
    assert_eq!(t.pnl_amount, -100.0);
    assert_eq!(t.max_gain_pct, 0.5);
}

#[test]
fn bear_regime_blocks_new_signals() {
    let bars = flat(120);
    let frame = compute_indicators(&bars);
    // index falls 1% a bar after bar 20: deep bear from bar 60 on
    let index: Vec<Bar> = (0..120)
        .map(|i| {
            let c = if i < 20 {
                1_000.0
            } else {
                1_000.0 * 0.99f64.powi((i - 20) as i32)
            };
            Bar::new(day(i), c, c * 1.005, c * 0.995, c, 1_000_000)
        })
        .collect();
    let regime = RegimeClassifier::new(index);
    assert!(regime.is_bear_market(day(70)));

    let filtered = BacktestParams {
        rsi_min: 0.0,
        max_hold: Some(2),
        regime_filter: true,
        ..BacktestParams::default()
    };
    let trades = Simulator::new(&Always, rules(), &filtered)
        .with_regime(&regime)
        .run(&bars, &frame, 60);
    assert!(trades.is_empty());

    let unfiltered = BacktestParams {
        regime_filter: false,
        ..filtered
    };
    let trades = Simulator::new(&Always, rules(), &unfiltered)
        .with_regime(&regime)
        .run(&bars, &frame, 60);
    assert!(!trades.is_empty());
}

#[test]
fn unloaded_regime_fails_open() {
    let bars = flat(80);
    let frame = compute_indicators(&bars);
    let regime = RegimeClassifier::unloaded();
    let params = BacktestParams {
        rsi_min: 0.0,
        max_hold: Some(2),
        regime_filter: true,
        ..BacktestParams::default()
    };
    let trades = Simulator::new(&Always, rules(), &params)
        .with_regime(&regime)
        .run(&bars, &frame, 60);
    assert!(!trades.is_empty());
}

#[test]
fn start_index_limits_the_replay() {
    let bars = flat(120);
    let frame = compute_indicators(&bars);
    let params = BacktestParams {
        rsi_min: 0.0,
        max_hold: Some(2),
        ..BacktestParams::default()
    };
    let trades = Simulator::new(&Always, rules(), &params).run(&bars, &frame, 100);
    assert!(!trades.is_empty());
    assert!(trades.iter().all(|t| t.signal_date >= day(100)));
}
