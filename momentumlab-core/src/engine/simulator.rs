//! Bar-by-bar backtest of one security.
//!
//! Each bar runs three steps in a fixed order:
//!
//! 1. Pending order: fill at the open or the limit, else expire. A bar that
//!    fills does nothing else.
//! 2. Open position: exit on target, stop or timeout.
//! 3. Idle: cooldown, RSI floor, regime filter, then the signal source. A
//!    score at or above the threshold places a pending limit order.

use tracing::debug;

use crate::circuit_breaker::CircuitBreaker;
use crate::domain::{net_return_pct, Bar, ExitReason, PendingOrder, Position, Trade};
use crate::indicators::IndicatorFrame;
use crate::prices::{stop_at_fill, target_at_fill, PriceResolver};
use crate::regime::RegimeClassifier;
use crate::scoring::{SignalSource, MIN_SCORING_INDEX};

use super::params::{BacktestParams, ExitRules};

/// Lifecycle state of the simulated security.
#[derive(Debug, Clone)]
pub enum SecurityState {
    Idle,
    Pending(PendingOrder),
    InPosition(Position),
}

/// Configured simulation. Borrowed inputs only; `run` can be called many
/// times against different bar windows.
pub struct Simulator<'a> {
    source: &'a dyn SignalSource,
    rules: ExitRules,
    params: &'a BacktestParams,
    resolver: PriceResolver,
    regime: Option<&'a RegimeClassifier>,
    breaker: CircuitBreaker,
}

impl<'a> Simulator<'a> {
    /// `base` supplies the exit rules that `params` does not override.
    pub fn new(source: &'a dyn SignalSource, base: ExitRules, params: &'a BacktestParams) -> Self {
        Self {
            source,
            rules: params.exit_rules(base),
            params,
            resolver: PriceResolver::default(),
            regime: None,
            breaker: CircuitBreaker::default(),
        }
    }

    pub fn with_regime(mut self, regime: &'a RegimeClassifier) -> Self {
        self.regime = Some(regime);
        self
    }

    pub fn with_resolver(mut self, resolver: PriceResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn rules(&self) -> &ExitRules {
        &self.rules
    }

    /// Replay bars from `start` (never earlier than the scoring warm-up) to
    /// the end of the series. Indicators in `frame` must cover `bars`.
    pub fn run(&self, bars: &[Bar], frame: &IndicatorFrame, start: usize) -> Vec<Trade> {
        let mut trades = Vec::new();
        let mut state = SecurityState::Idle;
        let mut breaker = self.breaker;
        let mut last_signal: Option<usize> = None;

        for i in start.max(MIN_SCORING_INDEX)..bars.len() {
            let bar = &bars[i];
            let cooldown = breaker.effective_cooldown(self.rules.cooldown);

            if let SecurityState::Pending(order) = &state {
                if bar.date > order.signal_date {
                    match order.try_fill(bar.open, bar.low).price() {
                        Some(fill) => {
                            let position = self.open_position(order, fill, i, bar, frame);
                            debug!(
                                date = %bar.date,
                                fill,
                                target = position.target,
                                stop = position.stop,
                                "order filled"
                            );
                            state = SecurityState::InPosition(position);
                            continue;
                        }
                        None => {
                            debug!(date = %bar.date, limit = order.limit_price, "order expired");
                            state = SecurityState::Idle;
                        }
                    }
                }
            }

            if let SecurityState::InPosition(position) = &mut state {
                if bar.date > position.entry_date {
                    position.mark(bar.date, bar.high);
                    if let Some((reason, exit_price)) = exit_decision(position, bar, self.rules.max_hold) {
                        let trade = self.close_position(position, i, bar, reason, exit_price);
                        debug!(
                            date = %bar.date,
                            reason = %trade.exit_reason,
                            pnl_pct = trade.pnl_pct,
                            "position closed"
                        );
                        breaker.record_exit(reason == ExitReason::Stop);
                        trades.push(trade);
                        state = SecurityState::Idle;
                    }
                }
            }

            if matches!(state, SecurityState::Idle) {
                if last_signal.is_some_and(|last| i - last < cooldown) {
                    continue;
                }
                if let Some(order) = self.signal_at(bars, frame, i) {
                    debug!(date = %bar.date, score = order.score, limit = order.limit_price, "signal");
                    last_signal = Some(i);
                    state = SecurityState::Pending(order);
                }
            }
        }

        trades
    }

    /// Entry filters and scoring for an idle bar.
    fn signal_at(&self, bars: &[Bar], frame: &IndicatorFrame, i: usize) -> Option<PendingOrder> {
        if frame.rsi(i).is_some_and(|rsi| rsi < self.params.rsi_min) {
            return None;
        }
        let bar = &bars[i];
        if self.params.regime_filter
            && self
                .regime
                .is_some_and(|r| r.is_loaded() && r.is_bear_market(bar.date))
        {
            return None;
        }

        let signal = self.source.evaluate(bars, frame, i);
        if signal.score < self.params.threshold {
            return None;
        }

        let prices = self.resolver.resolve(bars, frame, i);
        Some(PendingOrder {
            signal_index: i,
            signal_date: bar.date,
            limit_price: prices.entry,
            entry_source: prices.entry_source,
            target_anchor: prices.target_anchor,
            target_source: prices.target_source,
            score: (signal.score * 10.0).round() / 10.0,
            explanation: signal.explanation,
        })
    }

    fn open_position(
        &self,
        order: &PendingOrder,
        fill: f64,
        i: usize,
        bar: &Bar,
        frame: &IndicatorFrame,
    ) -> Position {
        let (mut target, target_source) = target_at_fill(
            fill,
            order.target_anchor,
            order.target_source,
            self.rules.take_profit,
        );
        let (mut stop, stop_source) =
            stop_at_fill(fill, frame.kijun(i), frame.atr(i), self.rules.stop_loss);
        if self.params.round_exit_levels {
            target = target.round();
            // whole units, still never above the fill
            stop = stop.round().min(fill.floor());
        }

        Position {
            signal_date: order.signal_date,
            entry_index: i,
            entry_date: bar.date,
            entry_price: fill,
            limit_price: order.limit_price,
            target,
            stop,
            entry_source: order.entry_source,
            target_source,
            stop_source,
            days_held: 0,
            max_high: bar.high,
            score: order.score,
            explanation: order.explanation.clone(),
        }
    }

    fn close_position(
        &self,
        position: &Position,
        i: usize,
        bar: &Bar,
        reason: ExitReason,
        exit_price: f64,
    ) -> Trade {
        Trade {
            signal_date: position.signal_date,
            score: position.score,
            explanation: position.explanation.clone(),
            entry_date: position.entry_date,
            entry_price: position.entry_price,
            limit_price: position.limit_price,
            entry_source: position.entry_source,
            exit_date: bar.date,
            exit_price,
            exit_reason: reason,
            target_price: position.target,
            target_source: position.target_source,
            stop_price: position.stop,
            stop_source: position.stop_source,
            pnl_pct: net_return_pct(
                position.entry_price,
                exit_price,
                self.params.round_trip_cost(),
            ),
            pnl_amount: ((exit_price - position.entry_price) * f64::from(self.params.quantity))
                .round(),
            max_gain_pct: position.max_gain_pct(),
            days_held: position.days_held,
            bars_held: i - position.entry_index,
        }
    }
}

/// Exit reason and price for a held position on `bar`, if any.
///
/// When one bar reaches both levels: an open at or below the stop exits at
/// the stop; an open at or above the target exits at the target; otherwise
/// the stop wins.
pub fn exit_decision(position: &Position, bar: &Bar, max_hold: i64) -> Option<(ExitReason, f64)> {
    let hit_target = bar.high >= position.target;
    let hit_stop = bar.low <= position.stop;
    let stop = (ExitReason::Stop, position.stop);
    let target = (ExitReason::Target, position.target);

    match (hit_target, hit_stop) {
        (true, true) if bar.open <= position.stop => Some(stop),
        (true, true) if bar.open >= position.target => Some(target),
        (true, true) => Some(stop),
        (false, true) => Some(stop),
        (true, false) => Some(target),
        (false, false) if max_hold > 0 && position.days_held >= max_hold => {
            Some((ExitReason::Timeout, bar.close))
        }
        (false, false) => None,
    }
}

/// Convenience wrapper: simulate with exit rules taken from `base` and no
/// regime filter.
pub fn simulate(
    bars: &[Bar],
    frame: &IndicatorFrame,
    start: usize,
    source: &dyn SignalSource,
    base: ExitRules,
    params: &BacktestParams,
) -> Vec<Trade> {
    Simulator::new(source, base, params).run(bars, frame, start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::compute_indicators;
    use crate::prices::{EntrySource, StopSource, TargetSource};
    use crate::scoring::{Explanation, SignalScore};
    use chrono::NaiveDate;

    /// Signal source that fires a fixed score on chosen bars.
    struct Fixed {
        on: Vec<usize>,
        score: f64,
    }

    impl SignalSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn evaluate(&self, _bars: &[Bar], _frame: &IndicatorFrame, idx: usize) -> SignalScore {
            if self.on.contains(&idx) {
                SignalScore {
                    score: self.score,
                    explanation: Explanation::new(),
                }
            } else {
                SignalScore::zero()
            }
        }
    }

    fn flat_bars(n: usize) -> Vec<Bar> {
        let d0 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| {
                Bar::new(
                    d0 + chrono::Duration::days(i as i64),
                    10_000.0,
                    10_050.0,
                    9_950.0,
                    10_000.0,
                    1_000,
                )
            })
            .collect()
    }

    fn position(entry: f64, target: f64, stop: f64) -> Position {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        Position {
            signal_date: d,
            entry_index: 70,
            entry_date: d,
            entry_price: entry,
            limit_price: entry,
            target,
            stop,
            entry_source: EntrySource::Close,
            target_source: TargetSource::FixedPercent,
            stop_source: StopSource::FixedPercent,
            days_held: 1,
            max_high: entry,
            score: 5.0,
            explanation: Explanation::new(),
        }
    }

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(), open, high, low, close, 1)
    }

    #[test]
    fn both_levels_hit_gap_down_is_stop() {
        let p = position(100.0, 110.0, 95.0);
        let d = exit_decision(&p, &bar(94.0, 111.0, 93.0, 100.0), 0);
        assert_eq!(d, Some((ExitReason::Stop, 95.0)));
    }

    #[test]
    fn both_levels_hit_gap_up_is_target() {
        let p = position(100.0, 110.0, 95.0);
        let d = exit_decision(&p, &bar(111.0, 112.0, 94.0, 100.0), 0);
        assert_eq!(d, Some((ExitReason::Target, 110.0)));
    }

    #[test]
    fn both_levels_hit_open_between_is_stop() {
        let p = position(100.0, 110.0, 95.0);
        let d = exit_decision(&p, &bar(100.0, 111.0, 94.0, 100.0), 0);
        assert_eq!(d, Some((ExitReason::Stop, 95.0)));
    }

    #[test]
    fn timeout_exits_at_close() {
        let mut p = position(100.0, 110.0, 95.0);
        p.days_held = 5;
        let b = bar(100.0, 101.0, 99.0, 100.5);
        assert_eq!(exit_decision(&p, &b, 0), None);
        assert_eq!(exit_decision(&p, &b, 5), Some((ExitReason::Timeout, 100.5)));
        assert_eq!(exit_decision(&p, &b, 6), None);
    }

    #[test]
    fn target_exit_with_costs() {
        let mut bars = flat_bars(75);
        // fill at open 10_000 on bar 71, target hit on bar 72
        bars[72] = Bar::new(bars[72].date, 10_100.0, 12_000.0, 10_050.0, 11_000.0, 1_000);
        let frame = compute_indicators(&bars);
        let source = Fixed { on: vec![70], score: 9.0 };
        let params = BacktestParams {
            rsi_min: 0.0,
            take_profit: Some(0.05),
            ..BacktestParams::default()
        };
        let base = ExitRules {
            take_profit: 0.17,
            stop_loss: 0.07,
            cooldown: 3,
            max_hold: 0,
        };
        let trades = simulate(&bars, &frame, 60, &source, base, &params);
        assert_eq!(trades.len(), 1);
        let t = &trades[0];
        assert_eq!(t.entry_price, 10_000.0);
        assert_eq!(t.exit_reason, ExitReason::Target);
        assert_eq!(t.exit_price, 10_500.0);
        assert_eq!(t.pnl_pct, 4.79);
        assert_eq!(t.pnl_amount, 5_000.0);
        assert_eq!(t.days_held, 1);
        assert_eq!(t.bars_held, 1);
        assert_eq!(t.score, 9.0);
    }

    #[test]
    fn positions_never_overlap() {
        let bars = flat_bars(140);
        let frame = compute_indicators(&bars);
        let source = Fixed {
            on: (60..140).collect(),
            score: 6.0,
        };
        let params = BacktestParams {
            rsi_min: 0.0,
            max_hold: Some(3),
            ..BacktestParams::default()
        };
        let base = ExitRules {
            take_profit: 0.17,
            stop_loss: 0.07,
            cooldown: 3,
            max_hold: 0,
        };
        let trades = simulate(&bars, &frame, 60, &source, base, &params);
        assert!(!trades.is_empty());
        for pair in trades.windows(2) {
            assert!(pair[1].entry_date > pair[0].exit_date);
        }
        for t in &trades {
            assert_eq!(t.exit_reason, ExitReason::Timeout);
            assert!(t.entry_date > t.signal_date);
        }
    }

    #[test]
    fn below_threshold_places_nothing() {
        let bars = flat_bars(100);
        let frame = compute_indicators(&bars);
        let source = Fixed {
            on: (60..100).collect(),
            score: 4.4,
        };
        let params = BacktestParams {
            rsi_min: 0.0,
            ..BacktestParams::default()
        };
        let base = ExitRules {
            take_profit: 0.17,
            stop_loss: 0.07,
            cooldown: 3,
            max_hold: 2,
        };
        assert!(simulate(&bars, &frame, 60, &source, base, &params).is_empty());
    }
}
