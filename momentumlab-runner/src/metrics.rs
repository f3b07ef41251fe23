//! Trade summary statistics.
//!
//! Pure functions over a trade list. Returns are percentages, as carried on
//! [`Trade::pnl_pct`]. Trades with a non-finite P&L are ignored.

use serde::{Deserialize, Serialize};

use momentumlab_core::domain::{ExitReason, Trade};

/// Aggregate statistics for one simulation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeSummary {
    pub closed: usize,
    pub wins: usize,
    /// Trades with P&L ≤ 0.
    pub losses: usize,
    /// Percent of closed trades that won.
    pub win_rate: f64,
    /// Mean P&L percent.
    pub avg_return: f64,
    /// Compounded return percent: (∏(1 + pnl/100) − 1) × 100.
    pub cum_return: f64,
    pub targets: usize,
    pub stops: usize,
    pub timeouts: usize,
    pub pnl_amount: f64,
    pub avg_days_held: f64,
    pub max_losing_streak: usize,
}

impl TradeSummary {
    pub fn compute(trades: &[Trade]) -> Self {
        let valid: Vec<&Trade> = trades.iter().filter(|t| t.pnl_pct.is_finite()).collect();
        let closed = valid.len();
        let wins = valid.iter().filter(|t| t.is_winner()).count();
        let count = |reason: ExitReason| valid.iter().filter(|t| t.exit_reason == reason).count();

        Self {
            closed,
            wins,
            losses: closed - wins,
            win_rate: win_rate(&valid),
            avg_return: avg_return(&valid),
            cum_return: cum_return(&valid),
            targets: count(ExitReason::Target),
            stops: count(ExitReason::Stop),
            timeouts: count(ExitReason::Timeout),
            pnl_amount: valid.iter().map(|t| t.pnl_amount).sum(),
            avg_days_held: if closed == 0 {
                0.0
            } else {
                valid.iter().map(|t| t.days_held as f64).sum::<f64>() / closed as f64
            },
            max_losing_streak: max_consecutive_losses(trades),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.closed == 0
    }
}

// ─── Individual metric functions ────────────────────────────────────

pub fn win_rate(trades: &[&Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades.iter().filter(|t| t.is_winner()).count();
    wins as f64 / trades.len() as f64 * 100.0
}

pub fn avg_return(trades: &[&Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.pnl_pct).sum::<f64>() / trades.len() as f64
}

pub fn cum_return(trades: &[&Trade]) -> f64 {
    let growth: f64 = trades.iter().map(|t| 1.0 + t.pnl_pct / 100.0).product();
    (growth - 1.0) * 100.0
}

/// Longest run of consecutive non-winning trades.
pub fn max_consecutive_losses(trades: &[Trade]) -> usize {
    let mut max = 0;
    let mut run = 0;
    for t in trades {
        if t.is_winner() {
            run = 0;
        } else {
            run += 1;
            max = max.max(run);
        }
    }
    max
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use momentumlab_core::domain::{ExitReason, Trade};
    use momentumlab_core::prices::{EntrySource, StopSource, TargetSource};
    use momentumlab_core::scoring::Explanation;

    pub fn trade(pnl_pct: f64, reason: ExitReason) -> Trade {
        let d = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        Trade {
            signal_date: d,
            score: 6.0,
            explanation: Explanation::new(),
            entry_date: d,
            entry_price: 10_000.0,
            limit_price: 10_000.0,
            entry_source: EntrySource::Close,
            exit_date: d + chrono::Duration::days(4),
            exit_price: 10_000.0 * (1.0 + pnl_pct / 100.0),
            exit_reason: reason,
            target_price: 11_000.0,
            target_source: TargetSource::FixedPercent,
            stop_price: 9_300.0,
            stop_source: StopSource::FixedPercent,
            pnl_pct,
            pnl_amount: pnl_pct * 1_000.0,
            max_gain_pct: pnl_pct.max(0.0),
            days_held: 4,
            bars_held: 3,
        }
    }
}
