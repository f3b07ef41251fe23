//! Trade — the terminal record of a closed position.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::prices::{EntrySource, StopSource, TargetSource};
use crate::scoring::Explanation;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    Target,
    Stop,
    Timeout,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::Target => "TARGET",
            ExitReason::Stop => "STOP",
            ExitReason::Timeout => "TIMEOUT",
        };
        f.write_str(s)
    }
}

/// A completed round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub signal_date: NaiveDate,
    /// Signal score rounded to one decimal.
    pub score: f64,
    pub explanation: Explanation,

    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub limit_price: f64,
    pub entry_source: EntrySource,

    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    pub target_price: f64,
    pub target_source: TargetSource,
    pub stop_price: f64,
    pub stop_source: StopSource,

    /// Net return after round-trip costs, in percent, 2 dp.
    pub pnl_pct: f64,
    /// Gross price difference times quantity, rounded to a whole unit.
    pub pnl_amount: f64,
    /// Best intraday gain while held, in percent, 1 dp.
    pub max_gain_pct: f64,
    pub days_held: i64,
    pub bars_held: usize,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl_pct > 0.0
    }
}

/// Net percent return after a round-trip cost fraction, rounded to 2 dp.
pub fn net_return_pct(entry: f64, exit: f64, round_trip_cost: f64) -> f64 {
    if entry <= 0.0 {
        return 0.0;
    }
    ((exit / entry - 1.0 - round_trip_cost) * 10_000.0).round() / 100.0
}
