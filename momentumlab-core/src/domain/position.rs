//! Position — an open long created from a filled PendingOrder.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::prices::{EntrySource, StopSource, TargetSource};
use crate::scoring::Explanation;

/// Open position. `target` and `stop` are fixed at fill time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub signal_date: NaiveDate,
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub limit_price: f64,
    pub target: f64,
    pub stop: f64,
    pub entry_source: EntrySource,
    pub target_source: TargetSource,
    pub stop_source: StopSource,
    /// Calendar days since entry, updated each bar.
    pub days_held: i64,
    /// Highest high seen since entry (entry bar included).
    pub max_high: f64,
    pub score: f64,
    pub explanation: Explanation,
}

impl Position {
    /// Advance to a later bar: refresh days-held and the running high.
    pub fn mark(&mut self, date: NaiveDate, high: f64) {
        self.days_held = (date - self.entry_date).num_days();
        if high > self.max_high {
            self.max_high = high;
        }
    }

    /// Best unrealized gain since entry in percent, floored at zero, 1 dp.
    pub fn max_gain_pct(&self) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        let pct = ((self.max_high - self.entry_price) / self.entry_price * 100.0).max(0.0);
        (pct * 10.0).round() / 10.0
    }
}
