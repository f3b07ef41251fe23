//! PendingOrder — a limit buy created on a signal bar, alive for exactly one bar.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::prices::{EntrySource, TargetSource};
use crate::scoring::Explanation;

/// Outcome of offering a pending order to the next bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FillOutcome {
    /// Opened at or below the limit: filled at the open.
    AtOpen(f64),
    /// Traded down through the limit intraday: filled at the limit.
    AtLimit(f64),
    /// Never reached the limit: the order is discarded.
    Expired,
}

impl FillOutcome {
    pub fn price(&self) -> Option<f64> {
        match self {
            FillOutcome::AtOpen(p) | FillOutcome::AtLimit(p) => Some(*p),
            FillOutcome::Expired => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOrder {
    pub signal_index: usize,
    pub signal_date: NaiveDate,
    pub limit_price: f64,
    pub entry_source: EntrySource,
    /// Resolved target anchor, `None` when the cascade fell through.
    pub target_anchor: Option<f64>,
    pub target_source: TargetSource,
    pub score: f64,
    pub explanation: Explanation,
}

impl PendingOrder {
    /// Fill-or-expire against the next bar's open and low.
    pub fn try_fill(&self, open: f64, low: f64) -> FillOutcome {
        if open <= self.limit_price {
            FillOutcome::AtOpen(open)
        } else if low <= self.limit_price {
            FillOutcome::AtLimit(self.limit_price)
        } else {
            FillOutcome::Expired
        }
    }
}
