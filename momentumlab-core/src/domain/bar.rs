//! Bar — one day of OHLCV data for a security.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Daily OHLCV bar.
///
/// Bars are immutable engine input. Everything derived from them lives in
/// [`crate::indicators::IndicatorFrame`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Close above open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Close below open.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Signed candle body (close - open).
    pub fn body(&self) -> f64 {
        self.close - self.open
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// Basic OHLC sanity: finite positive prices, low <= open/close <= high.
    pub fn is_sane(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}

/// Caller-side validation failures for a bar sequence.
#[derive(Debug, Error, PartialEq)]
pub enum BarError {
    #[error("bar {index} ({date}) has non-finite or non-positive prices or inconsistent OHLC")]
    Malformed { index: usize, date: NaiveDate },

    #[error("bar {index} ({date}) is not after the previous bar ({previous})")]
    NonMonotonicDate {
        index: usize,
        date: NaiveDate,
        previous: NaiveDate,
    },
}

/// Reject malformed bars and non-increasing dates before they reach the engine.
pub fn validate_bars(bars: &[Bar]) -> Result<(), BarError> {
    for (index, bar) in bars.iter().enumerate() {
        if !bar.is_sane() {
            return Err(BarError::Malformed {
                index,
                date: bar.date,
            });
        }
        if index > 0 {
            let previous = bars[index - 1].date;
            if bar.date <= previous {
                return Err(BarError::NonMonotonicDate {
                    index,
                    date: bar.date,
                    previous,
                });
            }
        }
    }
    Ok(())
}
