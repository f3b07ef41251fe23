//! Market-regime classification over an index-level bar series.
//!
//! Five independent factors add to a badness counter; the counter maps to
//! bull, sideways or bear. A classifier with no usable index data reports
//! bull for every date.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::indicators::{compute_indicators, IndicatorFrame};

/// Minimum index history for the classifier to be considered loaded.
pub const MIN_INDEX_BARS: usize = 60;
pub const BEAR_BADNESS: u32 = 4;
pub const SIDEWAYS_BADNESS: u32 = 2;
const SLOPE_LOOKBACK: usize = 20;
const RETURN_LOOKBACK: usize = 60;
const DRAWDOWN_LOOKBACK: usize = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    Bull,
    Sideways,
    Bear,
}

impl Regime {
    pub fn from_badness(badness: u32) -> Self {
        if badness >= BEAR_BADNESS {
            Regime::Bear
        } else if badness >= SIDEWAYS_BADNESS {
            Regime::Sideways
        } else {
            Regime::Bull
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Regime::Bull => "bull",
            Regime::Sideways => "sideways",
            Regime::Bear => "bear",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeSummary {
    pub regime: Regime,
    pub date: Option<NaiveDate>,
}

/// Regime lookup for one index series. Build once, query per date.
#[derive(Debug, Clone, Default)]
pub struct RegimeClassifier {
    bars: Vec<Bar>,
    frame: Option<IndicatorFrame>,
    by_date: HashMap<NaiveDate, usize>,
}

impl RegimeClassifier {
    pub fn new(index_bars: Vec<Bar>) -> Self {
        if index_bars.len() < MIN_INDEX_BARS {
            tracing::warn!(
                bars = index_bars.len(),
                "index history too short, regime defaults to bull"
            );
            return Self::default();
        }
        let frame = compute_indicators(&index_bars);
        let by_date = index_bars
            .iter()
            .enumerate()
            .map(|(i, b)| (b.date, i))
            .collect();
        Self {
            bars: index_bars,
            frame: Some(frame),
            by_date,
        }
    }

    /// Classifier with no index data; every date is bull.
    pub fn unloaded() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.frame.is_some()
    }

    /// Badness counter at `date`. `None` when not loaded or the date is not
    /// in the index series.
    pub fn badness(&self, date: NaiveDate) -> Option<u32> {
        let frame = self.frame.as_ref()?;
        let idx = *self.by_date.get(&date)?;
        let (ma20, ma60) = (frame.ma20(idx)?, frame.ma60(idx)?);
        let close = self.bars[idx].close;
        let mut bad = 0;

        if ma20 < ma60 {
            bad += 2;
        } else if (ma20 - ma60) / ma60 < 0.02 {
            bad += 1;
        }

        if idx >= SLOPE_LOOKBACK {
            if let Some(prev) = frame.ma60(idx - SLOPE_LOOKBACK).filter(|m| *m > 0.0) {
                let slope = (ma60 - prev) / prev;
                if slope < -0.02 {
                    bad += 2;
                } else if slope < 0.0 {
                    bad += 1;
                }
            }
        }

        if idx >= RETURN_LOOKBACK {
            let base = self.bars[idx - RETURN_LOOKBACK].close;
            if base > 0.0 {
                let r60 = (close - base) / base;
                if r60 < -0.10 {
                    bad += 2;
                } else if r60 < -0.04 {
                    bad += 1;
                }
            }
        }

        let peak = self.bars[idx.saturating_sub(DRAWDOWN_LOOKBACK)..=idx]
            .iter()
            .map(|b| b.high)
            .fold(0.0, f64::max);
        if peak > 0.0 {
            let drawdown = (close - peak) / peak;
            if drawdown < -0.20 {
                bad += 2;
            } else if drawdown < -0.10 {
                bad += 1;
            }
        }

        if idx >= SLOPE_LOOKBACK {
            let base = self.bars[idx - SLOPE_LOOKBACK].close;
            if base > 0.0 && (close - base) / base < -0.05 {
                bad += 1;
            }
        }

        Some(bad)
    }

    /// Regime at `date`. Unloaded ⇒ bull; unknown date or missing averages
    /// ⇒ sideways.
    pub fn regime_for(&self, date: NaiveDate) -> Regime {
        if !self.is_loaded() {
            return Regime::Bull;
        }
        self.badness(date)
            .map_or(Regime::Sideways, Regime::from_badness)
    }

    pub fn is_bear_market(&self, date: NaiveDate) -> bool {
        self.regime_for(date) == Regime::Bear
    }

    pub fn latest(&self) -> RegimeSummary {
        match self.bars.last() {
            Some(last) if self.is_loaded() => RegimeSummary {
                regime: self.regime_for(last.date),
                date: Some(last.date),
            },
            _ => RegimeSummary {
                regime: Regime::Bull,
                date: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn series(f: impl Fn(usize) -> f64, n: usize) -> Vec<Bar> {
        make_bars(&(0..n).map(f).collect::<Vec<_>>())
    }

    #[test]
    fn unloaded_is_bull() {
        let c = RegimeClassifier::new(series(|_| 100.0, 30));
        assert!(!c.is_loaded());
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(c.regime_for(date), Regime::Bull);
        assert!(!c.is_bear_market(date));
        assert_eq!(c.latest().regime, Regime::Bull);
    }

    #[test]
    fn steady_uptrend_is_bull() {
        let bars = series(|i| 100.0 * 1.004f64.powi(i as i32), 200);
        let last = bars[199].date;
        let c = RegimeClassifier::new(bars);
        assert_eq!(c.regime_for(last), Regime::Bull);
        assert_eq!(c.latest().date, Some(last));
    }

    #[test]
    fn crash_is_bear() {
        let bars = series(
            |i| {
                if i < 150 {
                    100.0
                } else {
                    100.0 * 0.99f64.powi((i - 150) as i32)
                }
            },
            230,
        );
        let last = bars[229].date;
        let c = RegimeClassifier::new(bars);
        assert!(c.badness(last).unwrap() >= BEAR_BADNESS);
        assert!(c.is_bear_market(last));
    }

    #[test]
    fn unknown_date_is_sideways() {
        let c = RegimeClassifier::new(series(|_| 100.0, 100));
        let date = NaiveDate::from_ymd_opt(1999, 1, 1).unwrap();
        assert_eq!(c.regime_for(date), Regime::Sideways);
    }

    #[test]
    fn badness_thresholds() {
        assert_eq!(Regime::from_badness(0), Regime::Bull);
        assert_eq!(Regime::from_badness(1), Regime::Bull);
        assert_eq!(Regime::from_badness(2), Regime::Sideways);
        assert_eq!(Regime::from_badness(4), Regime::Bear);
        assert_eq!(Regime::from_badness(9), Regime::Bear);
    }
}
