//! Wilder average true range.
//!
//! The first bar has no prior close, so the smoothing seed is the mean of
//! TR[1..=period] and the first defined value sits at index `period`.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "atr period is zero");
        Self {
            name: format!("atr{period}"),
            period,
        }
    }
}

/// Per-bar true range. Bar 0 falls back to its own high−low span.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let first = bars.first().map(|b| b.high - b.low);
    first
        .into_iter()
        .chain(bars.windows(2).map(|w| {
            let prev_close = w[0].close;
            let b = &w[1];
            (b.high - b.low)
                .max((b.high - prev_close).abs())
                .max((b.low - prev_close).abs())
        }))
        .collect()
}

/// Apply Wilder smoothing to a series.
///
/// Seed: mean of the first `period` consecutive non-NaN values; afterwards
/// s[t] = (s[t-1] * (period - 1) + x[t]) / period. A NaN after the seed
/// taints the rest of the series.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }

    let Some(start) = (0..=n - period).find(|&s| values[s..s + period].iter().all(|v| !v.is_nan()))
    else {
        return out;
    };
    let p = period as f64;
    let mut smoothed = values[start..start + period].iter().sum::<f64>() / p;
    out[start + period - 1] = smoothed;

    for (slot, &x) in out.iter_mut().zip(values).skip(start + period) {
        if x.is_nan() {
            break;
        }
        smoothed = (smoothed * (p - 1.0) + x) / p;
        *slot = smoothed;
    }
    out
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut ranges = true_range(bars);
        if let Some(first) = ranges.first_mut() {
            *first = f64::NAN;
        }
        wilder_smooth(&ranges, self.period)
    }
}
