//! Trailing simple moving average of closes; `ma{period}` in the frame.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "sma period is zero");
        Self {
            period,
            name: format!("ma{period}"),
        }
    }
}

/// Trailing mean of `values` over `period`, NaN until the window is full.
///
/// Each window is summed afresh so long series do not accumulate drift.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    for (slot, window) in out.iter_mut().skip(period - 1).zip(values.windows(period)) {
        *slot = window.iter().sum::<f64>() / period as f64;
    }
    out
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        rolling_mean(&closes, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn three_bar_average() {
        let ma = Sma::new(3).compute(&make_bars(&[3.0, 6.0, 9.0, 3.0, 0.5]));
        assert!(ma[0].is_nan() && ma[1].is_nan());
        assert_approx(ma[2], 6.0, DEFAULT_EPSILON);
        assert_approx(ma[3], 6.0, DEFAULT_EPSILON);
        assert_approx(ma[4], 12.5 / 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn unit_period_tracks_close() {
        let closes = [42.0, 17.0, 99.0];
        let ma = Sma::new(1).compute(&make_bars(&closes));
        for (got, want) in ma.iter().zip(closes) {
            assert_approx(*got, want, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn naming_and_warm_up() {
        let ma = Sma::new(60);
        assert_eq!(ma.name(), "ma60");
        assert_eq!(ma.lookback(), 59);
        assert!(ma.compute(&make_bars(&[1.0; 59])).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rolling_mean_on_raw_values() {
        let out = rolling_mean(&[100.0, 300.0, 200.0], 2);
        assert!(out[0].is_nan());
        assert_approx(out[1], 200.0, DEFAULT_EPSILON);
        assert_approx(out[2], 250.0, DEFAULT_EPSILON);
        assert!(rolling_mean(&[1.0], 0).iter().all(|v| v.is_nan()));
    }
}
