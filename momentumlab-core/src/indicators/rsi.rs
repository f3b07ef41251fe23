//! Wilder RSI over closes.
//!
//! Gains and losses are smoothed with the same Wilder recursion as ATR,
//! seeded from the first `period` close-to-close moves, so the first value
//! sits at index `period`. A window with no losses reads 100.

use super::atr::wilder_smooth;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "rsi period is zero");
        Self {
            name: format!("rsi{period}"),
            period,
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let gains = wilder_smooth(&moves(bars, 1.0), self.period);
        let losses = wilder_smooth(&moves(bars, -1.0), self.period);
        gains
            .iter()
            .zip(&losses)
            .map(|(&g, &l)| relative_strength_index(g, l))
            .collect()
    }
}

/// Positive part of `sign × Δclose`. Slot 0 has no prior close and is NaN
/// so the smoothing seed starts at bar 1.
fn moves(bars: &[Bar], sign: f64) -> Vec<f64> {
    std::iter::once(f64::NAN)
        .chain(bars.windows(2).map(|w| (sign * (w[1].close - w[0].close)).max(0.0)))
        .take(bars.len())
        .collect()
}

fn relative_strength_index(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        f64::NAN
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn steady_climb_reads_100() {
        let closes: Vec<f64> = (0..18).map(|i| 50.0 + 0.5 * i as f64).collect();
        let rsi = Rsi::new(14).compute(&make_bars(&closes));
        assert!(rsi[..14].iter().all(|v| v.is_nan()));
        assert!(rsi[14..].iter().all(|&v| (v - 100.0).abs() < 1e-9));
    }

    #[test]
    fn steady_decline_reads_zero() {
        let rsi = Rsi::new(2).compute(&make_bars(&[10.0, 9.0, 8.5, 8.0]));
        assert_approx(rsi[2], 0.0, 1e-9);
        assert_approx(rsi[3], 0.0, 1e-9);
    }

    #[test]
    fn seed_then_wilder_step() {
        // moves +2, -1, +1, -3
        let rsi = Rsi::new(2).compute(&make_bars(&[20.0, 22.0, 21.0, 22.0, 19.0]));
        // gains 1.0 / losses 0.5 → rs 2
        assert_approx(rsi[2], 100.0 - 100.0 / 3.0, 1e-9);
        // gains (1 + 1)/2 = 1, losses (0.5 + 0)/2 = 0.25 → rs 4
        assert_approx(rsi[3], 80.0, 1e-9);
        // gains 0.5, losses (0.25 + 3)/2 = 1.625
        let rs = 0.5 / 1.625;
        assert_approx(rsi[4], 100.0 - 100.0 / (1.0 + rs), 1e-9);
    }

    #[test]
    fn stays_within_bounds() {
        let bars = make_bars(&[30.0, 33.0, 29.0, 35.0, 28.0, 36.0, 27.0, 38.0]);
        for v in Rsi::new(3).compute(&bars).into_iter().filter(|v| !v.is_nan()) {
            assert!((0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn too_short_for_a_value() {
        assert!(Rsi::new(3).compute(&make_bars(&[1.0, 2.0, 3.0])).iter().all(|v| v.is_nan()));
        assert!(Rsi::new(3).compute(&[]).is_empty());
    }
}
