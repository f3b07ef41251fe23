//! Ichimoku components.
//!
//! - tenkan: midpoint of the 9-bar high/low (index >= 8)
//! - kijun: midpoint of the 26-bar high/low (index >= 25)
//! - cloud A: (tenkan + kijun) / 2 of the bar 26 positions earlier (index >= 51)
//! - cloud B: midpoint of the 52-bar high/low ending 26 bars earlier (index >= 77)
//!
//! The cloud values are what is plotted *at* bar i, so nothing here looks ahead.

use super::Indicator;
use crate::domain::Bar;

pub const TENKAN_PERIOD: usize = 9;
pub const KIJUN_PERIOD: usize = 26;
pub const SENKOU_B_PERIOD: usize = 52;
pub const DISPLACEMENT: usize = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IchimokuLine {
    Tenkan,
    Kijun,
    CloudA,
    CloudB,
}

#[derive(Debug, Clone)]
pub struct Ichimoku {
    line: IchimokuLine,
    name: String,
}

impl Ichimoku {
    pub fn new(line: IchimokuLine) -> Self {
        let name = match line {
            IchimokuLine::Tenkan => "ichimoku_tenkan",
            IchimokuLine::Kijun => "ichimoku_kijun",
            IchimokuLine::CloudA => "ichimoku_cloud_a",
            IchimokuLine::CloudB => "ichimoku_cloud_b",
        };
        Self {
            line,
            name: name.to_string(),
        }
    }
}

/// (max high + min low) / 2 over `len` bars ending at `end` (inclusive).
pub fn range_midpoint(bars: &[Bar], end: usize, len: usize) -> f64 {
    let window = &bars[end + 1 - len..=end];
    let high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    (high + low) / 2.0
}

fn midline(bars: &[Bar], len: usize) -> Vec<f64> {
    (0..bars.len())
        .map(|i| {
            if i + 1 >= len {
                range_midpoint(bars, i, len)
            } else {
                f64::NAN
            }
        })
        .collect()
}

impl Indicator for Ichimoku {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        match self.line {
            IchimokuLine::Tenkan => TENKAN_PERIOD - 1,
            IchimokuLine::Kijun => KIJUN_PERIOD - 1,
            IchimokuLine::CloudA => KIJUN_PERIOD - 1 + DISPLACEMENT,
            IchimokuLine::CloudB => SENKOU_B_PERIOD - 1 + DISPLACEMENT,
        }
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        match self.line {
            IchimokuLine::Tenkan => midline(bars, TENKAN_PERIOD),
            IchimokuLine::Kijun => midline(bars, KIJUN_PERIOD),
            IchimokuLine::CloudA => {
                let tenkan = midline(bars, TENKAN_PERIOD);
                let kijun = midline(bars, KIJUN_PERIOD);
                (0..bars.len())
                    .map(|i| {
                        if i >= self.lookback() {
                            let j = i - DISPLACEMENT;
                            (tenkan[j] + kijun[j]) / 2.0
                        } else {
                            f64::NAN
                        }
                    })
                    .collect()
            }
            IchimokuLine::CloudB => (0..bars.len())
                .map(|i| {
                    if i >= self.lookback() {
                        range_midpoint(bars, i - DISPLACEMENT, SENKOU_B_PERIOD)
                    } else {
                        f64::NAN
                    }
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    fn rising(n: usize) -> Vec<Bar> {
        make_bars(&(0..n).map(|i| 100.0 + i as f64).collect::<Vec<_>>())
    }

    #[test]
    fn warmups() {
        let bars = rising(90);
        let tenkan = Ichimoku::new(IchimokuLine::Tenkan).compute(&bars);
        let kijun = Ichimoku::new(IchimokuLine::Kijun).compute(&bars);
        let a = Ichimoku::new(IchimokuLine::CloudA).compute(&bars);
        let b = Ichimoku::new(IchimokuLine::CloudB).compute(&bars);
        assert!(tenkan[7].is_nan() && !tenkan[8].is_nan());
        assert!(kijun[24].is_nan() && !kijun[25].is_nan());
        assert!(a[50].is_nan() && !a[51].is_nan());
        assert!(b[76].is_nan() && !b[77].is_nan());
    }

    #[test]
    fn tenkan_is_nine_bar_midpoint() {
        // make_bars: high = max(open, close) + 1, low = min(open, close) - 1
        let bars = rising(9);
        let tenkan = Ichimoku::new(IchimokuLine::Tenkan).compute(&bars);
        // highs up to 109, lows down to 99
        assert_approx(tenkan[8], (109.0 + 99.0) / 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn cloud_a_is_displaced() {
        let bars = rising(60);
        let tenkan = Ichimoku::new(IchimokuLine::Tenkan).compute(&bars);
        let kijun = Ichimoku::new(IchimokuLine::Kijun).compute(&bars);
        let a = Ichimoku::new(IchimokuLine::CloudA).compute(&bars);
        assert_approx(a[55], (tenkan[29] + kijun[29]) / 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn cloud_b_uses_window_ending_26_back() {
        let bars = rising(80);
        let b = Ichimoku::new(IchimokuLine::CloudB).compute(&bars);
        assert_approx(b[79], range_midpoint(&bars, 53, 52), DEFAULT_EPSILON);
    }
}
