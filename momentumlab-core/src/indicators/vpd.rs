//! Volume-Price Divergence (VPD): volume surge relative to price movement.
//!
//! VPD = min(volume_ratio / max(|daily change %|, 0.1), 20).
//! Bars with a volume ratio below 0.5 carry VPD 0. Undefined at index 0 or
//! when the volume ratio is undefined.

use super::volume::Volume;
use super::Indicator;
use crate::domain::Bar;

pub const VPD_MIN_CHANGE_PCT: f64 = 0.1;
pub const VPD_CAP: f64 = 20.0;
pub const VPD_MIN_VOLUME_RATIO: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct Vpd {
    volume_period: usize,
}

impl Vpd {
    pub fn new(volume_period: usize) -> Self {
        Self { volume_period }
    }
}

/// VPD from a precomputed volume-ratio series.
pub fn vpd_from_ratio(bars: &[Bar], volume_ratio: &[f64]) -> Vec<f64> {
    let mut result = vec![f64::NAN; bars.len()];
    for i in 1..bars.len() {
        let vr = volume_ratio[i];
        let prev_close = bars[i - 1].close;
        if vr.is_nan() || prev_close <= 0.0 {
            continue;
        }
        if vr < VPD_MIN_VOLUME_RATIO {
            result[i] = 0.0;
            continue;
        }
        let change_pct = ((bars[i].close - prev_close) / prev_close * 100.0)
            .abs()
            .max(VPD_MIN_CHANGE_PCT);
        result[i] = (vr / change_pct).min(VPD_CAP);
    }
    result
}

impl Indicator for Vpd {
    fn name(&self) -> &str {
        "vpd"
    }

    fn lookback(&self) -> usize {
        self.volume_period.saturating_sub(1).max(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let ratio = Volume::ratio(self.volume_period).compute(bars);
        vpd_from_ratio(bars, &ratio)
    }
}
