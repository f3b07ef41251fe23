//! Bollinger bands over closes: SMA ± k·σ, σ the sample standard deviation.
//!
//! Each band is its own [`Indicator`]; the first value lands at `period − 1`.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

impl BollingerBand {
    fn sign(self) -> f64 {
        match self {
            Self::Upper => 1.0,
            Self::Middle => 0.0,
            Self::Lower => -1.0,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Self::Upper => "up",
            Self::Middle => "mid",
            Self::Lower => "low",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    k: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    pub fn new(period: usize, k: f64, band: BollingerBand) -> Self {
        assert!(period > 1, "bollinger period needs two closes");
        Self {
            name: format!("bb{period}_{}", band.tag()),
            period,
            k,
            band,
        }
    }

    pub fn upper(period: usize, k: f64) -> Self {
        Self::new(period, k, BollingerBand::Upper)
    }

    pub fn middle(period: usize, k: f64) -> Self {
        Self::new(period, k, BollingerBand::Middle)
    }

    pub fn lower(period: usize, k: f64) -> Self {
        Self::new(period, k, BollingerBand::Lower)
    }
}

/// Mean and sample standard deviation of the closes in `window`.
fn mean_sd(window: &[Bar]) -> (f64, f64) {
    let n = window.len() as f64;
    let mean = window.iter().map(|b| b.close).sum::<f64>() / n;
    let ss: f64 = window.iter().map(|b| (b.close - mean).powi(2)).sum();
    (mean, (ss / (n - 1.0)).sqrt())
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut out = vec![f64::NAN; bars.len()];
        let sign = self.band.sign();
        for (slot, window) in out[self.lookback().min(bars.len())..]
            .iter_mut()
            .zip(bars.windows(self.period))
        {
            let (mean, sd) = mean_sd(window);
            *slot = mean + sign * self.k * sd;
        }
        out
    }
}
