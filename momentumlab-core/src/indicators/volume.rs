//! Volume average and volume ratio over a trailing window (current bar included).

use super::sma::rolling_mean;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeOutput {
    Average,
    Ratio,
}

#[derive(Debug, Clone)]
pub struct Volume {
    period: usize,
    output: VolumeOutput,
    name: String,
}

impl Volume {
    pub fn average(period: usize) -> Self {
        Self::new(period, VolumeOutput::Average)
    }

    pub fn ratio(period: usize) -> Self {
        Self::new(period, VolumeOutput::Ratio)
    }

    fn new(period: usize, output: VolumeOutput) -> Self {
        assert!(period >= 1, "volume period must be >= 1");
        let tag = match output {
            VolumeOutput::Average => "avg",
            VolumeOutput::Ratio => "ratio",
        };
        Self {
            period,
            output,
            name: format!("vol_{tag}_{period}"),
        }
    }
}

/// Current volume divided by its trailing average; NaN when the average is
/// undefined or zero.
pub fn volume_ratio(bars: &[Bar], average: &[f64]) -> Vec<f64> {
    bars.iter()
        .zip(average)
        .map(|(b, &avg)| {
            if avg.is_nan() || avg <= 0.0 {
                f64::NAN
            } else {
                b.volume as f64 / avg
            }
        })
        .collect()
}

impl Indicator for Volume {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();
        let average = rolling_mean(&volumes, self.period);
        match self.output {
            VolumeOutput::Average => average,
            VolumeOutput::Ratio => volume_ratio(bars, &average),
        }
    }
}
