//! Benford anomaly detector.
//!
//! Compares the leading-digit distribution of a sequence (volumes, absolute
//! price changes) with Benford's law using a chi-squared statistic, and maps
//! the statistic onto a bounded `[0, 1)` anomaly score:
//! `score = 1 - 1 / (1 + chi2 / scale)`.
//!
//! Too few usable digits is not an error: the statistic and score are 0.

use serde::{Deserialize, Serialize};

/// Expected frequency of leading digit `d` (1..=9): log10(1 + 1/d).
pub fn expected_frequency(d: u8) -> f64 {
    (1.0 + 1.0 / d as f64).log10()
}

/// Leading significant digit of `x`, ignoring sign and magnitude.
pub fn first_digit(x: f64) -> Option<u8> {
    let mut v = x.abs();
    if v == 0.0 || !v.is_finite() {
        return None;
    }
    while v < 1.0 {
        v *= 10.0;
    }
    while v >= 10.0 {
        v /= 10.0;
    }
    let d = v.floor() as u8;
    (1..=9).contains(&d).then_some(d)
}

/// Chi-squared scale and sample floor for a single test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenfordTest {
    /// Divisor mapping chi-squared onto the anomaly score.
    pub scale: f64,
    /// Minimum usable digits before a statistic is reported.
    pub min_digits: usize,
}

impl Default for BenfordTest {
    fn default() -> Self {
        Self {
            scale: 15.0,
            min_digits: 5,
        }
    }
}

/// Chi-squared statistic and derived anomaly score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BenfordScore {
    pub chi2: f64,
    pub score: f64,
}

impl BenfordTest {
    pub fn chi_squared(&self, values: &[f64]) -> f64 {
        let digits: Vec<u8> = values.iter().filter_map(|&v| first_digit(v)).collect();
        if digits.len() < self.min_digits {
            return 0.0;
        }
        let mut observed = [0usize; 9];
        for d in &digits {
            observed[(*d - 1) as usize] += 1;
        }
        let n = digits.len() as f64;
        (1..=9u8)
            .map(|d| {
                let expected = expected_frequency(d) * n;
                let diff = observed[(d - 1) as usize] as f64 - expected;
                diff * diff / expected
            })
            .sum()
    }

    /// Anomaly score for a given statistic; non-decreasing in `chi2`.
    pub fn score_from_chi2(&self, chi2: f64) -> f64 {
        1.0 - 1.0 / (1.0 + chi2 / self.scale)
    }

    pub fn deviation(&self, values: &[f64]) -> BenfordScore {
        let chi2 = self.chi_squared(values);
        BenfordScore {
            chi2,
            score: self.score_from_chi2(chi2),
        }
    }

    /// Score of the last `window` volumes; 0 when fewer are available.
    pub fn analyze_volume(&self, volumes: &[f64], window: usize) -> f64 {
        if volumes.len() < window {
            return 0.0;
        }
        self.deviation(&volumes[volumes.len() - window..]).score
    }

    /// Score of the non-zero absolute close-to-close changes over the last
    /// `window + 1` prices.
    pub fn analyze_price_change(&self, prices: &[f64], window: usize) -> f64 {
        if prices.len() < window + 1 {
            return 0.0;
        }
        let tail = &prices[prices.len() - (window + 1)..];
        let changes: Vec<f64> = tail
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .filter(|c| *c > 0.0)
            .collect();
        if changes.len() < self.min_digits {
            return 0.0;
        }
        self.deviation(&changes).score
    }
}

/// Multi-window anomaly verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    None,
    /// Long window deviates, short windows do not.
    Possible,
    /// Long window and at least one short window deviate.
    Strong,
}

/// Window sweep thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiWindowConfig {
    pub windows: Vec<usize>,
    pub long_window: usize,
    pub long_chi2: f64,
    pub short_windows: Vec<usize>,
    pub short_chi2: f64,
}

impl Default for MultiWindowConfig {
    fn default() -> Self {
        Self {
            windows: vec![5, 7, 10, 15, 30],
            long_window: 30,
            long_chi2: 20.0,
            short_windows: vec![5, 7, 10],
            short_chi2: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiWindowResult {
    /// (window, chi-squared) pairs in sweep order.
    pub chi2: Vec<(usize, f64)>,
    pub alert: AlertLevel,
}

impl MultiWindowResult {
    pub fn chi2_for(&self, window: usize) -> f64 {
        self.chi2
            .iter()
            .find(|(w, _)| *w == window)
            .map(|(_, c)| *c)
            .unwrap_or(0.0)
    }
}

/// Sweep the configured windows over the tail of `volumes`.
pub fn multi_window(
    test: &BenfordTest,
    config: &MultiWindowConfig,
    volumes: &[f64],
) -> MultiWindowResult {
    let chi2: Vec<(usize, f64)> = config
        .windows
        .iter()
        .map(|&w| {
            if volumes.len() < w || volumes.len() < test.min_digits {
                return (w, 0.0);
            }
            let recent: Vec<f64> = volumes[volumes.len() - w..]
                .iter()
                .copied()
                .filter(|v| *v > 0.0)
                .collect();
            if recent.len() < test.min_digits {
                (w, 0.0)
            } else {
                (w, test.chi_squared(&recent))
            }
        })
        .collect();

    let mut result = MultiWindowResult {
        chi2,
        alert: AlertLevel::None,
    };
    let long = result.chi2_for(config.long_window) > config.long_chi2;
    let short = config
        .short_windows
        .iter()
        .any(|&w| result.chi2_for(w) > config.short_chi2);
    result.alert = match (long, short) {
        (true, true) => AlertLevel::Strong,
        (true, false) => AlertLevel::Possible,
        _ => AlertLevel::None,
    };
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_frequencies_sum_to_one() {
        let total: f64 = (1..=9).map(expected_frequency).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!((expected_frequency(1) - 0.30103).abs() < 1e-5);
    }

    #[test]
    fn first_digit_normalizes() {
        assert_eq!(first_digit(0.00452), Some(4));
        assert_eq!(first_digit(-98_000.0), Some(9));
        assert_eq!(first_digit(1.0), Some(1));
        assert_eq!(first_digit(0.0), None);
        assert_eq!(first_digit(f64::NAN), None);
    }

    #[test]
    fn too_few_digits_is_neutral() {
        let t = BenfordTest::default();
        let s = t.deviation(&[1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);
        assert_eq!(s.chi2, 0.0);
        assert_eq!(s.score, 0.0);
    }

    #[test]
    fn all_same_digit_is_anomalous() {
        let t = BenfordTest::default();
        let s = t.deviation(&[7.0, 71.0, 700.0, 7.5, 0.72, 7000.0, 77.0, 7.9]);
        assert!(s.chi2 > 20.0);
        assert!(s.score > 0.5 && s.score < 1.0);
    }

    #[test]
    fn score_monotone_in_chi2() {
        let t = BenfordTest::default();
        let mut prev = t.score_from_chi2(0.0);
        assert_eq!(prev, 0.0);
        for k in 1..100 {
            let s = t.score_from_chi2(k as f64 * 0.7);
            assert!(s >= prev);
            prev = s;
        }
    }

    #[test]
    fn volume_window_requires_history() {
        let t = BenfordTest::default();
        assert_eq!(t.analyze_volume(&[100.0; 10], 15), 0.0);
        // all "1" leading digits over the last 10
        assert!(t.analyze_volume(&[100.0; 10], 10) > 0.0);
    }

    #[test]
    fn price_change_ignores_flat_days() {
        let t = BenfordTest::default();
        let flat = [10.0; 12];
        assert_eq!(t.analyze_price_change(&flat, 10), 0.0);
        let steps: Vec<f64> = (0..12).map(|i| 100.0 + i as f64 * 5.0).collect();
        assert!(t.analyze_price_change(&steps, 10) > 0.5);
    }

    #[test]
    fn multi_window_strong_alert() {
        let vols = vec![5_000.0; 31];
        let r = multi_window(&BenfordTest::default(), &MultiWindowConfig::default(), &vols);
        assert!(r.chi2_for(30) > 20.0);
        assert!(r.chi2_for(5) > 15.0);
        assert_eq!(r.alert, AlertLevel::Strong);
    }

    #[test]
    fn multi_window_short_history() {
        let vols = vec![5_000.0; 8];
        let r = multi_window(&BenfordTest::default(), &MultiWindowConfig::default(), &vols);
        assert_eq!(r.chi2_for(30), 0.0);
        assert_eq!(r.chi2_for(10), 0.0);
        assert!(r.chi2_for(5) > 15.0);
        assert_eq!(r.alert, AlertLevel::None);
    }
}
