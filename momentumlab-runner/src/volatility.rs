//! Realised volatility, volatility bands and automatic profile selection.

use std::fmt;

use serde::{Deserialize, Serialize};

use momentumlab_core::domain::{Bar, Profile, ProfileName};

/// Below this average true-range percent a security trades like a large cap.
pub const LARGE_CAP_MAX_VOLATILITY: f64 = 2.5;

/// Mean of true range over the previous close, in percent, across the
/// whole series. Zero for fewer than two bars.
pub fn average_true_range_pct(bars: &[Bar]) -> f64 {
    let ratios: Vec<f64> = bars
        .windows(2)
        .filter(|w| w[0].close > 0.0)
        .map(|w| {
            let (prev, bar) = (&w[0], &w[1]);
            let tr = (bar.high - bar.low)
                .max((bar.high - prev.close).abs())
                .max((bar.low - prev.close).abs());
            tr / prev.close
        })
        .collect();
    if ratios.is_empty() {
        return 0.0;
    }
    ratios.iter().sum::<f64>() / ratios.len() as f64 * 100.0
}

/// Volatility band of a security, each with its own exit candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityBand {
    VeryLow,
    Low,
    Medium,
    High,
}

impl VolatilityBand {
    pub fn classify(daily_volatility_pct: f64) -> Self {
        if daily_volatility_pct < 1.5 {
            Self::VeryLow
        } else if daily_volatility_pct < 2.5 {
            Self::Low
        } else if daily_volatility_pct < 4.0 {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn take_profits(&self) -> &'static [f64] {
        match self {
            Self::VeryLow => &[0.02, 0.03, 0.04, 0.06, 0.08, 0.10],
            Self::Low => &[0.03, 0.04, 0.06, 0.08, 0.10, 0.13],
            Self::Medium => &[0.04, 0.06, 0.08, 0.10, 0.15, 0.21],
            Self::High => &[0.05, 0.08, 0.10, 0.15, 0.21, 0.30],
        }
    }

    pub fn stop_losses(&self) -> &'static [f64] {
        match self {
            Self::VeryLow => &[0.03, 0.05, 0.07, 0.10],
            Self::Low => &[0.04, 0.06, 0.08, 0.10],
            Self::Medium => &[0.05, 0.07, 0.10, 0.13],
            Self::High => &[0.07, 0.10, 0.13, 0.15],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryLow => "very low (daily < 1.5%)",
            Self::Low => "low (daily < 2.5%)",
            Self::Medium => "medium (daily < 4%)",
            Self::High => "high (daily >= 4%)",
        }
    }
}

impl fmt::Display for VolatilityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Volatility-based profile: `large_cap` when calm, `default` otherwise.
pub fn auto_profile(bars: &[Bar]) -> ProfileName {
    if average_true_range_pct(bars) < LARGE_CAP_MAX_VOLATILITY {
        ProfileName::LargeCap
    } else {
        ProfileName::Default
    }
}

/// A fixed profile, or one picked per security from its volatility.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileSelection {
    Auto,
    Fixed(Profile),
}

impl ProfileSelection {
    /// `auto` (any case) selects per security; anything else is a profile
    /// name, with unknown names falling back to `default`.
    pub fn parse(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("auto") {
            Self::Auto
        } else {
            Self::Fixed(Profile::by_name(name.trim()))
        }
    }

    pub fn resolve(&self, bars: &[Bar]) -> Profile {
        match self {
            Self::Auto => Profile::new(auto_profile(bars)),
            Self::Fixed(p) => p.clone(),
        }
    }
}
