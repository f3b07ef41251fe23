//! Accumulation detector: shakeout, dry-up, explosion (SDE) patterns.
//!
//! A sharp high-volume drop (shakeout) followed by at least three quiet bars
//! (dry-up) marks a candidate. If today is a high-volume surge the move has
//! already happened and the pattern is reported as exploded instead.

use serde::{Deserialize, Serialize};

use crate::benford::{multi_window, AlertLevel, BenfordTest, MultiWindowConfig};
use crate::domain::Bar;
use crate::engine::ExitRules;
use crate::indicators::IndicatorFrame;
use crate::scoring::{
    Explanation, RejectReason, SignalComponent, SignalScore, SignalSource, MIN_SCORING_INDEX,
};

/// First bar index scanned for the pattern.
pub const SDE_MIN_INDEX: usize = 30;
pub const SHAKEOUT_MIN_OFFSET: usize = 5;
pub const SHAKEOUT_MAX_OFFSET: usize = 30;
pub const SHAKEOUT_RETURN: f64 = -0.04;
pub const SHAKEOUT_VOLUME_RATIO: f64 = 1.5;
pub const MIN_DRY_UP_BARS: usize = 3;
pub const DRY_UP_VOLUME_RATIO: f64 = 1.0;
pub const EXPLOSION_RETURN: f64 = 0.05;
pub const EXPLOSION_VOLUME_RATIO: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SdeSignal {
    #[default]
    None,
    /// Shakeout then dry-up, no explosion yet. The buyable state.
    DryingUp,
    /// Full pattern including today's explosion.
    Exploded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SdeDetection {
    pub signal: SdeSignal,
    /// Bars between the shakeout and the evaluated bar; 0 when no pattern.
    pub shakeout_days: usize,
}

fn daily_return(bars: &[Bar], i: usize) -> Option<f64> {
    let prev = bars[i - 1].close;
    (prev > 0.0).then(|| (bars[i].close - prev) / prev)
}

/// Pattern state at bar `i`. The nearest qualifying shakeout wins.
pub fn detect_sde_at(bars: &[Bar], frame: &IndicatorFrame, i: usize) -> SdeDetection {
    if i < SDE_MIN_INDEX || i >= bars.len() {
        return SdeDetection::default();
    }
    let Some(ret) = daily_return(bars, i) else {
        return SdeDetection::default();
    };
    let exploded =
        ret >= EXPLOSION_RETURN && frame.vol_ratio(i).unwrap_or(1.0) >= EXPLOSION_VOLUME_RATIO;

    for offset in SHAKEOUT_MIN_OFFSET..=SHAKEOUT_MAX_OFFSET {
        if offset >= i {
            break;
        }
        let s = i - offset;
        let Some(s_ret) = daily_return(bars, s) else {
            continue;
        };
        if s_ret > SHAKEOUT_RETURN || frame.vol_ratio(s).unwrap_or(1.0) < SHAKEOUT_VOLUME_RATIO {
            continue;
        }
        if i - (s + 1) < MIN_DRY_UP_BARS {
            continue;
        }
        let ratios: Vec<f64> = (s + 1..i).filter_map(|d| frame.vol_ratio(d)).collect();
        if ratios.is_empty() {
            continue;
        }
        let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
        if mean < DRY_UP_VOLUME_RATIO {
            return SdeDetection {
                signal: if exploded {
                    SdeSignal::Exploded
                } else {
                    SdeSignal::DryingUp
                },
                shakeout_days: offset,
            };
        }
    }
    SdeDetection::default()
}

/// Pattern state for every bar.
pub fn detect_sde(bars: &[Bar], frame: &IndicatorFrame) -> Vec<SdeDetection> {
    (0..bars.len()).map(|i| detect_sde_at(bars, frame, i)).collect()
}

/// Gates and exits for accumulation mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccumulationProfile {
    pub rsi_min: f64,
    pub rsi_max: f64,
    /// Largest absolute 5-bar return still considered quiet.
    pub max_change_5d: f64,
    pub vpd_threshold: f64,
    pub vpd_strong: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub max_hold: i64,
    pub cooldown: usize,
}

impl Default for AccumulationProfile {
    fn default() -> Self {
        Self {
            rsi_min: 20.0,
            rsi_max: 85.0,
            max_change_5d: 0.15,
            vpd_threshold: 3.0,
            vpd_strong: 5.0,
            take_profit: 0.10,
            stop_loss: 0.13,
            max_hold: 30,
            cooldown: 10,
        }
    }
}

impl AccumulationProfile {
    pub fn exit_rules(&self) -> ExitRules {
        ExitRules {
            take_profit: self.take_profit,
            stop_loss: self.stop_loss,
            cooldown: self.cooldown,
            max_hold: self.max_hold,
        }
    }
}

const MIN_RANGE_5D: f64 = 0.05;
const MIN_RECOVERY: f64 = 0.03;

#[derive(Debug, Clone, Default)]
pub struct AccumulationScorer {
    profile: AccumulationProfile,
    test: BenfordTest,
    windows: MultiWindowConfig,
}

impl AccumulationScorer {
    pub fn new(profile: AccumulationProfile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }

    pub fn profile(&self) -> &AccumulationProfile {
        &self.profile
    }

    pub fn score(&self, bars: &[Bar], frame: &IndicatorFrame, idx: usize) -> SignalScore {
        if idx < MIN_SCORING_INDEX || idx >= bars.len() {
            return SignalScore::zero();
        }
        let p = &self.profile;
        let close = bars[idx].close;

        if frame
            .rsi(idx)
            .is_some_and(|rsi| rsi < p.rsi_min || rsi > p.rsi_max)
        {
            return SignalScore::zero();
        }

        let base5 = bars[idx - 5].close;
        if base5 > 0.0 && ((close - base5) / base5).abs() > p.max_change_5d {
            return SignalScore::zero();
        }

        let sde = detect_sde_at(bars, frame, idx);
        match sde.signal {
            SdeSignal::Exploded => {
                return SignalScore::rejected(SignalComponent::Rejected {
                    reason: RejectReason::AlreadyExploded,
                    value_pct: None,
                })
            }
            SdeSignal::None => return SignalScore::zero(),
            SdeSignal::DryingUp => {}
        }

        let range = range_5d(bars, idx);
        if range < MIN_RANGE_5D {
            return SignalScore::rejected(SignalComponent::Rejected {
                reason: RejectReason::InactiveDryUp,
                value_pct: Some(range * 100.0),
            });
        }
        let recovery = recovery_from_shakeout(bars, idx, sde.shakeout_days);
        if recovery < MIN_RECOVERY {
            return SignalScore::rejected(SignalComponent::Rejected {
                reason: RejectReason::UnrecoveredLow,
                value_pct: Some(recovery * 100.0),
            });
        }

        let mut score = 5.0;
        let mut explanation = Explanation::new();
        explanation.push(SignalComponent::Shakeout {
            days_ago: sde.shakeout_days,
        });

        let vpd = frame.vpd(idx).unwrap_or(0.0);
        score += if vpd >= p.vpd_strong {
            4.0
        } else if vpd >= p.vpd_threshold {
            2.5
        } else if vpd >= 2.0 {
            1.0
        } else {
            0.0
        };
        explanation.push(SignalComponent::Vpd { value: vpd });

        let volumes: Vec<f64> = bars[idx.saturating_sub(30)..=idx]
            .iter()
            .map(|b| b.volume as f64)
            .collect();
        let alert = multi_window(&self.test, &self.windows, &volumes).alert;
        match alert {
            AlertLevel::Strong => score += 3.0,
            AlertLevel::Possible => score += 1.5,
            AlertLevel::None => {}
        }
        if alert != AlertLevel::None {
            explanation.push(SignalComponent::VolumeAnomaly { alert });
        }

        if let Some(avg) = frame.vol_avg(idx).filter(|a| *a > 0.0) {
            let recent = bars[idx - 9..=idx].iter().map(|b| b.volume as f64).sum::<f64>() / 10.0;
            let ratio = recent / avg;
            if ratio < 0.6 {
                score += 2.0;
            } else if ratio < 0.8 {
                score += 1.0;
            }
            explanation.push(SignalComponent::Compression { ratio });
        }

        if range >= 0.08 && recovery >= 0.07 {
            score += 2.0;
        } else if range >= MIN_RANGE_5D && recovery >= MIN_RECOVERY {
            score += 1.0;
        }
        explanation.push(SignalComponent::Vitality {
            range_pct: range * 100.0,
            recovery_pct: recovery * 100.0,
        });

        SignalScore { score, explanation }
    }
}

impl SignalSource for AccumulationScorer {
    fn name(&self) -> &str {
        "accumulation"
    }

    fn evaluate(&self, bars: &[Bar], frame: &IndicatorFrame, idx: usize) -> SignalScore {
        self.score(bars, frame, idx)
    }
}

/// (high - low) / midpoint over the last five bars.
fn range_5d(bars: &[Bar], idx: usize) -> f64 {
    let window = &bars[idx - 4..=idx];
    let hi = window.iter().map(|b| b.high).fold(0.0, f64::max);
    let lo = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    if hi > 0.0 {
        (hi - lo) / ((hi + lo) / 2.0)
    } else {
        0.0
    }
}

/// Close relative to the lowest low in the four bars starting at the shakeout.
fn recovery_from_shakeout(bars: &[Bar], idx: usize, shakeout_days: usize) -> f64 {
    let s = idx - shakeout_days;
    let low = bars[s..=(s + 3).min(idx)]
        .iter()
        .map(|b| b.low)
        .fold(f64::INFINITY, f64::min);
    if low > 0.0 && low.is_finite() {
        (bars[idx].close - low) / low
    } else {
        0.0
    }
}
