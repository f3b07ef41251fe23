//! Momentum signal scorer.
//!
//! Five mandatory gates, a 5.0 base, weighted sub-signals and a Benford
//! multiplier. A failed gate yields score 0 with an empty explanation.

pub mod explanation;

pub use explanation::{
    CloudPosition, ComponentKind, Explanation, MacdState, RejectReason, RsiTier, SignalComponent,
    VolumeBand,
};

use serde::{Deserialize, Serialize};

use crate::benford::BenfordTest;
use crate::domain::{Bar, Profile};
use crate::indicators::IndicatorFrame;

/// First bar index the scorers will evaluate.
pub const MIN_SCORING_INDEX: usize = 60;
pub const BASE_SCORE: f64 = 5.0;
pub const MACD_CAP: f64 = 1.0;
/// Multipliers above this are surfaced in the explanation.
pub const BENFORD_REPORT_FLOOR: f64 = 1.03;
const HIGH_LOOKBACK: usize = 20;
const RETURN_LOOKBACK: usize = 20;
const MA60_SLOPE_LOOKBACK: usize = 20;
const MA60_SLOPE_MIN: f64 = 0.02;
const BREAKOUT_RATIO: f64 = 0.99;
const MAX_STREAK_LOOKBACK: usize = 8;

/// Caller-tunable Benford parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenfordParams {
    /// Cap on the multiplier's contribution (fraction, e.g. 0.15).
    pub influence: f64,
    /// Window length in bars.
    pub window: usize,
    /// Minimum window length actually analysed.
    pub min_hits: usize,
}

impl Default for BenfordParams {
    fn default() -> Self {
        Self {
            influence: 0.15,
            window: 30,
            min_hits: 5,
        }
    }
}

/// Score and its explanation for one bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalScore {
    pub score: f64,
    pub explanation: Explanation,
}

impl SignalScore {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Zero score that still carries a reason.
    pub fn rejected(component: SignalComponent) -> Self {
        let mut explanation = Explanation::new();
        explanation.push(component);
        Self {
            score: 0.0,
            explanation,
        }
    }
}

/// Anything that can turn a bar into an entry score.
///
/// Implementations only read bars and indicator values; they never see open
/// positions or trade history.
pub trait SignalSource: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, bars: &[Bar], frame: &IndicatorFrame, idx: usize) -> SignalScore;
}

/// Momentum scorer for a fixed profile and Benford setting.
#[derive(Debug, Clone)]
pub struct SignalScorer {
    profile: Profile,
    benford: BenfordParams,
    test: BenfordTest,
}

impl SignalScorer {
    pub fn new(profile: Profile, benford: BenfordParams) -> Self {
        Self {
            profile,
            benford,
            test: BenfordTest::default(),
        }
    }

    pub fn with_benford_test(mut self, test: BenfordTest) -> Self {
        self.test = test;
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn score(&self, bars: &[Bar], frame: &IndicatorFrame, idx: usize) -> SignalScore {
        if idx < MIN_SCORING_INDEX || idx >= bars.len() {
            return SignalScore::zero();
        }
        let p = &self.profile;
        let bar = &bars[idx];

        // ── Mandatory gates ──
        let (Some(ma5), Some(ma20), Some(ma60)) = (frame.ma5(idx), frame.ma20(idx), frame.ma60(idx))
        else {
            return SignalScore::zero();
        };
        if !(ma5 > ma20 && ma20 > ma60) {
            return SignalScore::zero();
        }

        let high20 = trailing_high(bars, idx, HIGH_LOOKBACK);
        if high20 <= 0.0 {
            return SignalScore::zero();
        }
        let dist_from_high = (high20 - bar.close) / high20;
        if dist_from_high > p.high_dist_max {
            return SignalScore::zero();
        }

        let lookback = p.ma20_slope_lookback;
        if idx < lookback {
            return SignalScore::zero();
        }
        let ma20_slope = match frame.ma20(idx - lookback) {
            Some(prev) if prev > 0.0 => (ma20 - prev) / prev,
            _ => return SignalScore::zero(),
        };
        if ma20_slope < p.ma20_slope_min {
            return SignalScore::zero();
        }

        if !bar.is_bullish() {
            return SignalScore::zero();
        }

        let vol_ratio = frame.vol_ratio(idx);
        if vol_ratio.is_some_and(|vr| vr > p.vol_overheat) {
            return SignalScore::zero();
        }

        // ── Weighted additions ──
        let mut score = BASE_SCORE;
        let mut explanation = Explanation::new();
        explanation.push(SignalComponent::Core {
            dist_from_high_pct: dist_from_high * 100.0,
            ma20_slope_pct: ma20_slope * 100.0,
        });

        if let Some(rsi) = frame.rsi(idx) {
            let (points, tier) = rsi_points(rsi);
            score += points;
            explanation.push(SignalComponent::Rsi { value: rsi, tier });
        }

        let (macd_points, macd_state) = macd_points(frame, idx);
        score += macd_points.min(MACD_CAP);
        if let Some(state) = macd_state {
            explanation.push(SignalComponent::Macd { state });
        }

        let base20 = bars[idx - RETURN_LOOKBACK].close;
        if base20 > 0.0 {
            let ret20 = (bar.close - base20) / base20;
            let points = if ret20 > p.ret20_strong {
                0.5
            } else if ret20 > p.ret20_mid {
                0.3
            } else if ret20 > p.ret20_weak {
                0.2
            } else {
                0.0
            };
            if points > 0.0 {
                score += points;
                explanation.push(SignalComponent::Return20 { pct: ret20 * 100.0 });
            }
        }

        if let Some(vr) = vol_ratio {
            if let Some((points, band)) = volume_points(p, vr) {
                score += points;
                explanation.push(SignalComponent::Volume { ratio: vr, band });
            }
        }

        if frame.is_bullish_engulfing(idx) {
            score += 1.0;
            explanation.push(SignalComponent::Candle);
        }

        let streak = up_streak(bars, idx);
        if (2..=5).contains(&streak) {
            score += 0.5;
            explanation.push(SignalComponent::Streak { days: streak });
        } else if streak > 5 {
            score -= 0.5;
            explanation.push(SignalComponent::Streak { days: streak });
        }

        if bar.close >= high20 * BREAKOUT_RATIO {
            score += 0.5;
            explanation.push(SignalComponent::Breakout);
        }

        if let Some(prev) = frame.ma60(idx - MA60_SLOPE_LOOKBACK).filter(|v| *v > 0.0) {
            let slope = (ma60 - prev) / prev;
            if slope > MA60_SLOPE_MIN {
                score += 1.5;
                explanation.push(SignalComponent::LongTrend {
                    ma60_slope_pct: slope * 100.0,
                });
            }
        }

        if let Some(ma200) = frame.ma200(idx).filter(|v| *v > 0.0) {
            score += if bar.close > ma200 { 1.5 } else { -1.5 };
            explanation.push(SignalComponent::Ma200 {
                gap_pct: (bar.close / ma200 - 1.0) * 100.0,
            });
        }

        if let Some((points, component)) = ichimoku_points(frame, idx, bar.close) {
            score += points;
            explanation.push(component);
        }

        let multiplier = self.benford_multiplier(bars, idx);
        if multiplier > BENFORD_REPORT_FLOOR {
            explanation.push(SignalComponent::Benford { multiplier });
        }

        SignalScore {
            score: score * multiplier,
            explanation,
        }
    }

    /// Benford multiplier (>= 1.0) for bar `idx`.
    pub fn benford_multiplier(&self, bars: &[Bar], idx: usize) -> f64 {
        let bp = &self.benford;
        let window = if bp.window == 0 { 30 } else { bp.window };

        if self.profile.is_force_following() {
            let bw = self.profile.benford_weight.min(bp.influence);
            let short = window.min(15);
            let long = 60.min(idx + 1);
            let start = idx.saturating_sub(long);
            let volumes: Vec<f64> = bars[start..=idx].iter().map(|b| b.volume as f64).collect();
            let prices: Vec<f64> = bars[start..=idx].iter().map(|b| b.close).collect();

            let vol_short = self.test.analyze_volume(
                &volumes[volumes.len().saturating_sub(short)..],
                short.max(bp.min_hits),
            );
            let vol_long = self.test.analyze_volume(&volumes, long.max(bp.min_hits));
            let pc_short = self.test.analyze_price_change(
                &prices[prices.len().saturating_sub(short + 1)..],
                short.max(bp.min_hits),
            );
            let combined = (vol_short * 2.0 + vol_long + pc_short) / 4.0;
            1.0 + (combined * bw * 2.0).min(bw * 2.0)
        } else {
            let eff = window.max(bp.min_hits);
            let start = idx.saturating_sub(eff);
            let volumes: Vec<f64> = bars[start..=idx].iter().map(|b| b.volume as f64).collect();
            let prices: Vec<f64> = bars[start..=idx].iter().map(|b| b.close).collect();
            let vol_score = self.test.analyze_volume(&volumes, eff);
            let pc_score = self.test.analyze_price_change(&prices, eff);
            1.0 + ((vol_score + pc_score) * self.profile.benford_weight).min(bp.influence)
        }
    }
}

impl SignalSource for SignalScorer {
    fn name(&self) -> &str {
        "momentum"
    }

    fn evaluate(&self, bars: &[Bar], frame: &IndicatorFrame, idx: usize) -> SignalScore {
        self.score(bars, frame, idx)
    }
}

/// Highest high over `bars[idx - lookback ..= idx]` (clamped at 0).
pub fn trailing_high(bars: &[Bar], idx: usize, lookback: usize) -> f64 {
    bars[idx.saturating_sub(lookback)..=idx]
        .iter()
        .map(|b| b.high)
        .fold(0.0, f64::max)
}

fn rsi_points(rsi: f64) -> (f64, RsiTier) {
    if rsi >= 80.0 {
        (2.5, RsiTier::Extreme)
    } else if rsi >= 70.0 {
        (2.0, RsiTier::Strong)
    } else if rsi >= 60.0 {
        (1.0, RsiTier::Building)
    } else if rsi >= 50.0 {
        (0.5, RsiTier::Mild)
    } else if rsi >= 40.0 {
        (0.0, RsiTier::Neutral)
    } else {
        (-1.0, RsiTier::Weak)
    }
}

/// Uncapped MACD points and the most notable state.
fn macd_points(frame: &IndicatorFrame, idx: usize) -> (f64, Option<MacdState>) {
    let mut points = 0.0;
    let mut state = None;

    if let Some(hist) = frame.macd_hist(idx).filter(|h| *h > 0.0) {
        points += 1.0;
        if frame.macd_hist(idx - 1).is_some_and(|prev| hist > prev) {
            points += 0.5;
            state = Some(MacdState::Accelerating);
        } else {
            state = Some(MacdState::Positive);
        }
    }

    if let (Some(m), Some(s), Some(pm), Some(ps)) = (
        frame.macd(idx),
        frame.macd_signal(idx),
        frame.macd(idx - 1),
        frame.macd_signal(idx - 1),
    ) {
        if m > s && pm <= ps {
            points += 1.5;
            state = Some(MacdState::GoldenCross);
        }
    }

    (points, state)
}

fn volume_points(p: &Profile, vr: f64) -> Option<(f64, VolumeBand)> {
    if p.is_force_following() {
        if (3.0..=7.0).contains(&vr) {
            Some((0.5, VolumeBand::Accumulation))
        } else if (1.5..3.0).contains(&vr) {
            Some((0.3, VolumeBand::Rising))
        } else if vr > 7.0 && vr <= p.vol_overheat {
            Some((-0.5, VolumeBand::Explosive))
        } else {
            None
        }
    } else if (1.3..=3.0).contains(&vr) {
        Some((0.3, VolumeBand::Healthy))
    } else if vr > 3.0 && vr <= 5.0 {
        Some((0.0, VolumeBand::High))
    } else if vr > 5.0 && vr <= p.vol_overheat {
        Some((-1.0, VolumeBand::Overheated))
    } else {
        None
    }
}

/// Consecutive higher closes ending at `idx`, looking back at most 7 bars.
fn up_streak(bars: &[Bar], idx: usize) -> usize {
    let mut streak = 0;
    for lb in 1..MAX_STREAK_LOOKBACK.min(idx + 1) {
        if bars[idx - lb + 1].close > bars[idx - lb].close {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

fn ichimoku_points(frame: &IndicatorFrame, idx: usize, close: f64) -> Option<(f64, SignalComponent)> {
    let tenkan = frame.tenkan(idx)?;
    let kijun = frame.kijun(idx)?;
    let (top, bottom) = frame.cloud_bounds(idx)?;
    let bullish_cloud = frame.cloud_a(idx)? > frame.cloud_b(idx)?;

    let mut points = 0.0;
    let position = if close > top {
        points += 2.0;
        Some(CloudPosition::Above)
    } else if close < bottom {
        points -= 0.5;
        Some(CloudPosition::Below)
    } else {
        None
    };
    let tenkan_above_kijun = tenkan > kijun;
    if tenkan_above_kijun {
        points += 0.5;
    }
    if bullish_cloud {
        points += 0.3;
    }

    if position.is_none() && !tenkan_above_kijun && !bullish_cloud {
        return None;
    }
    Some((
        points,
        SignalComponent::Ichimoku {
            position,
            tenkan_above_kijun,
            bullish_cloud,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProfileName;
    use crate::indicators::{compute_indicators, make_bars};

    fn scorer() -> SignalScorer {
        SignalScorer::new(Profile::default(), BenfordParams::default())
    }

    /// Steady uptrend with a bullish final bar and rising volume.
    fn uptrend(n: usize) -> Vec<Bar> {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 * 1.004f64.powi(i as i32)).collect();
        let mut bars = make_bars(&closes);
        for (i, b) in bars.iter_mut().enumerate() {
            b.volume = 10_000 + (i as u64 * 131) % 4_000;
        }
        bars
    }

    #[test]
    fn too_early_scores_zero() {
        let bars = uptrend(100);
        let frame = compute_indicators(&bars);
        let s = scorer().score(&bars, &frame, 59);
        assert_eq!(s.score, 0.0);
        assert!(s.explanation.is_empty());
    }

    #[test]
    fn uptrend_passes_gates() {
        let bars = uptrend(120);
        let frame = compute_indicators(&bars);
        let s = scorer().score(&bars, &frame, 119);
        assert!(s.score >= BASE_SCORE, "score {}", s.score);
        assert!(s.explanation.contains(ComponentKind::Core));
        assert!(s.explanation.contains(ComponentKind::Rsi));
        assert!(s.explanation.contains(ComponentKind::Breakout));
    }

    #[test]
    fn bearish_bar_fails_gate() {
        let mut bars = uptrend(120);
        let last = bars.len() - 1;
        bars[last].open = bars[last].close + 0.5;
        bars[last].high = bars[last].open + 1.0;
        let frame = compute_indicators(&bars);
        let s = scorer().score(&bars, &frame, last);
        assert_eq!(s, SignalScore::zero());
    }

    #[test]
    fn downtrend_fails_ma_stack() {
        let closes: Vec<f64> = (0..120).map(|i| 200.0 - i as f64 * 0.5).collect();
        let bars = make_bars(&closes);
        let frame = compute_indicators(&bars);
        assert_eq!(scorer().score(&bars, &frame, 119).score, 0.0);
    }

    #[test]
    fn overheated_volume_fails_gate() {
        let mut bars = uptrend(120);
        bars[119].volume = 200_000;
        let frame = compute_indicators(&bars);
        assert!(frame.vol_ratio(119).unwrap() > 8.0);
        assert_eq!(scorer().score(&bars, &frame, 119).score, 0.0);
    }

    #[test]
    fn rsi_tiers() {
        assert_eq!(rsi_points(82.0), (2.5, RsiTier::Extreme));
        assert_eq!(rsi_points(70.0), (2.0, RsiTier::Strong));
        assert_eq!(rsi_points(45.0), (0.0, RsiTier::Neutral));
        assert_eq!(rsi_points(39.9), (-1.0, RsiTier::Weak));
    }

    #[test]
    fn volume_bands_depend_on_profile() {
        let std = Profile::default();
        let ff = Profile::new(ProfileName::ForceFollowing);
        assert_eq!(volume_points(&std, 1.8), Some((0.3, VolumeBand::Healthy)));
        assert_eq!(volume_points(&std, 4.0), Some((0.0, VolumeBand::High)));
        assert_eq!(volume_points(&std, 6.0), Some((-1.0, VolumeBand::Overheated)));
        assert_eq!(volume_points(&std, 1.0), None);
        assert_eq!(volume_points(&ff, 1.8), Some((0.3, VolumeBand::Rising)));
        assert_eq!(volume_points(&ff, 5.0), Some((0.5, VolumeBand::Accumulation)));
        assert_eq!(volume_points(&ff, 9.0), Some((-0.5, VolumeBand::Explosive)));
    }

    #[test]
    fn streak_counts_at_most_seven() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        assert_eq!(up_streak(&bars, 19), 7);
        assert_eq!(up_streak(&bars, 2), 2);
    }

    #[test]
    fn benford_multiplier_bounds() {
        let bars = uptrend(120);
        let std = scorer();
        let m = std.benford_multiplier(&bars, 119);
        assert!((1.0..=1.0 + BenfordParams::default().influence + 1e-12).contains(&m));

        let ff = SignalScorer::new(
            Profile::new(ProfileName::ForceFollowing),
            BenfordParams::default(),
        );
        let m = ff.benford_multiplier(&bars, 119);
        // bw = min(0.25, 0.15) → at most 1.30
        assert!((1.0..=1.3 + 1e-12).contains(&m));
    }

    #[test]
    fn constant_volume_triggers_benford_boost() {
        let mut bars = uptrend(120);
        for b in &mut bars {
            b.volume = 50_000;
        }
        let m = scorer().benford_multiplier(&bars, 119);
        assert!(m > BENFORD_REPORT_FLOOR);
    }

    #[test]
    fn trailing_high_window() {
        let bars = make_bars(&[10.0, 50.0, 12.0, 13.0]);
        assert_eq!(trailing_high(&bars, 3, 0), 14.0);
        assert_eq!(trailing_high(&bars, 3, 20), 51.0);
    }
}
