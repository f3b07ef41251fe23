//! Cross-sectional composite rank score (0–100) for one security at one bar.
//!
//! Five capped sub-scores: signal strength (40), RSI (10), trend health (15),
//! volume anomaly (15) and volatility fit (10).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::benford::{multi_window, AlertLevel, BenfordTest, MultiWindowConfig};
use crate::domain::{Bar, Profile};
use crate::indicators::IndicatorFrame;
use crate::scoring::{BenfordParams, Explanation, SignalScorer, MIN_SCORING_INDEX};

/// Benford minimum window used when scoring for ranking.
pub const RANKING_MIN_HITS: usize = 3;
const SIGNAL_CAP: f64 = 40.0;
/// Signal score that maps to the full signal sub-score.
const SIGNAL_FULL_SCALE: f64 = 15.0;
const TREND_CAP: f64 = 15.0;
const BENFORD_CAP: f64 = 15.0;
const SURGE_MULTIPLE: f64 = 2.5;
const SURGE_LOOKBACK: usize = 20;

/// Notable facts behind a composite, in evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RankReason {
    StrongSignal { score: f64 },
    Momentum { rsi: f64 },
    MaStack,
    AboveCloud,
    VolumeAnomaly { alert: AlertLevel },
    VolumeSurge { multiple: f64 },
    HealthyVolatility { atr_pct: f64 },
}

impl fmt::Display for RankReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankReason::StrongSignal { score } => write!(f, "signal {score:.1}"),
            RankReason::Momentum { rsi } => write!(f, "rsi {rsi:.0}"),
            RankReason::MaStack => f.write_str("ma stack"),
            RankReason::AboveCloud => f.write_str("above cloud"),
            RankReason::VolumeAnomaly { alert: AlertLevel::Strong } => {
                f.write_str("strong volume anomaly")
            }
            RankReason::VolumeAnomaly { .. } => f.write_str("volume anomaly"),
            RankReason::VolumeSurge { multiple } => write!(f, "volume surge x{multiple:.1}"),
            RankReason::HealthyVolatility { atr_pct } => write!(f, "atr {atr_pct:.1}%"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankRecord {
    /// Sum of the sub-scores, 1 dp.
    pub composite: f64,
    /// RSI >= 70 and signal score at or above the threshold.
    pub investable: bool,
    pub score: f64,
    pub rsi: f64,
    pub signal_points: f64,
    pub rsi_points: f64,
    pub trend_points: f64,
    pub benford_points: f64,
    pub volatility_points: f64,
    pub reasons: Vec<RankReason>,
    pub explanation: Explanation,
}

#[derive(Debug, Clone)]
pub struct RankingScorer {
    scorer: SignalScorer,
    threshold: f64,
    benford_window: usize,
    test: BenfordTest,
    windows: MultiWindowConfig,
}

impl RankingScorer {
    /// Ranking scorer with Benford defaults and `min_hits` of 3.
    pub fn new(profile: Profile, threshold: f64) -> Self {
        Self::with_benford(
            profile,
            threshold,
            BenfordParams {
                min_hits: RANKING_MIN_HITS,
                ..BenfordParams::default()
            },
        )
    }

    pub fn with_benford(profile: Profile, threshold: f64, benford: BenfordParams) -> Self {
        Self {
            scorer: SignalScorer::new(profile, benford),
            threshold,
            benford_window: benford.window,
            test: BenfordTest::default(),
            windows: MultiWindowConfig::default(),
        }
    }

    pub fn scorer(&self) -> &SignalScorer {
        &self.scorer
    }

    /// Composite for bar `idx`; `None` before the scoring warm-up.
    pub fn rank(&self, bars: &[Bar], frame: &IndicatorFrame, idx: usize) -> Option<RankRecord> {
        if idx < MIN_SCORING_INDEX || idx >= bars.len() {
            return None;
        }
        let bar = &bars[idx];
        let close = bar.close;
        let mut reasons = Vec::new();

        let signal = self.scorer.score(bars, frame, idx);
        let signal_points = (signal.score / SIGNAL_FULL_SCALE * SIGNAL_CAP).min(SIGNAL_CAP);
        if signal.score >= 8.0 {
            reasons.push(RankReason::StrongSignal {
                score: signal.score,
            });
        }

        let rsi = frame.rsi(idx).unwrap_or(0.0);
        let rsi_points = if rsi >= 80.0 {
            10.0
        } else if rsi >= 70.0 {
            7.0
        } else if rsi >= 60.0 {
            4.0
        } else {
            0.0
        };
        if rsi >= 70.0 {
            reasons.push(RankReason::Momentum { rsi });
        }

        let trend_points = self.trend_points(frame, idx, close, &mut reasons);
        let benford_points = self.benford_points(bars, idx, &mut reasons);

        let volatility_points = match frame.atr_pct(idx, close).filter(|p| *p > 0.0) {
            Some(atr_pct) => {
                if (2.0..=6.0).contains(&atr_pct) {
                    reasons.push(RankReason::HealthyVolatility { atr_pct });
                    10.0
                } else if (1.5..2.0).contains(&atr_pct) {
                    6.0
                } else if atr_pct > 6.0 && atr_pct <= 10.0 {
                    5.0
                } else {
                    2.0
                }
            }
            None => 0.0,
        };

        let composite =
            signal_points + rsi_points + trend_points + benford_points + volatility_points;
        Some(RankRecord {
            composite: round1(composite),
            investable: rsi >= 70.0 && signal.score >= self.threshold,
            score: round1(signal.score),
            rsi: round1(rsi),
            signal_points,
            rsi_points,
            trend_points,
            benford_points,
            volatility_points,
            reasons,
            explanation: signal.explanation,
        })
    }

    fn trend_points(
        &self,
        frame: &IndicatorFrame,
        idx: usize,
        close: f64,
        reasons: &mut Vec<RankReason>,
    ) -> f64 {
        let ma5 = frame.ma5(idx).unwrap_or(0.0);
        let ma20 = frame.ma20(idx).unwrap_or(0.0);
        let ma60 = frame.ma60(idx).unwrap_or(0.0);
        let mut points: f64 = 0.0;
        if close > ma5 && ma5 > ma20 && ma20 > ma60 {
            points += 8.0;
            reasons.push(RankReason::MaStack);
        } else if close > ma20 && ma20 > ma60 {
            points += 4.0;
        }
        let cloud_top = frame
            .cloud_a(idx)
            .unwrap_or(0.0)
            .max(frame.cloud_b(idx).unwrap_or(0.0));
        if cloud_top > 0.0 && close > cloud_top {
            points += 4.0;
            reasons.push(RankReason::AboveCloud);
        }
        if frame.kijun(idx).is_some_and(|k| k > 0.0 && close > k) {
            points += 3.0;
        }
        points.min(TREND_CAP)
    }

    fn benford_points(&self, bars: &[Bar], idx: usize, reasons: &mut Vec<RankReason>) -> f64 {
        if idx < self.benford_window || idx < SURGE_LOOKBACK {
            return 0.0;
        }
        let mut points = 0.0;
        let volumes: Vec<f64> = bars[idx.saturating_sub(30)..=idx]
            .iter()
            .map(|b| b.volume as f64)
            .collect();
        let alert = multi_window(&self.test, &self.windows, &volumes).alert;
        match alert {
            AlertLevel::Strong => points += 15.0,
            AlertLevel::Possible => points += 8.0,
            AlertLevel::None => {}
        }
        if alert != AlertLevel::None {
            reasons.push(RankReason::VolumeAnomaly { alert });
        }

        let avg = bars[idx - SURGE_LOOKBACK..idx]
            .iter()
            .map(|b| b.volume as f64)
            .sum::<f64>()
            / SURGE_LOOKBACK as f64;
        let volume = bars[idx].volume as f64;
        if avg > 0.0 && volume > avg * SURGE_MULTIPLE {
            points += 5.0;
            reasons.push(RankReason::VolumeSurge {
                multiple: volume / avg,
            });
        }
        f64::min(points, BENFORD_CAP)
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{compute_indicators, make_bars};

    #[test]
    fn none_before_warm_up() {
        let bars = make_bars(&vec![100.0; 80]);
        let frame = compute_indicators(&bars);
        let r = RankingScorer::new(Profile::default(), 4.5);
        assert!(r.rank(&bars, &frame, 59).is_none());
        assert!(r.rank(&bars, &frame, 60).is_some());
    }

    #[test]
    fn uptrend_ranks_above_flat() {
        let up: Vec<f64> = (0..120).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let flat = vec![100.0; 120];
        let r = RankingScorer::new(Profile::default(), 4.5);

        let bars = make_bars(&up);
        let frame = compute_indicators(&bars);
        let up_rank = r.rank(&bars, &frame, 119).unwrap();

        let bars = make_bars(&flat);
        let frame = compute_indicators(&bars);
        let flat_rank = r.rank(&bars, &frame, 119).unwrap();

        assert!(up_rank.composite > flat_rank.composite);
        assert!(up_rank.reasons.contains(&RankReason::MaStack));
        assert!(up_rank.trend_points <= 15.0);
        assert!(up_rank.composite <= 100.0);
    }

    #[test]
    fn volume_surge_adds_points() {
        let mut bars = make_bars(&vec![100.0; 80]);
        bars[79].volume = 5_000;
        let frame = compute_indicators(&bars);
        let rec = RankingScorer::new(Profile::default(), 4.5)
            .rank(&bars, &frame, 79)
            .unwrap();
        assert!(rec.benford_points >= 5.0);
        assert!(rec
            .reasons
            .iter()
            .any(|r| matches!(r, RankReason::VolumeSurge { .. })));
    }
}
