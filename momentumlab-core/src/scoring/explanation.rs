//! Structured explanation of a signal score.
//!
//! Each contributing sub-signal is recorded as a typed component, so consumers
//! can inspect values instead of parsing free-form strings.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::benford::AlertLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiTier {
    Extreme,
    Strong,
    Building,
    Mild,
    Neutral,
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacdState {
    Positive,
    Accelerating,
    GoldenCross,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeBand {
    /// Standard profiles, 1.3x to 3x.
    Healthy,
    /// Standard profiles, 3x to 5x.
    High,
    /// Standard profiles, 5x up to the overheat ceiling.
    Overheated,
    /// Force-following, 3x to 7x.
    Accumulation,
    /// Force-following, 1.5x to 3x.
    Rising,
    /// Force-following, 7x up to the overheat ceiling.
    Explosive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudPosition {
    Above,
    Below,
}

/// Why the accumulation scorer turned down a pattern it had found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The explosion bar already printed.
    AlreadyExploded,
    /// 5-bar range too narrow.
    InactiveDryUp,
    /// Close has not recovered from the shakeout low.
    UnrecoveredLow,
}

/// One scored sub-signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalComponent {
    /// Mandatory gates passed.
    Core {
        dist_from_high_pct: f64,
        ma20_slope_pct: f64,
    },
    Rsi {
        value: f64,
        tier: RsiTier,
    },
    Macd {
        state: MacdState,
    },
    #[serde(rename = "return_20")]
    Return20 {
        pct: f64,
    },
    Volume {
        ratio: f64,
        band: VolumeBand,
    },
    /// Bullish engulfing candle.
    Candle,
    Streak {
        days: usize,
    },
    /// Close within 1% of the trailing 20-bar high.
    Breakout,
    LongTrend {
        ma60_slope_pct: f64,
    },
    Ma200 {
        gap_pct: f64,
    },
    Ichimoku {
        position: Option<CloudPosition>,
        tenkan_above_kijun: bool,
        bullish_cloud: bool,
    },
    Benford {
        multiplier: f64,
    },
    /// Shakeout followed by a volume dry-up.
    Shakeout {
        days_ago: usize,
    },
    Vpd {
        value: f64,
    },
    /// Multi-window Benford deviation on volume.
    VolumeAnomaly {
        alert: AlertLevel,
    },
    /// 10-bar mean volume relative to the 20-bar average.
    Compression {
        ratio: f64,
    },
    Vitality {
        range_pct: f64,
        recovery_pct: f64,
    },
    Rejected {
        reason: RejectReason,
        /// Measured value behind the rejection, in percent.
        value_pct: Option<f64>,
    },
}

/// Discriminant of [`SignalComponent`], for lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Core,
    Rsi,
    Macd,
    Return20,
    Volume,
    Candle,
    Streak,
    Breakout,
    LongTrend,
    Ma200,
    Ichimoku,
    Benford,
    Shakeout,
    Vpd,
    VolumeAnomaly,
    Compression,
    Vitality,
    Rejected,
}

impl SignalComponent {
    pub fn kind(&self) -> ComponentKind {
        match self {
            SignalComponent::Core { .. } => ComponentKind::Core,
            SignalComponent::Rsi { .. } => ComponentKind::Rsi,
            SignalComponent::Macd { .. } => ComponentKind::Macd,
            SignalComponent::Return20 { .. } => ComponentKind::Return20,
            SignalComponent::Volume { .. } => ComponentKind::Volume,
            SignalComponent::Candle => ComponentKind::Candle,
            SignalComponent::Streak { .. } => ComponentKind::Streak,
            SignalComponent::Breakout => ComponentKind::Breakout,
            SignalComponent::LongTrend { .. } => ComponentKind::LongTrend,
            SignalComponent::Ma200 { .. } => ComponentKind::Ma200,
            SignalComponent::Ichimoku { .. } => ComponentKind::Ichimoku,
            SignalComponent::Benford { .. } => ComponentKind::Benford,
            SignalComponent::Shakeout { .. } => ComponentKind::Shakeout,
            SignalComponent::Vpd { .. } => ComponentKind::Vpd,
            SignalComponent::VolumeAnomaly { .. } => ComponentKind::VolumeAnomaly,
            SignalComponent::Compression { .. } => ComponentKind::Compression,
            SignalComponent::Vitality { .. } => ComponentKind::Vitality,
            SignalComponent::Rejected { .. } => ComponentKind::Rejected,
        }
    }
}

impl fmt::Display for SignalComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalComponent::Core {
                dist_from_high_pct,
                ma20_slope_pct,
            } => write!(
                f,
                "aligned MAs, {dist_from_high_pct:.1}% off high, ma20 +{ma20_slope_pct:.1}%"
            ),
            SignalComponent::Rsi { value, tier } => {
                let label = match tier {
                    RsiTier::Extreme => "extreme momentum",
                    RsiTier::Strong => "strong momentum",
                    RsiTier::Building => "momentum",
                    RsiTier::Mild => "mild momentum",
                    RsiTier::Neutral => "neutral",
                    RsiTier::Weak => "weak",
                };
                write!(f, "{label} (rsi {value:.0})")
            }
            SignalComponent::Macd { state } => f.write_str(match state {
                MacdState::Positive => "macd positive",
                MacdState::Accelerating => "macd accelerating",
                MacdState::GoldenCross => "macd golden cross",
            }),
            SignalComponent::Return20 { pct } => write!(f, "20-bar return {pct:+.0}%"),
            SignalComponent::Volume { ratio, band } => {
                let label = match band {
                    VolumeBand::Healthy => "healthy volume",
                    VolumeBand::High => "high volume",
                    VolumeBand::Overheated => "overheating volume",
                    VolumeBand::Accumulation => "accumulation volume",
                    VolumeBand::Rising => "rising volume",
                    VolumeBand::Explosive => "explosive volume",
                };
                write!(f, "{label} (x{ratio:.1})")
            }
            SignalComponent::Candle => f.write_str("bullish engulfing"),
            SignalComponent::Streak { days } if *days > 5 => {
                write!(f, "{days} up days, overextended")
            }
            SignalComponent::Streak { days } => write!(f, "{days} up days"),
            SignalComponent::Breakout => f.write_str("20-bar high"),
            SignalComponent::LongTrend { ma60_slope_pct } => {
                write!(f, "ma60 rising (+{ma60_slope_pct:.1}%)")
            }
            SignalComponent::Ma200 { gap_pct } if *gap_pct > 0.0 => {
                write!(f, "above ma200 (+{gap_pct:.1}%)")
            }
            SignalComponent::Ma200 { gap_pct } => write!(f, "below ma200 ({gap_pct:.1}%)"),
            SignalComponent::Ichimoku {
                position,
                tenkan_above_kijun,
                bullish_cloud,
            } => {
                let mut parts = Vec::new();
                match position {
                    Some(CloudPosition::Above) => parts.push("above cloud"),
                    Some(CloudPosition::Below) => parts.push("below cloud"),
                    None => {}
                }
                if *tenkan_above_kijun {
                    parts.push("tenkan>kijun");
                }
                if *bullish_cloud {
                    parts.push("bullish cloud");
                }
                f.write_str(&parts.join(", "))
            }
            SignalComponent::Benford { multiplier } => write!(f, "benford x{multiplier:.2}"),
            SignalComponent::Shakeout { days_ago } => {
                write!(f, "shakeout {days_ago} bars ago, drying up")
            }
            SignalComponent::Vpd { value } => write!(f, "vpd {value:.1}"),
            SignalComponent::VolumeAnomaly { alert } => f.write_str(match alert {
                AlertLevel::Strong => "strong volume anomaly",
                AlertLevel::Possible => "volume anomaly",
                AlertLevel::None => "volume digits normal",
            }),
            SignalComponent::Compression { ratio } => write!(f, "volume x{ratio:.2} of average"),
            SignalComponent::Vitality {
                range_pct,
                recovery_pct,
            } => write!(
                f,
                "5-bar range {range_pct:.1}%, recovered {recovery_pct:.0}%"
            ),
            SignalComponent::Rejected { reason, value_pct } => {
                let label = match reason {
                    RejectReason::AlreadyExploded => "already exploded",
                    RejectReason::InactiveDryUp => "inactive dry-up",
                    RejectReason::UnrecoveredLow => "low not recovered",
                };
                match value_pct {
                    Some(v) => write!(f, "{label} ({v:.1}%)"),
                    None => f.write_str(label),
                }
            }
        }
    }
}

/// Ordered list of the components that fired for one score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Explanation(Vec<SignalComponent>);

impl Explanation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, component: SignalComponent) {
        self.0.push(component);
    }

    pub fn get(&self, kind: ComponentKind) -> Option<&SignalComponent> {
        self.0.iter().find(|c| c.kind() == kind)
    }

    pub fn contains(&self, kind: ComponentKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignalComponent> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        f.write_str(&parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_kind() {
        let mut e = Explanation::new();
        e.push(SignalComponent::Rsi {
            value: 82.0,
            tier: RsiTier::Extreme,
        });
        e.push(SignalComponent::Breakout);
        assert!(e.contains(ComponentKind::Breakout));
        assert!(!e.contains(ComponentKind::Macd));
        assert_eq!(e.len(), 2);
        assert_eq!(e.to_string(), "extreme momentum (rsi 82) | 20-bar high");
    }

    #[test]
    fn tagged_json() {
        let c = SignalComponent::Volume {
            ratio: 1.8,
            band: VolumeBand::Healthy,
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["kind"], "volume");
        assert_eq!(json["band"], "healthy");

        let r = serde_json::to_value(SignalComponent::Return20 { pct: 12.0 }).unwrap();
        assert_eq!(r["kind"], "return_20");
    }

    #[test]
    fn explanation_roundtrip() {
        let mut e = Explanation::new();
        e.push(SignalComponent::Ichimoku {
            position: Some(CloudPosition::Above),
            tenkan_above_kijun: true,
            bullish_cloud: false,
        });
        e.push(SignalComponent::Candle);
        let json = serde_json::to_string(&e).unwrap();
        let back: Explanation = serde_json::from_str(&json).unwrap();
        assert_eq!(e, back);
    }

    #[test]
    fn display_variants() {
        assert_eq!(
            SignalComponent::Ma200 { gap_pct: -3.21 }.to_string(),
            "below ma200 (-3.2%)"
        );
        assert_eq!(
            SignalComponent::Streak { days: 6 }.to_string(),
            "6 up days, overextended"
        );
    }
}
