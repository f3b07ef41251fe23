//! Dynamic price resolver.
//!
//! Entry, target and stop levels come from ordered rule lists. Each list is
//! evaluated first-match, so every cascade can be inspected and tested rule
//! by rule, and every resolved level records the rule that produced it.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::indicators::IndicatorFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Kijun,
    Ma20,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSource {
    SwingHigh120,
    SwingHigh52,
    BollingerUpper,
    Atr3x,
    FixedPercent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopSource {
    Kijun,
    Atr2x,
    FixedPercent,
}

/// Entry limit rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EntryRule {
    /// Buy at kijun when it sits below close by at most `max_gap`.
    Kijun { max_gap: f64 },
    /// Buy at ma20 when it sits below close by at most `max_gap`.
    Ma20 { max_gap: f64 },
    /// Buy at the signal close.
    Close,
}

impl EntryRule {
    pub fn source(&self) -> EntrySource {
        match self {
            EntryRule::Kijun { .. } => EntrySource::Kijun,
            EntryRule::Ma20 { .. } => EntrySource::Ma20,
            EntryRule::Close => EntrySource::Close,
        }
    }

    pub fn resolve(&self, bars: &[Bar], frame: &IndicatorFrame, idx: usize) -> Option<f64> {
        let close = bars[idx].close;
        let below_within = |level: f64, max_gap: f64| {
            (level > 0.0 && level < close && (close - level) / close <= max_gap).then_some(level)
        };
        match *self {
            EntryRule::Kijun { max_gap } => frame.kijun(idx).and_then(|k| below_within(k, max_gap)),
            EntryRule::Ma20 { max_gap } => frame.ma20(idx).and_then(|m| below_within(m, max_gap)),
            EntryRule::Close => Some(close),
        }
    }
}

/// Target anchor rule. Swing highs exclude the signal bar itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TargetRule {
    SwingHigh { lookback: usize },
    /// Upper Bollinger band when it exceeds close by more than `min_gain`.
    BollingerUpper { min_gain: f64 },
    /// close + `multiple` x ATR.
    AtrMultiple { multiple: f64 },
}

impl TargetRule {
    pub fn source(&self) -> TargetSource {
        match self {
            TargetRule::SwingHigh { lookback } if *lookback >= 120 => TargetSource::SwingHigh120,
            TargetRule::SwingHigh { .. } => TargetSource::SwingHigh52,
            TargetRule::BollingerUpper { .. } => TargetSource::BollingerUpper,
            TargetRule::AtrMultiple { .. } => TargetSource::Atr3x,
        }
    }

    pub fn resolve(
        &self,
        bars: &[Bar],
        frame: &IndicatorFrame,
        idx: usize,
        band: (f64, f64),
    ) -> Option<f64> {
        let close = bars[idx].close;
        let in_band = |level: f64| (level >= close * band.0 && level <= close * band.1).then_some(level);
        match *self {
            TargetRule::SwingHigh { lookback } => {
                if idx == 0 {
                    return None;
                }
                let high = bars[idx.saturating_sub(lookback)..idx]
                    .iter()
                    .map(|b| b.high)
                    .fold(0.0, f64::max);
                if high > 0.0 {
                    in_band(high)
                } else {
                    None
                }
            }
            TargetRule::BollingerUpper { min_gain } => frame
                .bb_upper(idx)
                .filter(|u| *u > close * (1.0 + min_gain)),
            TargetRule::AtrMultiple { multiple } => frame
                .atr(idx)
                .filter(|a| *a > 0.0)
                .and_then(|a| in_band(close + a * multiple)),
        }
    }
}

/// Limit price, target anchor and their sources for one signal bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPrices {
    pub entry: f64,
    pub entry_source: EntrySource,
    /// `None` when no target rule matched; the fixed take-profit applies.
    pub target_anchor: Option<f64>,
    pub target_source: TargetSource,
}

/// Ordered entry and target cascades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceResolver {
    pub entry_rules: Vec<EntryRule>,
    pub target_rules: Vec<TargetRule>,
    /// Accepted target range as multiples of close, for swing and ATR targets.
    pub target_band: (f64, f64),
}

impl Default for PriceResolver {
    fn default() -> Self {
        Self {
            entry_rules: vec![
                EntryRule::Kijun { max_gap: 0.10 },
                EntryRule::Ma20 { max_gap: 0.04 },
                EntryRule::Close,
            ],
            target_rules: vec![
                TargetRule::SwingHigh { lookback: 120 },
                TargetRule::SwingHigh { lookback: 52 },
                TargetRule::BollingerUpper { min_gain: 0.03 },
                TargetRule::AtrMultiple { multiple: 3.0 },
            ],
            target_band: (1.05, 1.40),
        }
    }
}

impl PriceResolver {
    pub fn resolve(&self, bars: &[Bar], frame: &IndicatorFrame, idx: usize) -> ResolvedPrices {
        let (entry, entry_source) = self
            .entry_rules
            .iter()
            .find_map(|r| r.resolve(bars, frame, idx).map(|p| (p, r.source())))
            .unwrap_or((bars[idx].close, EntrySource::Close));

        let target = self.target_rules.iter().find_map(|r| {
            r.resolve(bars, frame, idx, self.target_band)
                .map(|p| (p, r.source()))
        });

        ResolvedPrices {
            entry,
            entry_source,
            target_anchor: target.map(|(p, _)| p),
            target_source: target.map_or(TargetSource::FixedPercent, |(_, s)| s),
        }
    }
}

pub const KIJUN_STOP_DISCOUNT: f64 = 0.03;
pub const ATR_STOP_MULTIPLE: f64 = 2.0;
/// An anchor must clear the fill by this fraction to be used as the target.
pub const MIN_ANCHOR_GAIN: f64 = 0.03;

/// Tightest valid stop below `fill`: the highest of kijun-3%, fill-2xATR and
/// the fixed stop. Never above `fill`.
pub fn stop_at_fill(
    fill: f64,
    kijun: Option<f64>,
    atr: Option<f64>,
    stop_loss: f64,
) -> (f64, StopSource) {
    let mut candidates = Vec::with_capacity(3);
    if let Some(k) = kijun.filter(|k| *k > 0.0) {
        let stop = k * (1.0 - KIJUN_STOP_DISCOUNT);
        if stop < fill {
            candidates.push((stop, StopSource::Kijun));
        }
    }
    if let Some(a) = atr.filter(|a| *a > 0.0) {
        let stop = fill - a * ATR_STOP_MULTIPLE;
        if stop > 0.0 && stop < fill {
            candidates.push((stop, StopSource::Atr2x));
        }
    }
    candidates.push((fill * (1.0 - stop_loss), StopSource::FixedPercent));

    let mut best = candidates[0];
    for c in &candidates[1..] {
        if c.0 > best.0 {
            best = *c;
        }
    }
    (best.0.min(fill), best.1)
}

/// Target at fill: the resolved anchor when it clears `fill` by 3%, else the
/// fixed take-profit.
pub fn target_at_fill(
    fill: f64,
    anchor: Option<f64>,
    anchor_source: TargetSource,
    take_profit: f64,
) -> (f64, TargetSource) {
    match anchor {
        Some(a) if a > fill * (1.0 + MIN_ANCHOR_GAIN) => (a, anchor_source),
        _ => (fill * (1.0 + take_profit), TargetSource::FixedPercent),
    }
}
