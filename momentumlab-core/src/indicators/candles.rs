//! Candle pattern flags.

use crate::domain::Bar;

/// Hammer: lower wick > 2x body, upper wick < 0.5x body, non-zero body.
pub fn is_hammer(bar: &Bar) -> bool {
    let body = bar.body().abs();
    body > 0.0 && bar.lower_wick() > 2.0 * body && bar.upper_wick() < 0.5 * body
}

/// Bullish engulfing: prior bar bearish, current bullish and its body covers
/// the prior body.
pub fn is_bullish_engulfing(prev: &Bar, bar: &Bar) -> bool {
    bar.body() > 0.0 && prev.body() < 0.0 && bar.open <= prev.close && bar.close >= prev.open
}

/// Per-bar pattern flags. The first bar never carries a pattern.
#[derive(Debug, Clone, Default)]
pub struct CandleFlags {
    pub hammer: Vec<bool>,
    pub engulfing: Vec<bool>,
}

pub fn detect_candles(bars: &[Bar]) -> CandleFlags {
    let mut flags = CandleFlags {
        hammer: vec![false; bars.len()],
        engulfing: vec![false; bars.len()],
    };
    for i in 1..bars.len() {
        flags.hammer[i] = is_hammer(&bars[i]);
        flags.engulfing[i] = is_bullish_engulfing(&bars[i - 1], &bars[i]);
    }
    flags
}
