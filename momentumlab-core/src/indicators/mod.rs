//! Indicator library.
//!
//! Every indicator implements [`Indicator`]: a pure function from a bar slice
//! to a same-length series with `f64::NAN` during warm-up. [`compute_indicators`]
//! runs the whole set once and packs the results into an [`IndicatorFrame`],
//! which the scorer, price resolver, regime classifier and simulator read by
//! bar index. Nothing mutates a frame after it is built.

pub mod atr;
pub mod bollinger;
pub mod candles;
pub mod ema;
pub mod ichimoku;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod volume;
pub mod vpd;

pub use atr::Atr;
pub use bollinger::{Bollinger, BollingerBand};
pub use candles::{detect_candles, CandleFlags};
pub use ema::Ema;
pub use ichimoku::{Ichimoku, IchimokuLine};
pub use macd::{Macd, MacdLine};
pub use rsi::Rsi;
pub use sma::Sma;
pub use volume::Volume;
pub use vpd::Vpd;

use crate::domain::Bar;

/// Trait for indicators.
///
/// Indicators take a full bar series and produce a numeric output series of
/// the same length. The first `lookback()` values are `f64::NAN` (warm-up).
///
/// No value at bar t may depend on bars after t.
pub trait Indicator: Send + Sync {
    /// Short name (e.g. "ma20", "atr14").
    fn name(&self) -> &str;

    /// Index of the first bar that can carry a value.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_MULT: f64 = 2.0;
pub const VOLUME_PERIOD: usize = 20;

/// Derived per-bar fields for one bar sequence, stored column-wise.
#[derive(Debug, Clone, Default)]
pub struct IndicatorFrame {
    ma5: Vec<f64>,
    ma20: Vec<f64>,
    ma60: Vec<f64>,
    ma200: Vec<f64>,
    rsi: Vec<f64>,
    bb_mid: Vec<f64>,
    bb_upper: Vec<f64>,
    bb_lower: Vec<f64>,
    vol_avg: Vec<f64>,
    vol_ratio: Vec<f64>,
    macd: Vec<f64>,
    macd_signal: Vec<f64>,
    macd_hist: Vec<f64>,
    tenkan: Vec<f64>,
    kijun: Vec<f64>,
    cloud_a: Vec<f64>,
    cloud_b: Vec<f64>,
    atr: Vec<f64>,
    vpd: Vec<f64>,
    candles: CandleFlags,
}

fn defined(series: &[f64], i: usize) -> Option<f64> {
    series.get(i).copied().filter(|v| !v.is_nan())
}

macro_rules! series_accessors {
    ($($field:ident),* $(,)?) => {
        $(
            #[doc = concat!("`", stringify!($field), "` at bar `i`; `None` while not computable.")]
            pub fn $field(&self, i: usize) -> Option<f64> {
                defined(&self.$field, i)
            }
        )*
    };
}

impl IndicatorFrame {
    series_accessors!(
        ma5, ma20, ma60, ma200, rsi, bb_mid, bb_upper, bb_lower, vol_avg, vol_ratio, macd,
        macd_signal, macd_hist, tenkan, kijun, cloud_a, cloud_b, atr, vpd,
    );

    pub fn len(&self) -> usize {
        self.ma5.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ma5.is_empty()
    }

    /// Moving average for one of the supported windows (5, 20, 60, 200).
    pub fn ma(&self, window: usize, i: usize) -> Option<f64> {
        match window {
            5 => self.ma5(i),
            20 => self.ma20(i),
            60 => self.ma60(i),
            200 => self.ma200(i),
            _ => None,
        }
    }

    pub fn is_hammer(&self, i: usize) -> bool {
        self.candles.hammer.get(i).copied().unwrap_or(false)
    }

    pub fn is_bullish_engulfing(&self, i: usize) -> bool {
        self.candles.engulfing.get(i).copied().unwrap_or(false)
    }

    /// Upper and lower cloud edges, when both spans are defined.
    pub fn cloud_bounds(&self, i: usize) -> Option<(f64, f64)> {
        let a = self.cloud_a(i)?;
        let b = self.cloud_b(i)?;
        Some((a.max(b), a.min(b)))
    }

    /// ATR as a percentage of `close`.
    pub fn atr_pct(&self, i: usize, close: f64) -> Option<f64> {
        let atr = self.atr(i)?;
        if close <= 0.0 {
            return None;
        }
        Some(atr / close * 100.0)
    }
}

/// Compute every derived field for a bar sequence.
pub fn compute_indicators(bars: &[Bar]) -> IndicatorFrame {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let [macd, macd_signal, macd_hist] = macd::macd_series(&closes, 12, 26, 9);
    let vol_avg = Volume::average(VOLUME_PERIOD).compute(bars);
    let vol_ratio = volume::volume_ratio(bars, &vol_avg);
    let vpd = vpd::vpd_from_ratio(bars, &vol_ratio);

    IndicatorFrame {
        ma5: sma::rolling_mean(&closes, 5),
        ma20: sma::rolling_mean(&closes, 20),
        ma60: sma::rolling_mean(&closes, 60),
        ma200: sma::rolling_mean(&closes, 200),
        rsi: Rsi::new(RSI_PERIOD).compute(bars),
        bb_mid: Bollinger::middle(BOLLINGER_PERIOD, BOLLINGER_MULT).compute(bars),
        bb_upper: Bollinger::upper(BOLLINGER_PERIOD, BOLLINGER_MULT).compute(bars),
        bb_lower: Bollinger::lower(BOLLINGER_PERIOD, BOLLINGER_MULT).compute(bars),
        vol_avg,
        vol_ratio,
        macd,
        macd_signal,
        macd_hist,
        tenkan: Ichimoku::new(IchimokuLine::Tenkan).compute(bars),
        kijun: Ichimoku::new(IchimokuLine::Kijun).compute(bars),
        cloud_a: Ichimoku::new(IchimokuLine::CloudA).compute(bars),
        cloud_b: Ichimoku::new(IchimokuLine::CloudB).compute(bars),
        atr: Atr::new(ATR_PERIOD).compute(bars),
        vpd,
        candles: detect_candles(bars),
    }
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for the first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                base_date + chrono::Duration::days(i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(n: usize) -> Vec<Bar> {
        let closes: Vec<f64> = (0..n)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 8.0 + i as f64 * 0.1)
            .collect();
        let mut bars = make_bars(&closes);
        for (i, b) in bars.iter_mut().enumerate() {
            b.volume = 1000 + (i as u64 * 37) % 900;
        }
        bars
    }

    #[test]
    fn warmup_boundaries() {
        let frame = compute_indicators(&wave(220));
        assert!(frame.ma5(3).is_none() && frame.ma5(4).is_some());
        assert!(frame.ma20(18).is_none() && frame.ma20(19).is_some());
        assert!(frame.ma60(58).is_none() && frame.ma60(59).is_some());
        assert!(frame.ma200(198).is_none() && frame.ma200(199).is_some());
        assert!(frame.rsi(13).is_none() && frame.rsi(14).is_some());
        assert!(frame.bb_upper(18).is_none() && frame.bb_upper(19).is_some());
        assert!(frame.vol_ratio(18).is_none() && frame.vol_ratio(19).is_some());
        assert!(frame.atr(13).is_none() && frame.atr(14).is_some());
        assert!(frame.macd(0).is_some());
        assert!(frame.cloud_bounds(76).is_none() && frame.cloud_bounds(77).is_some());
    }

    #[test]
    fn out_of_range_is_none() {
        let frame = compute_indicators(&wave(30));
        assert_eq!(frame.len(), 30);
        assert!(frame.ma5(30).is_none());
        assert!(!frame.is_hammer(99));
    }

    #[test]
    fn no_look_ahead() {
        let bars = wave(150);
        let full = compute_indicators(&bars);
        let cut = compute_indicators(&bars[..100]);
        for i in 0..100 {
            assert_eq!(full.ma60(i), cut.ma60(i), "ma60 at {i}");
            assert_eq!(full.rsi(i), cut.rsi(i), "rsi at {i}");
            assert_eq!(full.atr(i), cut.atr(i), "atr at {i}");
            assert_eq!(full.macd_hist(i), cut.macd_hist(i), "macd at {i}");
            assert_eq!(full.cloud_b(i), cut.cloud_b(i), "cloud_b at {i}");
            assert_eq!(full.vpd(i), cut.vpd(i), "vpd at {i}");
        }
    }

    #[test]
    fn ma_lookup_by_window() {
        let frame = compute_indicators(&wave(70));
        assert_eq!(frame.ma(20, 50), frame.ma20(50));
        assert!(frame.ma(10, 50).is_none());
    }

    #[test]
    fn empty_input() {
        let frame = compute_indicators(&[]);
        assert!(frame.is_empty());
    }
}
