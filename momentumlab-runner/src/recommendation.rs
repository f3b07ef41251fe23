//! Investment recommendation: a 0–100 grade combining a walk-forward result
//! with the signal on the latest bar.

use std::fmt;

use serde::{Deserialize, Serialize};

use momentumlab_core::domain::{Bar, Profile};
use momentumlab_core::indicators::IndicatorFrame;
use momentumlab_core::scoring::{SignalScorer, MIN_SCORING_INDEX};

use crate::walk_forward::VariantResult;

pub const STRATEGY_POINTS: f64 = 30.0;
pub const SIGNAL_POINTS: f64 = 25.0;
pub const PROFIT_POINTS: f64 = 20.0;
pub const CONFIDENCE_POINTS: f64 = 10.0;
/// Test trades needed for full confidence.
pub const CONFIDENT_TRADES: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    StrongBuy,
    Consider,
    Watch,
    Unsuitable,
}

impl Grade {
    pub fn from_total(total: u32) -> Self {
        match total {
            80.. => Self::StrongBuy,
            60..=79 => Self::Consider,
            40..=59 => Self::Watch,
            _ => Self::Unsuitable,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::StrongBuy => "strong buy",
            Self::Consider => "consider",
            Self::Watch => "watch",
            Self::Unsuitable => "unsuitable",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvestmentScore {
    pub total: u32,
    pub grade: Grade,
    /// Win rate, out of 30.
    pub strategy: u32,
    /// Today's signal score, out of 25.
    pub signal: u32,
    /// Average return, out of 20.
    pub profit: u32,
    /// MA stack, RSI and MACD, out of 15.
    pub trend: u32,
    /// Test trade count, out of 10.
    pub confidence: u32,
}

fn points(value: f64, cap: f64) -> u32 {
    value.clamp(0.0, cap).round() as u32
}

/// Grade a chosen variant against the latest bar of `bars`.
///
/// Signal and trend points need more than the scoring warm-up; shorter
/// series score 0 on both.
pub fn investment_score(
    variant: &VariantResult,
    profile: &Profile,
    bars: &[Bar],
    frame: &IndicatorFrame,
) -> InvestmentScore {
    let eval = variant.evaluation();
    let strategy = points(eval.win_rate / 100.0 * STRATEGY_POINTS, STRATEGY_POINTS);
    let profit = points((eval.avg_return + 5.0) / 10.0 * PROFIT_POINTS, PROFIT_POINTS);
    let confidence = points(
        variant.test.closed as f64 / CONFIDENT_TRADES * CONFIDENCE_POINTS,
        CONFIDENCE_POINTS,
    );

    let (signal, trend) = if bars.len() > MIN_SCORING_INDEX {
        let last = bars.len() - 1;
        let scorer = SignalScorer::new(profile.clone(), variant.cell.benford());
        let score = scorer.score(bars, frame, last).score;
        (
            points(score / 10.0 * SIGNAL_POINTS, SIGNAL_POINTS),
            trend_points(frame, last),
        )
    } else {
        (0, 0)
    };

    let total = strategy + signal + profit + trend + confidence;
    InvestmentScore {
        total,
        grade: Grade::from_total(total),
        strategy,
        signal,
        profit,
        trend,
        confidence,
    }
}

/// MA stack (5/2) + RSI tier (5/4/2) + MACD (5/2).
pub fn trend_points(frame: &IndicatorFrame, i: usize) -> u32 {
    let mut pts = 0;

    if let (Some(ma5), Some(ma20)) = (frame.ma5(i), frame.ma20(i)) {
        let ma60_below = frame.ma60(i).is_some_and(|ma60| ma20 > ma60);
        if ma5 > ma20 && ma60_below {
            pts += 5;
        } else if ma5 > ma20 {
            pts += 2;
        }
    }

    pts += match frame.rsi(i) {
        Some(r) if r >= 80.0 => 5,
        Some(r) if r >= 70.0 => 4,
        Some(r) if r >= 60.0 => 2,
        _ => 0,
    };

    if let Some(hist) = frame.macd_hist(i) {
        if hist > 0.0 {
            pts += 5;
        } else if let (Some(macd), Some(signal)) = (frame.macd(i), frame.macd_signal(i)) {
            if macd > signal {
                pts += 2;
            }
        }
    }

    pts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::TradeSummary;
    use crate::sweep::GridCell;
    use chrono::NaiveDate;
    use momentumlab_core::indicators::compute_indicators;

    fn short_bars() -> Vec<Bar> {
        let d0 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..10)
            .map(|i| {
                let c = 100.0 + i as f64;
                Bar::new(d0 + chrono::Duration::days(i), c, c + 1.0, c - 1.0, c, 1_000)
            })
            .collect()
    }

    fn variant(win_rate: f64, avg_return: f64, test_closed: usize) -> VariantResult {
        let summary = TradeSummary {
            closed: test_closed.max(3),
            win_rate,
            avg_return,
            ..TradeSummary::default()
        };
        VariantResult {
            cell: GridCell {
                take_profit: 0.1,
                stop_loss: 0.05,
                cooldown: 3,
                benford_window: 30,
                benford_influence: 0.15,
                min_hits: 3,
            },
            fitness: 0.0,
            train: summary,
            test: TradeSummary {
                closed: test_closed,
                ..summary
            },
        }
    }

    #[test]
    fn grade_thresholds() {
        assert_eq!(Grade::from_total(80), Grade::StrongBuy);
        assert_eq!(Grade::from_total(79), Grade::Consider);
        assert_eq!(Grade::from_total(60), Grade::Consider);
        assert_eq!(Grade::from_total(40), Grade::Watch);
        assert_eq!(Grade::from_total(39), Grade::Unsuitable);
        assert_eq!(Grade::StrongBuy.to_string(), "strong buy");
    }

    #[test]
    fn short_series_scores_history_only() {
        let bars = short_bars();
        let frame = compute_indicators(&bars);
        let s = investment_score(&variant(70.0, 3.0, 5), &Profile::default(), &bars, &frame);
        // 70% → 21, (3+5)/10×20 = 16, 5 trades → 10
        assert_eq!(s.strategy, 21);
        assert_eq!(s.profit, 16);
        assert_eq!(s.confidence, 10);
        assert_eq!((s.signal, s.trend), (0, 0));
        assert_eq!(s.total, 47);
        assert_eq!(s.grade, Grade::Watch);
    }

    #[test]
    fn components_are_clamped() {
        let bars = short_bars();
        let frame = compute_indicators(&bars);
        let s = investment_score(&variant(100.0, 40.0, 12), &Profile::default(), &bars, &frame);
        assert_eq!(s.strategy, 30);
        assert_eq!(s.profit, 20);
        assert_eq!(s.confidence, 10);

        let s = investment_score(&variant(0.0, -20.0, 0), &Profile::default(), &bars, &frame);
        assert_eq!(s.profit, 0);
        assert_eq!(s.confidence, 0);
        assert_eq!(s.grade, Grade::Unsuitable);
    }
}
