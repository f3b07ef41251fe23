//! Fitness functions for ranking grid cells.
//!
//! Both functions are empirically tuned; the weights are kept as named
//! constants rather than derived.

use serde::{Deserialize, Serialize};

use crate::metrics::TradeSummary;

// Stability fitness
pub const ELITE_WIN_RATE: f64 = 80.0;
pub const ELITE_WIN_WEIGHT: f64 = 0.8;
pub const GOOD_WIN_RATE: f64 = 70.0;
pub const GOOD_WIN_WEIGHT: f64 = 0.55;
pub const BASE_WIN_WEIGHT: f64 = 0.3;
pub const CUM_RETURN_CAP: f64 = 200.0;
pub const CUM_RETURN_POINTS: f64 = 15.0;
pub const AVG_RETURN_FLOOR: f64 = -5.0;
pub const AVG_RETURN_SPAN: f64 = 15.0;
pub const AVG_RETURN_POINTS: f64 = 5.0;
pub const TRADE_COUNT_FULL: f64 = 8.0;
pub const TRADE_COUNT_POINTS: f64 = 10.0;
pub const HEAVY_PENALTY_WIN_RATE: f64 = 50.0;
pub const HEAVY_PENALTY: f64 = -30.0;
pub const LIGHT_PENALTY_WIN_RATE: f64 = 60.0;
pub const LIGHT_PENALTY: f64 = -15.0;

// Profit fitness
pub const PROFIT_AVG_WEIGHT: f64 = 5.0;
pub const PROFIT_CUM_WEIGHT: f64 = 0.05;
pub const PROFIT_TRADE_COUNT_FULL: f64 = 5.0;
pub const PROFIT_TRADE_COUNT_POINTS: f64 = 3.0;
pub const PROFIT_PENALTY_WIN_RATE: f64 = 35.0;

/// Which fitness to optimize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessMetric {
    /// Win-rate-led blend with heavy penalties below 60% wins.
    #[default]
    Stability,
    /// Return-weighted blend.
    Profit,
}

impl FitnessMetric {
    pub fn score(&self, s: &TradeSummary) -> f64 {
        match self {
            Self::Stability => stability_fitness(s),
            Self::Profit => profit_fitness(s),
        }
    }

    /// Strictly greater wins, so ties keep the earlier candidate.
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        a > b
    }
}

pub fn stability_fitness(s: &TradeSummary) -> f64 {
    let wr = s.win_rate;
    let win_score = if wr >= ELITE_WIN_RATE {
        wr * ELITE_WIN_WEIGHT
    } else if wr >= GOOD_WIN_RATE {
        wr * GOOD_WIN_WEIGHT
    } else {
        wr * BASE_WIN_WEIGHT
    };
    let cum_score = (s.cum_return / CUM_RETURN_CAP).clamp(0.0, 1.0) * CUM_RETURN_POINTS;
    let avg_score =
        ((s.avg_return - AVG_RETURN_FLOOR) / AVG_RETURN_SPAN).clamp(0.0, 1.0) * AVG_RETURN_POINTS;
    let trade_score = (s.closed as f64 / TRADE_COUNT_FULL).min(1.0) * TRADE_COUNT_POINTS;
    let penalty = if wr < HEAVY_PENALTY_WIN_RATE {
        HEAVY_PENALTY
    } else if wr < LIGHT_PENALTY_WIN_RATE {
        LIGHT_PENALTY
    } else {
        0.0
    };
    win_score + cum_score + avg_score + trade_score + penalty
}

pub fn profit_fitness(s: &TradeSummary) -> f64 {
    let penalty = if s.win_rate < PROFIT_PENALTY_WIN_RATE {
        HEAVY_PENALTY
    } else {
        0.0
    };
    s.avg_return * PROFIT_AVG_WEIGHT
        + s.cum_return.clamp(0.0, CUM_RETURN_CAP) * PROFIT_CUM_WEIGHT
        + (s.closed as f64 / PROFIT_TRADE_COUNT_FULL).min(1.0) * PROFIT_TRADE_COUNT_POINTS
        + penalty
}
