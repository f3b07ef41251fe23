//! Walk-forward optimizer.
//!
//! Splits one security's bars into a training window and a trailing test
//! window, sweeps the full parameter grid on the training bars only, and
//! re-simulates the two winning cells on the test window:
//!
//! - **stability** winner: best [`FitnessMetric::Stability`]
//! - **profit** winner: best [`FitnessMetric::Profit`]
//!
//! Test simulations run over the full series starting at the test index,
//! so indicators see the complete history up to each bar.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use momentumlab_core::domain::{Bar, Profile, ProfileName};
use momentumlab_core::engine::{simulate, BacktestParams, ExitRules};
use momentumlab_core::indicators::{compute_indicators, IndicatorFrame};
use momentumlab_core::scoring::{SignalScorer, MIN_SCORING_INDEX};

use crate::fitness::FitnessMetric;
use crate::metrics::TradeSummary;
use crate::sweep::{GridCell, ParamGrid, ParamSweep};
use crate::volatility::{average_true_range_pct, VolatilityBand};

/// Minimum series length for an optimization.
pub const MIN_TOTAL_BARS: usize = 90;
/// Length of the trailing out-of-sample window.
pub const TEST_WINDOW_BARS: usize = 120;
/// Closed training trades a cell needs to be ranked.
pub const MIN_TRAIN_TRADES: usize = 3;
/// The profit variant must beat stability by more than this many points of
/// average return.
pub const PROFIT_EDGE_PCT: f64 = 1.0;
/// ...and hold at least this win rate.
pub const PROFIT_MIN_WIN_RATE: f64 = 40.0;

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    pub min_total_bars: usize,
    pub test_window: usize,
    pub min_train_trades: usize,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            min_total_bars: MIN_TOTAL_BARS,
            test_window: TEST_WINDOW_BARS,
            min_train_trades: MIN_TRAIN_TRADES,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Inclusive date range plus bar count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub bars: usize,
}

/// One winning cell with its in-sample and out-of-sample statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantResult {
    pub cell: GridCell,
    /// Fitness under the metric that selected this cell.
    pub fitness: f64,
    pub train: TradeSummary,
    pub test: TradeSummary,
}

impl VariantResult {
    /// Test statistics, or training statistics when the test window closed
    /// no trades.
    pub fn evaluation(&self) -> &TradeSummary {
        if self.test.closed > 0 {
            &self.test
        } else {
            &self.train
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Stability,
    Profit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub profile: ProfileName,
    pub daily_volatility_pct: f64,
    pub band: VolatilityBand,
    pub train_period: Period,
    pub test_period: Period,
    pub total_combos: usize,
    pub valid_combos: usize,
    pub stability: VariantResult,
    pub profit: VariantResult,
    /// The profile's own exits, for comparison with the tuned cell.
    pub default_exits: ExitRules,
    /// The sweep stopped early; winners cover the evaluated cells only.
    pub cancelled: bool,
}

impl OptimizationResult {
    /// Prefer the profit variant only when its evaluation average return
    /// beats stability by more than [`PROFIT_EDGE_PCT`] at a win rate of at
    /// least [`PROFIT_MIN_WIN_RATE`].
    pub fn select_variant(&self) -> (Variant, &VariantResult) {
        let stable = self.stability.evaluation();
        let profit = self.profit.evaluation();
        if profit.avg_return > stable.avg_return + PROFIT_EDGE_PCT
            && profit.win_rate >= PROFIT_MIN_WIN_RATE
        {
            (Variant::Profit, &self.profit)
        } else {
            (Variant::Stability, &self.stability)
        }
    }
}

// ─── Optimizer ───────────────────────────────────────────────────────

/// Fold layout for a series of `n` bars: `(test_start, train_end)`.
///
/// `None` when the series is too short or leaves no training bars after
/// the scoring warm-up.
pub fn split(n: usize, config: &WalkForwardConfig) -> Option<(usize, usize)> {
    if n < config.min_total_bars {
        return None;
    }
    let test_start = MIN_SCORING_INDEX.max(n.saturating_sub(config.test_window));
    let train_end = test_start;
    if test_start >= n || train_end <= MIN_SCORING_INDEX {
        return None;
    }
    Some((test_start, train_end))
}

#[derive(Debug, Clone, Default)]
pub struct WalkForwardOptimizer {
    config: WalkForwardConfig,
    sweep: ParamSweep,
    /// Replaces the volatility-band grid when set.
    grid: Option<ParamGrid>,
}

#[derive(Clone, Copy)]
struct Candidate {
    index: usize,
    summary: TradeSummary,
    stability: f64,
    profit: f64,
}

impl WalkForwardOptimizer {
    pub fn new(config: WalkForwardConfig) -> Self {
        Self {
            config,
            sweep: ParamSweep::new(),
            grid: None,
        }
    }

    pub fn with_sweep(mut self, sweep: ParamSweep) -> Self {
        self.sweep = sweep;
        self
    }

    pub fn with_grid(mut self, grid: ParamGrid) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn optimize(
        &self,
        bars: &[Bar],
        profile: &Profile,
        params: &BacktestParams,
    ) -> Option<OptimizationResult> {
        self.optimize_with_progress(bars, profile, params, |_, _| {})
    }

    /// Run the walk-forward search. Returns `None` for fewer than
    /// [`MIN_TOTAL_BARS`] bars or when no cell closes enough training trades.
    pub fn optimize_with_progress<P>(
        &self,
        bars: &[Bar],
        profile: &Profile,
        params: &BacktestParams,
        progress: P,
    ) -> Option<OptimizationResult>
    where
        P: Fn(usize, usize) + Send + Sync,
    {
        let n = bars.len();
        let Some((test_start, train_end)) = split(n, &self.config) else {
            info!(bars = n, "series too short for walk-forward optimization");
            return None;
        };

        let daily_volatility_pct = average_true_range_pct(bars);
        let band = VolatilityBand::classify(daily_volatility_pct);
        let cells = match &self.grid {
            Some(grid) => grid.cells(),
            None => ParamGrid::for_band(band).cells(),
        };
        let base = ExitRules::from_profile(profile);

        let train_bars = &bars[..train_end];
        let train_frame = compute_indicators(train_bars);
        info!(
            profile = %profile.name,
            volatility_pct = daily_volatility_pct,
            band = %band,
            combos = cells.len(),
            train_bars = train_end,
            "walk-forward sweep started"
        );

        let results = self.sweep.sweep_with_progress(
            &cells,
            |cell| {
                let summary = run_cell(
                    train_bars,
                    &train_frame,
                    MIN_SCORING_INDEX,
                    profile,
                    base,
                    params,
                    cell,
                );
                (summary.closed >= self.config.min_train_trades).then_some(summary)
            },
            progress,
        );

        let mut stable: Option<Candidate> = None;
        let mut profit: Option<Candidate> = None;
        let mut valid_combos = 0;
        for (index, summary) in results.completed() {
            let Some(summary) = summary else { continue };
            valid_combos += 1;
            let candidate = Candidate {
                index,
                summary: *summary,
                stability: FitnessMetric::Stability.score(summary),
                profit: FitnessMetric::Profit.score(summary),
            };
            if stable.map_or(true, |b| {
                FitnessMetric::Stability.is_better(candidate.stability, b.stability)
            }) {
                stable = Some(candidate);
            }
            if profit.map_or(true, |b| FitnessMetric::Profit.is_better(candidate.profit, b.profit)) {
                profit = Some(candidate);
            }
        }

        if results.was_cancelled() {
            warn!(evaluated = results.completed().count(), "walk-forward sweep cancelled");
        }
        let (Some(stable), Some(profit)) = (stable, profit) else {
            info!(combos = cells.len(), "no grid cell closed enough training trades");
            return None;
        };

        let full_frame = compute_indicators(bars);
        let evaluate = |c: &Candidate, fitness: f64| {
            let cell = cells[c.index];
            VariantResult {
                cell,
                fitness,
                train: c.summary,
                test: run_cell(bars, &full_frame, test_start, profile, base, params, &cell),
            }
        };
        let stability = evaluate(&stable, stable.stability);
        let profit = evaluate(&profit, profit.profit);

        info!(
            valid = valid_combos,
            stable_train_wr = stability.train.win_rate,
            stable_test_wr = stability.test.win_rate,
            stable_test_trades = stability.test.closed,
            profit_test_avg = profit.test.avg_return,
            "walk-forward sweep finished"
        );

        Some(OptimizationResult {
            profile: profile.name,
            daily_volatility_pct,
            band,
            train_period: Period {
                start: bars[MIN_SCORING_INDEX].date,
                end: bars[train_end - 1].date,
                bars: train_end - MIN_SCORING_INDEX,
            },
            test_period: Period {
                start: bars[test_start].date,
                end: bars[n - 1].date,
                bars: n - test_start,
            },
            total_combos: cells.len(),
            valid_combos,
            stability,
            profit,
            default_exits: base,
            cancelled: results.was_cancelled(),
        })
    }
}

fn run_cell(
    bars: &[Bar],
    frame: &IndicatorFrame,
    start: usize,
    profile: &Profile,
    base: ExitRules,
    params: &BacktestParams,
    cell: &GridCell,
) -> TradeSummary {
    let cell_params = cell.apply(params);
    let scorer = SignalScorer::new(profile.clone(), cell_params.benford);
    let trades = simulate(bars, frame, start, &scorer, base, &cell_params);
    TradeSummary::compute(&trades)
}
