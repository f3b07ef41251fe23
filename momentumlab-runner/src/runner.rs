//! Backtest runner: wires configuration, bars, the signal source and the
//! simulator together, and summarises the trades.
//!
//! Two entry points:
//! - `run_backtest()`: takes loaded data. Used by the CLI.
//! - `run_backtest_on_bars()`: takes a bare bar slice. Used by tests and
//!   callers that hold bars in memory.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use momentumlab_core::accumulation::{AccumulationProfile, AccumulationScorer};
use momentumlab_core::domain::{Bar, ProfileName, Trade};
use momentumlab_core::engine::{BacktestParams, ExitRules, Simulator};
use momentumlab_core::indicators::compute_indicators;
use momentumlab_core::regime::RegimeClassifier;
use momentumlab_core::scoring::{SignalScorer, SignalSource, MIN_SCORING_INDEX};

use crate::config::{ConfigError, EngineConfig, RunId};
use crate::data_loader::{dataset_hash, LoadError, LoadedData};
use crate::metrics::TradeSummary;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("{symbol}: {bars} bars, at least {required} needed")]
    InsufficientHistory {
        symbol: String,
        bars: usize,
        required: usize,
    },
}

/// Which entry thesis drives the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyMode {
    /// Momentum signal scorer with the profile's exits.
    #[default]
    Momentum,
    /// Accumulation (SDE) scorer with the accumulation exits.
    Accumulation,
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub run_id: RunId,
    pub dataset_hash: String,
    pub symbol: String,
    pub mode: StrategyMode,
    /// Momentum profile used, `None` in accumulation mode.
    pub profile: Option<ProfileName>,
    pub bar_count: usize,
    pub has_synthetic: bool,
    pub exits: ExitRules,
    pub summary: TradeSummary,
    pub trades: Vec<Trade>,
}

/// Run a backtest over loaded data.
pub fn run_backtest(
    data: &LoadedData,
    config: &EngineConfig,
    mode: StrategyMode,
    regime: Option<&RegimeClassifier>,
) -> Result<BacktestResult, RunError> {
    let mut result = run_backtest_on_bars(&data.symbol, &data.bars, config, mode, regime)?;
    result.has_synthetic = data.is_synthetic();
    Ok(result)
}

/// Run a backtest over a bar slice. Bars must already be validated.
pub fn run_backtest_on_bars(
    symbol: &str,
    bars: &[Bar],
    config: &EngineConfig,
    mode: StrategyMode,
    regime: Option<&RegimeClassifier>,
) -> Result<BacktestResult, RunError> {
    let required = MIN_SCORING_INDEX + 2;
    if bars.len() < required {
        return Err(RunError::InsufficientHistory {
            symbol: symbol.to_string(),
            bars: bars.len(),
            required,
        });
    }

    let frame = compute_indicators(bars);
    let (source, base, params, profile) = match mode {
        StrategyMode::Momentum => {
            let profile = config.profile_selection().resolve(bars);
            let base = ExitRules::from_profile(&profile);
            let name = profile.name;
            let params = config.backtest_params();
            let scorer: Box<dyn SignalSource> =
                Box::new(SignalScorer::new(profile, params.benford));
            (scorer, base, params, Some(name))
        }
        StrategyMode::Accumulation => {
            let accumulation = AccumulationProfile::default();
            let base = accumulation.exit_rules();
            let scorer: Box<dyn SignalSource> = Box::new(AccumulationScorer::new(accumulation));
            (scorer, base, accumulation_params(config), None)
        }
    };

    let mut simulator = Simulator::new(source.as_ref(), base, &params);
    if let Some(regime) = regime {
        simulator = simulator.with_regime(regime);
    }
    let exits = *simulator.rules();
    let trades = simulator.run(bars, &frame, 0);
    let summary = TradeSummary::compute(&trades);

    info!(
        symbol,
        mode = ?mode,
        source = source.name(),
        trades = summary.closed,
        win_rate = summary.win_rate,
        cum_return = summary.cum_return,
        "backtest finished"
    );

    Ok(BacktestResult {
        run_id: config.run_id(),
        dataset_hash: dataset_hash(bars),
        symbol: symbol.to_string(),
        mode,
        profile,
        bar_count: bars.len(),
        has_synthetic: false,
        exits,
        summary,
        trades,
    })
}

/// The accumulation scorer carries its own RSI band, so the momentum RSI
/// floor is disabled in this mode.
fn accumulation_params(config: &EngineConfig) -> BacktestParams {
    BacktestParams {
        rsi_min: 0.0,
        ..config.backtest_params()
    }
}
