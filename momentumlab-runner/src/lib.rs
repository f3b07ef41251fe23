//! MomentumLab Runner — orchestration over the core engine.
//!
//! This crate builds on `momentumlab-core` to provide:
//! - TOML engine configuration with a content-hash RunId
//! - CSV bar loading with a seeded synthetic fallback
//! - Single-security backtests in momentum or accumulation mode
//! - Trade summaries and the two optimizer fitness functions
//! - Parameter grid and a parallel, cancellable sweep executor
//! - Walk-forward optimizer (stability and profit variants)
//! - Universe ranking and investment recommendation

pub mod config;
pub mod data_loader;
pub mod fitness;
pub mod metrics;
pub mod recommendation;
pub mod runner;
pub mod sweep;
pub mod universe;
pub mod volatility;
pub mod walk_forward;

pub use config::{ConfigError, EngineConfig, RunId};
pub use data_loader::{load_bars, load_universe, DataSource, LoadError, LoadOptions, LoadedData};
pub use fitness::FitnessMetric;
pub use metrics::TradeSummary;
pub use recommendation::{investment_score, Grade, InvestmentScore};
pub use runner::{run_backtest, run_backtest_on_bars, BacktestResult, RunError, StrategyMode};
pub use sweep::{CancelToken, GridCell, ParamGrid, ParamSweep, SweepResults};
pub use universe::{rank_universe, RankedSecurity};
pub use volatility::{auto_profile, ProfileSelection, VolatilityBand};
pub use walk_forward::{
    OptimizationResult, Variant, VariantResult, WalkForwardConfig, WalkForwardOptimizer,
};
