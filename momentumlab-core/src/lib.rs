//! MomentumLab Core — indicators, scoring, price resolution and the backtest engine.
//!
//! This crate is pure computation over in-memory bar sequences:
//! - Domain types (bars, profiles, pending orders, positions, trades)
//! - Indicator library producing a read-only `IndicatorFrame`
//! - Benford first-digit anomaly detection
//! - Momentum signal scorer and the accumulation (SDE) scorer
//! - Dynamic entry/target/stop price cascades
//! - Market-regime classification and the loss-streak circuit breaker
//! - Bar-by-bar backtest simulator
//! - Cross-sectional composite ranking

pub mod accumulation;
pub mod benford;
pub mod circuit_breaker;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod prices;
pub mod ranking;
pub mod regime;
pub mod scoring;

pub use domain::{Bar, BarError, ExitReason, Profile, ProfileName, Trade};
pub use engine::{BacktestParams, ExitRules, Simulator};
pub use indicators::{compute_indicators, IndicatorFrame};
pub use scoring::{SignalScore, SignalScorer, SignalSource};
