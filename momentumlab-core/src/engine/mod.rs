//! Backtesting engine: single-security, bar-by-bar trade lifecycle.
//!
//! The engine consumes a bar series and its precomputed [`IndicatorFrame`],
//! drives a [`SignalSource`] on idle bars, and turns fills and exits into
//! [`Trade`] records.
//!
//! [`IndicatorFrame`]: crate::indicators::IndicatorFrame
//! [`SignalSource`]: crate::scoring::SignalSource
//! [`Trade`]: crate::domain::Trade

pub mod params;
pub mod simulator;

pub use params::{BacktestParams, ExitRules};
pub use simulator::{exit_decision, simulate, SecurityState, Simulator};
