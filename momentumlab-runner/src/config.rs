//! Engine configuration file (TOML).
//!
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ```toml
//! [signal]
//! profile = "auto"
//! threshold = 4.5
//!
//! [benford]
//! influence = 0.15
//! window = 30
//!
//! [backtest]
//! max_hold_days = 20
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use momentumlab_core::scoring::BenfordParams;
use momentumlab_core::BacktestParams;

use crate::volatility::ProfileSelection;

/// Content hash of a configuration.
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub signal: SignalConfig,
    pub benford: BenfordParams,
    pub costs: CostConfig,
    pub backtest: BacktestSection,
    pub universe: UniverseConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Profile name, or `auto` to pick one from realised volatility.
    pub profile: String,
    pub threshold: f64,
    pub rsi_min: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            profile: "auto".into(),
            threshold: 4.5,
            rsi_min: 70.0,
        }
    }
}

/// Rates as fractions (0.00015 = 0.015%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub commission: f64,
    pub tax: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            commission: 0.000_15,
            tax: 0.0018,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub quantity: u32,
    /// Unset keeps the strategy's own limit (0, unlimited, for momentum).
    pub max_hold_days: Option<i64>,
    pub regime_filter: bool,
    pub round_exit_levels: bool,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            quantity: 10,
            max_hold_days: None,
            regime_filter: false,
            round_exit_levels: true,
        }
    }
}

/// Filters for universe scans. A bound of 0 means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    pub price_min: f64,
    pub price_max: f64,
    pub top_n: usize,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            price_min: 0.0,
            price_max: 0.0,
            top_n: 100,
        }
    }
}

impl UniverseConfig {
    pub fn accepts_price(&self, close: f64) -> bool {
        (self.price_min <= 0.0 || close >= self.price_min)
            && (self.price_max <= 0.0 || close <= self.price_max)
    }
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Deterministic BLAKE3 hash of the canonical JSON form.
    ///
    /// Identical configurations share a RunId across processes.
    pub fn run_id(&self) -> RunId {
        // Plain structs with string keys always serialize.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn profile_selection(&self) -> ProfileSelection {
        ProfileSelection::parse(&self.signal.profile)
    }

    /// Simulation parameters for the momentum pipeline.
    pub fn backtest_params(&self) -> BacktestParams {
        BacktestParams {
            threshold: self.signal.threshold,
            rsi_min: self.signal.rsi_min,
            max_hold: self.backtest.max_hold_days,
            commission: self.costs.commission,
            tax: self.costs.tax,
            quantity: self.backtest.quantity,
            regime_filter: self.backtest.regime_filter,
            round_exit_levels: self.backtest.round_exit_levels,
            benford: self.benford,
            ..BacktestParams::default()
        }
    }
}
