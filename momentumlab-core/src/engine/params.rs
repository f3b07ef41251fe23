//! Backtest parameters and the exit rules they resolve to.

use serde::{Deserialize, Serialize};

use crate::domain::Profile;
use crate::scoring::BenfordParams;

/// Take-profit, stop-loss, cooldown and holding limit for one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitRules {
    pub take_profit: f64,
    pub stop_loss: f64,
    /// Minimum bars between two signals.
    pub cooldown: usize,
    /// Calendar-day holding limit; 0 disables the timeout exit.
    pub max_hold: i64,
}

impl ExitRules {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            take_profit: profile.take_profit,
            stop_loss: profile.stop_loss,
            cooldown: profile.cooldown,
            max_hold: 0,
        }
    }
}

/// Caller-tunable simulation parameters. Unset exit overrides fall back to
/// the base [`ExitRules`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestParams {
    pub threshold: f64,
    /// RSI floor for new signals; skipped while RSI is undefined.
    pub rsi_min: f64,
    pub take_profit: Option<f64>,
    pub stop_loss: Option<f64>,
    pub cooldown: Option<usize>,
    pub max_hold: Option<i64>,
    /// Per-side commission rate.
    pub commission: f64,
    /// Sell-side tax rate.
    pub tax: f64,
    pub quantity: u32,
    /// Skip new signals while the regime classifier reports a bear market.
    pub regime_filter: bool,
    /// Round fill-time target and stop to whole price units.
    pub round_exit_levels: bool,
    /// Benford setting the momentum scorer is built with.
    pub benford: BenfordParams,
}

impl Default for BacktestParams {
    fn default() -> Self {
        Self {
            threshold: 4.5,
            rsi_min: 70.0,
            take_profit: None,
            stop_loss: None,
            cooldown: None,
            max_hold: None,
            commission: 0.000_15,
            tax: 0.0018,
            quantity: 10,
            regime_filter: false,
            round_exit_levels: true,
            benford: BenfordParams::default(),
        }
    }
}

impl BacktestParams {
    /// Commission on both legs plus tax, as a fraction.
    pub fn round_trip_cost(&self) -> f64 {
        self.commission * 2.0 + self.tax
    }

    pub fn exit_rules(&self, base: ExitRules) -> ExitRules {
        ExitRules {
            take_profit: self.take_profit.unwrap_or(base.take_profit),
            stop_loss: self.stop_loss.unwrap_or(base.stop_loss),
            cooldown: self.cooldown.unwrap_or(base.cooldown),
            max_hold: self.max_hold.unwrap_or(base.max_hold),
        }
    }

    pub fn with_exits(mut self, take_profit: f64, stop_loss: f64) -> Self {
        self.take_profit = Some(take_profit);
        self.stop_loss = Some(stop_loss);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProfileName;

    #[test]
    fn overrides_fall_back_to_profile() {
        let base = ExitRules::from_profile(&Profile::new(ProfileName::LargeCap));
        let rules = BacktestParams::default().exit_rules(base);
        assert_eq!(rules, base);
        assert_eq!(rules.cooldown, 5);

        let rules = BacktestParams::default().with_exits(0.04, 0.05).exit_rules(base);
        assert_eq!(rules.take_profit, 0.04);
        assert_eq!(rules.stop_loss, 0.05);
        assert_eq!(rules.cooldown, 5);
    }

    #[test]
    fn round_trip_cost_defaults() {
        let cost = BacktestParams::default().round_trip_cost();
        assert!((cost - 0.0021).abs() < 1e-12);
    }

    #[test]
    fn empty_toml_like_json_uses_defaults() {
        let p: BacktestParams = serde_json::from_str("{}").unwrap();
        assert_eq!(p, BacktestParams::default());
    }
}
