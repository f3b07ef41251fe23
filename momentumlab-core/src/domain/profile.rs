//! Named parameter bundles that tune gates, exits and the Benford boost per
//! category of security.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a built-in profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileName {
    Default,
    LargeCap,
    ForceFollowing,
}

impl ProfileName {
    pub const ALL: [ProfileName; 3] = [
        ProfileName::Default,
        ProfileName::LargeCap,
        ProfileName::ForceFollowing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileName::Default => "default",
            ProfileName::LargeCap => "large_cap",
            ProfileName::ForceFollowing => "force_following",
        }
    }

    /// Parse a profile name. Unknown names return `None`.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable gating / exit parameter bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: ProfileName,
    /// Maximum fractional distance of close below the trailing 20-bar high.
    pub high_dist_max: f64,
    /// Minimum fractional rise of ma20 over `ma20_slope_lookback` bars.
    pub ma20_slope_min: f64,
    pub ma20_slope_lookback: usize,
    /// Volume-ratio ceiling; above it the bar is considered overheated.
    pub vol_overheat: f64,
    pub ret20_strong: f64,
    pub ret20_mid: f64,
    pub ret20_weak: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    /// Minimum bars between two signals.
    pub cooldown: usize,
    pub benford_weight: f64,
}

impl Profile {
    pub fn new(name: ProfileName) -> Self {
        match name {
            ProfileName::Default => Self {
                name,
                high_dist_max: 0.05,
                ma20_slope_min: 0.02,
                ma20_slope_lookback: 20,
                vol_overheat: 8.0,
                ret20_strong: 0.15,
                ret20_mid: 0.10,
                ret20_weak: 0.05,
                take_profit: 0.17,
                stop_loss: 0.07,
                cooldown: 3,
                benford_weight: 0.10,
            },
            ProfileName::LargeCap => Self {
                name,
                high_dist_max: 0.07,
                ma20_slope_min: 0.01,
                ma20_slope_lookback: 20,
                vol_overheat: 6.0,
                ret20_strong: 0.08,
                ret20_mid: 0.05,
                ret20_weak: 0.03,
                take_profit: 0.10,
                stop_loss: 0.10,
                cooldown: 5,
                benford_weight: 0.10,
            },
            ProfileName::ForceFollowing => Self {
                name,
                high_dist_max: 0.08,
                ma20_slope_min: 0.01,
                ma20_slope_lookback: 20,
                vol_overheat: 10.0,
                ret20_strong: 0.12,
                ret20_mid: 0.07,
                ret20_weak: 0.03,
                take_profit: 0.21,
                stop_loss: 0.07,
                cooldown: 5,
                benford_weight: 0.25,
            },
        }
    }

    /// Resolve a profile by name, falling back to `default` for unknown names.
    pub fn by_name(name: &str) -> Self {
        match ProfileName::parse(name) {
            Some(p) => Self::new(p),
            None => {
                tracing::warn!(profile = name, "unknown profile, using default");
                Self::new(ProfileName::Default)
            }
        }
    }

    pub fn is_force_following(&self) -> bool {
        self.name == ProfileName::ForceFollowing
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new(ProfileName::Default)
    }
}
