//! Domain types: bars, profiles, the pending order / position lifecycle, trades.

pub mod bar;
pub mod order;
pub mod position;
pub mod profile;
pub mod trade;

pub use bar::{validate_bars, Bar, BarError};
pub use order::{FillOutcome, PendingOrder};
pub use position::Position;
pub use profile::{Profile, ProfileName};
pub use trade::{net_return_pct, ExitReason, Trade};
