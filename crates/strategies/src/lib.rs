//! # Bastion Strategies Crate
//!
//! One position lifecycle state machine (`FLAT -> OPEN -> PARTIAL ->
//! CLOSED`, re-entrant to FLAT) shared by two regime variants. The variants
//! differ only in their entry signal: trend-following buys pullbacks to the
//! fast average inside a strong trend, mean-reversion fades deviations from
//! the rolling reference inside a range. Everything after entry — partial
//! exit, trailing ratchet, stop/target resolution, funding on close — is the
//! same machine with the same conservative tie-break.

pub mod error;
pub mod lifecycle;
pub mod mean_reversion;
pub mod trend;

// Re-export the key components to provide a clean, public-facing API.
pub use error::StrategyError;
pub use mean_reversion::MeanReversion;
pub use trend::TrendFollowing;

use core_types::{Bar, RegimeLabel, Trade};

/// A strategy variant that consumes one contiguous regime run and returns
/// the trades it produced. A run always starts FLAT; positions never cross
/// run boundaries.
pub trait RunStrategy {
    /// The regime label this variant handles.
    fn regime(&self) -> RegimeLabel;

    /// Replays `bars` through the lifecycle machine.
    fn run(&self, bars: &[Bar]) -> Result<Vec<Trade>, StrategyError>;
}
