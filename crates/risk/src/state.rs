use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The durable accumulators behind the pre-trade gate.
///
/// Mutated only by the `RiskKernel`, persisted after every mutation, and
/// expected to survive process restarts. A missing or corrupt state file
/// falls back to this zeroed default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskState {
    // Accumulators.
    pub daily_pnl: Decimal,
    pub weekly_pnl: Decimal,
    pub equity_high_watermark: Decimal,
    pub consecutive_losses: u32,
    // Rollover bookkeeping.
    /// Calendar day of the last rollover, "YYYY-MM-DD".
    pub last_day: String,
    /// ISO week of the last rollover, "YYYY-Www".
    pub last_iso_week: String,
    pub kill_switch: bool,
}
