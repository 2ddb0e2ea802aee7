use crate::enums::{RegimeLabel, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single bar of market data with its externally-computed features.
///
/// The engine never derives indicators itself; a missing feature is `None`
/// and suppresses any decision that would need it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Close time of the bar.
    pub ts: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,

    /// Bounded trend-conviction indicator (ADX-like), regime signal.
    pub trend_strength: Option<Decimal>,
    /// Average true range in price units.
    pub atr: Option<Decimal>,
    /// ATR expressed as a fraction of price.
    pub atr_pct: Option<Decimal>,
    /// Fast rolling trend average, also the mean-reversion reference level.
    pub fast_avg: Option<Decimal>,
    /// Slow rolling trend average.
    pub slow_avg: Option<Decimal>,
}

/// One open position, owned exclusively by the lifecycle engine that
/// created it. Exists only between entry and final close.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub side: Side,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub target_price: Decimal,
    pub stop_price: Decimal,
    /// Ratcheted stop, present once the trailing trigger has been reached.
    pub trailing_stop: Option<Decimal>,
    /// Set after the one-shot partial exit has been taken.
    pub partial_taken: bool,
    /// Regime of the run that opened this position.
    pub regime: RegimeLabel,
    /// ATR at entry; management distances are multiples of this.
    pub entry_atr: Decimal,
    /// Initial stop distance (one R).
    pub stop_distance: Decimal,
}

impl Position {
    /// Signed favorable price move per unit at `price`. Positive means the
    /// position is in profit before costs.
    pub fn favorable_move(&self, price: Decimal) -> Decimal {
        match self.side {
            Side::Long => price - self.entry_price,
            Side::Short => self.entry_price - price,
        }
    }

    /// The stop currently protecting the position: the trailed stop once it
    /// exists, the initial stop otherwise.
    pub fn effective_stop(&self) -> Decimal {
        self.trailing_stop.unwrap_or(self.stop_price)
    }
}

/// An immutable record of a full or partial position close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: Uuid,
    pub side: Side,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    /// Realized profit net of fees, slippage and funding.
    pub pnl: Decimal,
    pub fees: Decimal,
}
