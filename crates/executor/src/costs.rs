use crate::error::ExecutorError;
use configuration::CostParams;
use core_types::{ExecutionMode, Side};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const BPS_DENOMINATOR: Decimal = dec!(10000);

/// The "virtual exchange" cost calculator for simulated fills.
///
/// It holds the fee/slippage/funding parameters and turns a raw bar price
/// into an execution price plus the costs of the round trip. It never
/// mutates anything; callers apply the results to their own state.
///
/// Degenerate inputs (negative quantity, negative duration) yield zero-cost
/// results rather than errors, so a skipped entry upstream can never abort
/// a replay here.
#[derive(Debug, Clone)]
pub struct CostModel {
    params: CostParams,
    mode: ExecutionMode,
}

impl CostModel {
    /// Creates a new `CostModel`, validating that the configured rates are logical.
    pub fn new(params: CostParams, mode: ExecutionMode) -> Result<Self, ExecutorError> {
        for (name, bps) in [
            ("maker_bps", params.maker_bps),
            ("taker_bps", params.taker_bps),
            ("slippage_base_bps", params.slippage_base_bps),
        ] {
            if bps < dec!(0) {
                return Err(ExecutorError::InvalidParameters(format!(
                    "{name} must not be negative"
                )));
            }
        }
        if params.slippage_atr_fraction < dec!(0) {
            return Err(ExecutorError::InvalidParameters(
                "slippage_atr_fraction must not be negative".to_string(),
            ));
        }
        Ok(Self { params, mode })
    }

    /// Round-trip fees for closing `quantity` units entered at `entry` and
    /// exited at `exit`.
    ///
    /// Maker-first mode assumes the entry rested at the maker rate while the
    /// exit crossed at the taker rate; uniform mode charges taker on both legs.
    pub fn trade_cost(&self, entry: Decimal, exit: Decimal, quantity: Decimal) -> Decimal {
        if quantity <= dec!(0) {
            return Decimal::ZERO;
        }
        let maker = self.params.maker_bps / BPS_DENOMINATOR;
        let taker = self.params.taker_bps / BPS_DENOMINATOR;
        match self.mode {
            ExecutionMode::MakerFirst => entry * quantity * maker + exit * quantity * taker,
            ExecutionMode::Taker => entry * quantity * taker + exit * quantity * taker,
        }
    }

    /// Price displacement assumed for an aggressive fill: a base rate on the
    /// price plus a fraction of the bar's ATR (half-spread proxy).
    pub fn slippage(&self, price: Decimal, atr: Decimal) -> Decimal {
        let atr = atr.max(Decimal::ZERO);
        price * (self.params.slippage_base_bps / BPS_DENOMINATOR)
            + atr * self.params.slippage_atr_fraction
    }

    /// Execution price for opening a position of `side` at `price`.
    ///
    /// In maker-first mode the entry is assumed to rest and fills at the raw
    /// price; otherwise slippage moves the fill against the opener.
    pub fn entry_fill_price(&self, price: Decimal, atr: Decimal, side: Side) -> Decimal {
        match self.mode {
            ExecutionMode::MakerFirst => price,
            ExecutionMode::Taker => {
                let bump = self.slippage(price, atr);
                match side {
                    Side::Long => price + bump,
                    Side::Short => price - bump,
                }
            }
        }
    }

    /// Execution price for closing a position of `side` at `price`. The
    /// closing leg always crosses the spread, so slippage moves the fill
    /// against the closer in both modes.
    pub fn exit_fill_price(&self, price: Decimal, atr: Decimal, side: Side) -> Decimal {
        let bump = self.slippage(price, atr);
        match side {
            Side::Long => price - bump,
            Side::Short => price + bump,
        }
    }

    /// Funding paid while holding `notional` for `hours_held` hours,
    /// linear in both.
    pub fn funding_cost(&self, notional: Decimal, hours_held: Decimal) -> Decimal {
        if notional <= dec!(0) || hours_held <= dec!(0) {
            return Decimal::ZERO;
        }
        notional * self.params.funding_rate_per_hour * hours_held
    }
}
