use crate::error::StrategyError;
use chrono::{DateTime, Timelike, Utc};
use configuration::ExecutionParams;
use core_types::{Bar, Position, RegimeLabel, Side, Trade};
use executor::CostModel;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// What a variant contributes to the shared machine: its entry signal, its
/// regime-validity predicate and an optional volatility band for entries.
/// Everything else — sizing, partial exit, trailing, stop/target resolution,
/// costs — is common.
pub(crate) struct VariantSpec<'a> {
    pub regime: RegimeLabel,
    /// Entry signal; `None` when the variant's conditions do not hold or a
    /// needed feature is missing on this bar.
    pub entry_side: &'a dyn Fn(&Bar) -> Option<Side>,
    /// Whether the regime that justified the position still holds. A bar
    /// missing trend-strength keeps an open position alive.
    pub regime_holds: &'a dyn Fn(&Bar) -> bool,
    /// Inclusive atr_pct band an entry bar must sit inside, when enabled.
    pub atr_band: Option<(Decimal, Decimal)>,
}

/// The per-position execution state machine: `FLAT -> OPEN -> (PARTIAL) ->
/// CLOSED`, re-entrant to FLAT within one regime run.
///
/// At most one position is open at a time. Filters and degenerate sizing
/// only ever suppress entries; an open position is always evaluated for
/// exit, even on bars with missing features.
pub(crate) struct LifecycleEngine {
    exec: ExecutionParams,
    costs: CostModel,
    /// Capital put at risk per trade (equity x risk fraction).
    risk_amount: Decimal,
    /// Losing closes in a row that halt further entries for the run.
    max_consecutive_losses: u32,
    /// Minutes around each hour turn during which entries are blocked.
    block_funding_minutes: u32,
}

impl LifecycleEngine {
    pub(crate) fn new(
        exec: ExecutionParams,
        costs: CostModel,
        risk_amount: Decimal,
        max_consecutive_losses: u32,
        block_funding_minutes: u32,
    ) -> Result<Self, StrategyError> {
        if exec.stop_atr_multiple <= dec!(0) {
            return Err(StrategyError::InvalidParameters(
                "stop_atr_multiple must be greater than 0".to_string(),
            ));
        }
        if exec.partial_exit_fraction <= dec!(0) || exec.partial_exit_fraction >= dec!(1) {
            return Err(StrategyError::InvalidParameters(
                "partial_exit_fraction must be between 0 and 1".to_string(),
            ));
        }
        if risk_amount <= dec!(0) {
            return Err(StrategyError::InvalidParameters(
                "risk amount per trade must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            exec,
            costs,
            risk_amount,
            max_consecutive_losses,
            block_funding_minutes,
        })
    }

    /// Replays one regime run. The machine starts FLAT and any position
    /// still open when the run ends stays unrealized (no synthetic close).
    pub(crate) fn run(&self, bars: &[Bar], spec: &VariantSpec) -> Vec<Trade> {
        let mut trades = Vec::new();
        let mut position: Option<Position> = None;
        let mut losses_row = 0u32;

        for bar in bars {
            let price = bar.close;

            if let Some(pos) = position.as_mut() {
                // A bar without a usable ATR still manages the position; the
                // entry ATR stands in for slippage and trailing distances.
                let atr = bar.atr.filter(|a| *a > Decimal::ZERO).unwrap_or(pos.entry_atr);
                let gain = pos.favorable_move(price);
                let r = pos.stop_distance;

                // One-shot partial exit at the configured R-multiple.
                if !pos.partial_taken
                    && self.exec.partial_exit_r > dec!(0)
                    && gain >= self.exec.partial_exit_r * r
                {
                    let part_qty = pos.quantity * self.exec.partial_exit_fraction;
                    let exit_price = self.costs.exit_fill_price(price, atr, pos.side);
                    let fees = self.costs.trade_cost(pos.entry_price, exit_price, part_qty);
                    let pnl =
                        direction(pos.side) * (exit_price - pos.entry_price) * part_qty - fees;
                    trades.push(record(pos, part_qty, exit_price, bar.ts, pnl, fees));
                    pos.quantity -= part_qty;
                    pos.partial_taken = true;
                    // The stop moves to breakeven, never worse than entry.
                    pos.stop_price = match pos.side {
                        Side::Long => pos.stop_price.max(pos.entry_price),
                        Side::Short => pos.stop_price.min(pos.entry_price),
                    };
                    tracing::debug!(ts = %bar.ts, qty = %part_qty, "partial exit taken, stop at breakeven");
                }

                // Trailing stop, ratcheted so it only ever tightens.
                if self.exec.trailing_trigger_r > dec!(0)
                    && gain >= self.exec.trailing_trigger_r * r
                {
                    let candidate = match pos.side {
                        Side::Long => price - self.exec.trailing_atr_multiple * atr,
                        Side::Short => price + self.exec.trailing_atr_multiple * atr,
                    };
                    let floor = pos.trailing_stop.unwrap_or(pos.stop_price);
                    pos.trailing_stop = Some(match pos.side {
                        Side::Long => candidate.max(floor),
                        Side::Short => candidate.min(floor),
                    });
                }

                // Closure triggers. The stop is resolved before the target:
                // when both levels are touched within one bar, the loss is
                // booked.
                let stop = pos.effective_stop();
                let (stop_hit, target_hit) = match pos.side {
                    Side::Long => (bar.low <= stop, bar.high >= pos.target_price),
                    Side::Short => (bar.high >= stop, bar.low <= pos.target_price),
                };
                let regime_gone = !(spec.regime_holds)(bar);

                let exit_price = if stop_hit {
                    // A stop crosses the book as a market order.
                    Some(self.costs.exit_fill_price(stop, atr, pos.side))
                } else if target_hit {
                    // The take-profit rests at its level.
                    Some(pos.target_price)
                } else if regime_gone {
                    Some(self.costs.exit_fill_price(price, atr, pos.side))
                } else {
                    None
                };

                if let Some(exit_price) = exit_price {
                    let qty = pos.quantity;
                    let fees = self.costs.trade_cost(pos.entry_price, exit_price, qty);
                    let funding = self
                        .costs
                        .funding_cost(exit_price * qty, hours_between(pos.entry_time, bar.ts));
                    let pnl = direction(pos.side) * (exit_price - pos.entry_price) * qty
                        - fees
                        - funding;
                    trades.push(record(pos, qty, exit_price, bar.ts, pnl, fees));
                    losses_row = if pnl < dec!(0) { losses_row + 1 } else { 0 };
                    position = None;
                    tracing::debug!(ts = %bar.ts, %pnl, losses_row, "position closed");
                }
                continue;
            }

            // FLAT from here on. Everything below suppresses entries only.
            if self.max_consecutive_losses > 0 && losses_row >= self.max_consecutive_losses {
                continue;
            }
            if self.in_funding_block(bar.ts) {
                continue;
            }
            if let Some((low, high)) = spec.atr_band {
                match bar.atr_pct {
                    Some(p) if p >= low && p <= high => {}
                    _ => continue,
                }
            }
            let Some(atr) = bar.atr.filter(|a| *a > dec!(0)) else {
                continue;
            };
            let stop_distance = self.exec.stop_atr_multiple * atr;
            let quantity = self.risk_amount / stop_distance;
            if quantity <= dec!(0) {
                continue;
            }
            let Some(side) = (spec.entry_side)(bar) else {
                continue;
            };

            let entry_price = self.costs.entry_fill_price(price, atr, side);
            let (target_price, stop_price) = match side {
                Side::Long => (
                    entry_price + self.exec.target_atr_multiple * atr,
                    entry_price - stop_distance,
                ),
                Side::Short => (
                    entry_price - self.exec.target_atr_multiple * atr,
                    entry_price + stop_distance,
                ),
            };
            tracing::debug!(ts = %bar.ts, %side, %entry_price, %quantity, "position opened");
            position = Some(Position {
                side,
                quantity,
                entry_price,
                entry_time: bar.ts,
                target_price,
                stop_price,
                trailing_stop: None,
                partial_taken: false,
                regime: spec.regime,
                entry_atr: atr,
                stop_distance,
            });
        }

        trades
    }

    fn in_funding_block(&self, ts: DateTime<Utc>) -> bool {
        if self.block_funding_minutes == 0 {
            return false;
        }
        let minute = ts.minute();
        minute < self.block_funding_minutes || minute >= 60 - self.block_funding_minutes
    }
}

fn direction(side: Side) -> Decimal {
    match side {
        Side::Long => dec!(1),
        Side::Short => dec!(-1),
    }
}

fn hours_between(entry: DateTime<Utc>, exit: DateTime<Utc>) -> Decimal {
    let seconds = (exit - entry).num_seconds().max(0);
    Decimal::from(seconds) / dec!(3600)
}

fn record(
    pos: &Position,
    quantity: Decimal,
    exit_price: Decimal,
    exit_time: DateTime<Utc>,
    pnl: Decimal,
    fees: Decimal,
) -> Trade {
    Trade {
        trade_id: Uuid::new_v4(),
        side: pos.side,
        quantity,
        entry_price: pos.entry_price,
        exit_price,
        entry_time: pos.entry_time,
        exit_time,
        pnl,
        fees,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use configuration::CostParams;
    use core_types::ExecutionMode;

    fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 5, hour, minute, 0).unwrap()
    }

    fn bar(hour: u32, close: Decimal, low: Decimal, high: Decimal) -> Bar {
        Bar {
            ts: ts(hour, 30),
            open: close,
            high,
            low,
            close,
            volume: dec!(1000),
            trend_strength: Some(dec!(30)),
            atr: Some(dec!(1)),
            atr_pct: Some(dec!(0.01)),
            fast_avg: Some(close),
            slow_avg: Some(close - dec!(1)),
        }
    }

    fn exec(partial_r: Decimal, trailing_r: Decimal) -> ExecutionParams {
        ExecutionParams {
            target_atr_multiple: dec!(4),
            stop_atr_multiple: dec!(2),
            partial_exit_r: partial_r,
            partial_exit_fraction: dec!(0.5),
            trailing_trigger_r: trailing_r,
            trailing_atr_multiple: dec!(1),
            pullback_tolerance: dec!(0.25),
            deviation_band_fraction: dec!(0.10),
            mode: ExecutionMode::MakerFirst,
        }
    }

    fn free_costs() -> CostModel {
        CostModel::new(
            CostParams {
                maker_bps: dec!(0),
                taker_bps: dec!(0),
                slippage_base_bps: dec!(0),
                slippage_atr_fraction: dec!(0),
                funding_rate_per_hour: dec!(0),
            },
            ExecutionMode::MakerFirst,
        )
        .unwrap()
    }

    fn engine(exec: ExecutionParams) -> LifecycleEngine {
        LifecycleEngine::new(exec, free_costs(), dec!(100), 4, 0).unwrap()
    }

    /// Always enter long, regime always holds unless trend-strength says otherwise.
    fn long_spec<'a>(
        entry: &'a dyn Fn(&Bar) -> Option<Side>,
        regime_holds: &'a dyn Fn(&Bar) -> bool,
    ) -> VariantSpec<'a> {
        VariantSpec {
            regime: RegimeLabel::Trend,
            entry_side: entry,
            regime_holds,
            atr_band: None,
        }
    }

    fn always_long(bar: &Bar) -> Option<Side> {
        bar.trend_strength.map(|_| Side::Long)
    }

    fn regime_always(_: &Bar) -> bool {
        true
    }

    // Entry at 100 with stop_atr_multiple=2 and atr=1 gives stop 98,
    // target 104, qty 100/2 = 50.

    #[test]
    fn target_exit_realizes_the_full_move() {
        let e = engine(exec(dec!(0), dec!(0)));
        let bars = [
            bar(10, dec!(100), dec!(99.5), dec!(100.5)),
            bar(11, dec!(103.8), dec!(102), dec!(104.2)),
        ];
        let trades = e.run(&bars, &long_spec(&always_long, &regime_always));
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_price, dec!(104));
        assert_eq!(trades[0].quantity, dec!(50));
        assert_eq!(trades[0].pnl, dec!(200));
    }

    #[test]
    fn stop_is_resolved_before_target_in_the_same_bar() {
        let e = engine(exec(dec!(0), dec!(0)));
        // The second bar sweeps both the stop (98) and the target (104).
        let bars = [
            bar(10, dec!(100), dec!(99.5), dec!(100.5)),
            bar(11, dec!(101), dec!(97.5), dec!(104.5)),
        ];
        let trades = e.run(&bars, &long_spec(&always_long, &regime_always));
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_price, dec!(98));
        assert_eq!(trades[0].pnl, dec!(-100));
    }

    #[test]
    fn partial_exit_takes_half_once_and_moves_stop_to_breakeven() {
        let e = engine(exec(dec!(1), dec!(0)));
        let bars = [
            bar(10, dec!(100), dec!(99.5), dec!(100.5)),
            // Gain 2 = 1R: partial fires at close, no level is touched.
            bar(11, dec!(102), dec!(101), dec!(102.5)),
            // Gain still 1R: the partial must not fire again.
            bar(12, dec!(102), dec!(101), dec!(102.5)),
            // Breakeven stop (100) is swept.
            bar(13, dec!(100.5), dec!(99), dec!(101)),
        ];
        let trades = e.run(&bars, &long_spec(&always_long, &regime_always));
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].quantity, dec!(25));
        assert_eq!(trades[0].pnl, dec!(50));
        // Remainder exits at entry: the breakeven move capped the loss at zero.
        assert_eq!(trades[1].quantity, dec!(25));
        assert_eq!(trades[1].exit_price, dec!(100));
        assert_eq!(trades[1].pnl, dec!(0));
    }

    #[test]
    fn trailing_stop_never_loosens_on_a_retrace() {
        // Far target so the trailing path is what closes the trade;
        // trigger at 1R (gain 2), trail one ATR behind price.
        let mut wide = exec(dec!(0), dec!(1));
        wide.target_atr_multiple = dec!(10);
        let e = LifecycleEngine::new(wide, free_costs(), dec!(100), 4, 0).unwrap();
        let bars = [
            bar(10, dec!(100), dec!(99.5), dec!(100.5)),
            // Gain 3: trail activates at 103 - 1 = 102.
            bar(11, dec!(103), dec!(102.5), dec!(103.2)),
            // Trail ratchets up to 103.
            bar(12, dec!(104), dec!(103.1), dec!(104.2)),
            // Retrace: the candidate (102.5) must not replace the 103 trail.
            bar(13, dec!(103.5), dec!(103.2), dec!(103.8)),
            // 102.9 sweeps the ratcheted trail at 103.
            bar(14, dec!(103.2), dec!(102.9), dec!(103.4)),
        ];
        let trades = e.run(&bars, &long_spec(&always_long, &regime_always));
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_price, dec!(103));
        assert_eq!(trades[0].pnl, dec!(150));
    }

    #[test]
    fn regime_invalidation_closes_at_the_bar_close() {
        let e = engine(exec(dec!(0), dec!(0)));
        let holds = |b: &Bar| b.trend_strength.map(|t| t >= dec!(25)).unwrap_or(true);
        let mut weak = bar(11, dec!(101), dec!(100.5), dec!(101.5));
        weak.trend_strength = Some(dec!(20));
        let bars = [bar(10, dec!(100), dec!(99.5), dec!(100.5)), weak];
        let trades = e.run(&bars, &long_spec(&always_long, &holds));
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_price, dec!(101));
        assert_eq!(trades[0].pnl, dec!(50));
    }

    #[test]
    fn missing_or_degenerate_atr_suppresses_entry_only() {
        let e = engine(exec(dec!(0), dec!(0)));
        let mut no_atr = bar(10, dec!(100), dec!(99.5), dec!(100.5));
        no_atr.atr = None;
        let mut zero_atr = bar(11, dec!(100), dec!(99.5), dec!(100.5));
        zero_atr.atr = Some(dec!(0));
        let trades = e.run(&[no_atr, zero_atr], &long_spec(&always_long, &regime_always));
        assert!(trades.is_empty());
    }

    #[test]
    fn open_position_still_exits_on_a_featureless_bar() {
        let e = engine(exec(dec!(0), dec!(0)));
        let mut blind = bar(11, dec!(97.9), dec!(97.8), dec!(100));
        blind.atr = None;
        blind.trend_strength = None;
        blind.fast_avg = None;
        blind.slow_avg = None;
        let bars = [bar(10, dec!(100), dec!(99.5), dec!(100.5)), blind];
        let trades = e.run(&bars, &long_spec(&always_long, &regime_always));
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_price, dec!(98));
    }

    #[test]
    fn loss_streak_halts_entries_for_the_rest_of_the_run() {
        let mut params = exec(dec!(0), dec!(0));
        params.target_atr_multiple = dec!(10);
        let e = LifecycleEngine::new(params, free_costs(), dec!(100), 2, 0).unwrap();
        let bars = [
            bar(10, dec!(100), dec!(99.5), dec!(100.5)),
            bar(11, dec!(98.5), dec!(97.5), dec!(99)), // stop-out 1
            bar(12, dec!(100), dec!(99.5), dec!(100.5)),
            bar(13, dec!(98.5), dec!(97.5), dec!(99)), // stop-out 2
            bar(14, dec!(100), dec!(99.5), dec!(100.5)), // entry suppressed
            bar(15, dec!(100), dec!(99.5), dec!(100.5)),
        ];
        let trades = e.run(&bars, &long_spec(&always_long, &regime_always));
        assert_eq!(trades.len(), 2);
        assert!(trades.iter().all(|t| t.pnl < dec!(0)));
    }

    #[test]
    fn funding_accrues_with_holding_hours() {
        let costs = CostModel::new(
            CostParams {
                maker_bps: dec!(0),
                taker_bps: dec!(0),
                slippage_base_bps: dec!(0),
                slippage_atr_fraction: dec!(0),
                funding_rate_per_hour: dec!(0.001),
            },
            ExecutionMode::MakerFirst,
        )
        .unwrap();
        let e = LifecycleEngine::new(exec(dec!(0), dec!(0)), costs, dec!(100), 4, 0).unwrap();
        let bars = [
            bar(10, dec!(100), dec!(99.5), dec!(100.5)),
            bar(12, dec!(103.8), dec!(102), dec!(104.2)),
        ];
        let trades = e.run(&bars, &long_spec(&always_long, &regime_always));
        assert_eq!(trades.len(), 1);
        // 2 hours on a 104 * 50 notional at 0.1%/h costs 10.4.
        assert_eq!(trades[0].pnl, dec!(200) - dec!(10.4));
    }

    #[test]
    fn entries_are_blocked_around_the_funding_turn() {
        let params = exec(dec!(0), dec!(0));
        let e = LifecycleEngine::new(params, free_costs(), dec!(100), 4, 5).unwrap();
        let mut early = bar(10, dec!(100), dec!(99.5), dec!(100.5));
        early.ts = ts(10, 57); // inside the 5-minute blackout
        let mut late = bar(11, dec!(100), dec!(99.5), dec!(100.5));
        late.ts = ts(11, 3); // still inside
        let trades = e.run(&[early, late], &long_spec(&always_long, &regime_always));
        assert!(trades.is_empty());
    }
}
