use crate::decision::{BlockReason, RiskDecision};
use crate::error::RiskError;
use crate::state::RiskState;
use crate::store::StateStore;
use chrono::{DateTime, Datelike, Utc};
use configuration::{ForbiddenWindow, RiskLimits, parse_windows};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// The persistent pre-trade gate.
///
/// A state machine over [`RiskState`] with four transitions:
/// `pre_trade_check`, `on_equity_update`, `on_fill` and
/// `toggle_kill_switch`. Every mutation is written through the
/// [`StateStore`]; a failed write degrades to a warning because decision
/// methods must never fail.
///
/// The kernel performs no locking. Run one instance per (environment,
/// project) or per symbol and serialize access to it; the state is not
/// designed for concurrent mutation.
pub struct RiskKernel {
    limits: RiskLimits,
    windows: Vec<ForbiddenWindow>,
    store: Box<dyn StateStore>,
    state: RiskState,
}

impl RiskKernel {
    /// Creates a kernel from validated limits, loading whatever state the
    /// store currently holds.
    pub fn new(limits: RiskLimits, store: Box<dyn StateStore>) -> Result<Self, RiskError> {
        if limits.risk_per_trade_fraction <= dec!(0) || limits.risk_per_trade_fraction >= dec!(1) {
            return Err(RiskError::InvalidParameters(
                "risk_per_trade_fraction must be between 0 and 1".to_string(),
            ));
        }
        let windows = parse_windows(&limits.forbidden_windows)
            .map_err(|e| RiskError::InvalidParameters(e.to_string()))?;
        let state = store.load();
        Ok(Self { limits, windows, store, state })
    }

    /// Read-only view of the current accumulators.
    pub fn state(&self) -> &RiskState {
        &self.state
    }

    /// Decides whether a new position may be opened right now.
    pub fn pre_trade_check(&mut self, equity: Decimal, symbol: &str) -> RiskDecision {
        self.pre_trade_check_at(equity, symbol, Utc::now())
    }

    /// Deterministic variant of [`Self::pre_trade_check`] used by replays and tests.
    ///
    /// Performs the daily/weekly rollover first, then evaluates every gate
    /// additively; `allowed` holds iff no reason tripped.
    pub fn pre_trade_check_at(
        &mut self,
        equity: Decimal,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> RiskDecision {
        let mut dirty = self.roll_daily_weekly(now);
        let mut reasons = Vec::new();

        if self.state.kill_switch {
            reasons.push(BlockReason::KillSwitch);
        }
        if self.in_forbidden_window(now) {
            reasons.push(BlockReason::ForbiddenWindow);
        }
        let daily_limit = self.limits.max_daily_loss.abs();
        if self.state.daily_pnl <= -daily_limit {
            reasons.push(BlockReason::DailyLimit {
                daily_pnl: self.state.daily_pnl,
                limit: daily_limit,
            });
        }
        let weekly_limit = self.limits.max_weekly_loss.abs();
        if self.state.weekly_pnl <= -weekly_limit {
            reasons.push(BlockReason::WeeklyLimit {
                weekly_pnl: self.state.weekly_pnl,
                limit: weekly_limit,
            });
        }
        // The drawdown gate needs a watermark; bootstrap it on first sight.
        if self.state.equity_high_watermark.is_zero() {
            self.state.equity_high_watermark = equity;
            dirty = true;
        }
        let drawdown = self.state.equity_high_watermark - equity;
        let dd_limit = self.limits.max_drawdown.abs();
        if drawdown >= dd_limit {
            reasons.push(BlockReason::MaxDrawdown { drawdown, limit: dd_limit });
        }
        if self.state.consecutive_losses >= self.limits.max_consecutive_losses {
            reasons.push(BlockReason::ConsecutiveLosses {
                count: self.state.consecutive_losses,
                limit: self.limits.max_consecutive_losses,
            });
        }

        if dirty {
            self.persist();
        }

        let decision = RiskDecision {
            allowed: reasons.is_empty(),
            max_risk_amount: equity * self.limits.risk_per_trade_fraction,
            reasons,
            equity,
            symbol: symbol.to_string(),
        };
        if decision.allowed {
            tracing::debug!(symbol, %equity, "pre-trade check passed");
        } else {
            tracing::warn!(symbol, %equity, reasons = %decision.summary(), "pre-trade check blocked");
        }
        decision
    }

    /// Raises the equity high-watermark; persists only when it moved.
    pub fn on_equity_update(&mut self, equity: Decimal) {
        if equity > self.state.equity_high_watermark {
            self.state.equity_high_watermark = equity;
            self.persist();
        }
    }

    /// Books a realized pnl into the rolling accumulators.
    pub fn on_fill(&mut self, pnl: Decimal, is_closed_trade: bool, is_win: Option<bool>) {
        self.on_fill_at(pnl, is_closed_trade, is_win, Utc::now());
    }

    /// Deterministic variant of [`Self::on_fill`].
    ///
    /// Rolls over first so a fill landing just past midnight is booked into
    /// the fresh day. The loss streak moves only on closed trades; a partial
    /// exit contributes pnl without touching it. When `is_win` is not
    /// supplied, a win is `pnl > 0`.
    pub fn on_fill_at(
        &mut self,
        pnl: Decimal,
        is_closed_trade: bool,
        is_win: Option<bool>,
        now: DateTime<Utc>,
    ) {
        self.roll_daily_weekly(now);
        self.state.daily_pnl += pnl;
        self.state.weekly_pnl += pnl;
        if is_closed_trade {
            let win = is_win.unwrap_or(pnl > Decimal::ZERO);
            if win {
                self.state.consecutive_losses = 0;
            } else {
                self.state.consecutive_losses += 1;
            }
        }
        self.persist();
    }

    /// Engages or releases the kill switch. The only transition that skips
    /// rollover: an operator override must stick exactly as issued.
    pub fn toggle_kill_switch(&mut self, on: bool) {
        self.state.kill_switch = on;
        self.persist();
        tracing::info!(kill_switch = on, "kill switch toggled");
    }

    /// Resets the accumulators if the UTC calendar day or ISO week changed
    /// since the last call. The loss streak is a daily breaker and resets
    /// with the day. Returns whether state was mutated.
    fn roll_daily_weekly(&mut self, now: DateTime<Utc>) -> bool {
        let day = now.format("%Y-%m-%d").to_string();
        let iso = now.iso_week();
        let week = format!("{}-W{:02}", iso.year(), iso.week());
        let mut changed = false;
        if self.state.last_day != day {
            self.state.daily_pnl = Decimal::ZERO;
            self.state.consecutive_losses = 0;
            self.state.last_day = day;
            changed = true;
        }
        if self.state.last_iso_week != week {
            self.state.weekly_pnl = Decimal::ZERO;
            self.state.last_iso_week = week;
            changed = true;
        }
        changed
    }

    fn in_forbidden_window(&self, now: DateTime<Utc>) -> bool {
        let t = now.time();
        self.windows.iter().any(|w| w.contains(t))
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.state) {
            tracing::warn!(error = %e, "failed to persist risk state, continuing with in-memory state");
        }
    }
}
