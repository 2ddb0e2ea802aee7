use chrono::{DateTime, Datelike, NaiveDate, Utc};
use configuration::PortfolioLimits;
use core_types::{Trade, TruncationScope};
use rust_decimal::Decimal;
use serde::Serialize;

/// Why and where the guard cut the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Truncation {
    pub scope: TruncationScope,
    pub at: DateTime<Utc>,
    pub reason: String,
}

/// Post-hoc circuit breaker over a finished trade sequence.
///
/// Replays trades in exit-time order, tracking a UTC-day pnl accumulator, an
/// ISO-week accumulator and drawdown from the running equity peak. The first
/// trade whose application breaches a limit is excluded along with everything
/// after it; the guard fires once and does not resume within a replay.
/// Truncation is a normal terminal outcome, not an error.
#[derive(Debug, Clone)]
pub struct PortfolioRiskGuard {
    day_limit: Decimal,
    week_limit: Decimal,
    drawdown_limit: Decimal,
}

impl PortfolioRiskGuard {
    /// Limits arrive as fractions of starting capital and are fixed into
    /// absolute amounts here, once.
    pub fn new(capital: Decimal, limits: &PortfolioLimits) -> Self {
        Self {
            day_limit: capital * limits.max_daily_loss_pct,
            week_limit: capital * limits.max_weekly_loss_pct,
            drawdown_limit: capital * limits.max_drawdown_pct,
        }
    }

    /// Returns the surviving prefix of `trades` (assumed already in
    /// chronological exit order) and the truncation record, if any.
    pub fn replay(&self, trades: &[Trade]) -> (Vec<Trade>, Option<Truncation>) {
        let mut kept = Vec::with_capacity(trades.len());

        let mut equity = Decimal::ZERO;
        let mut peak = Decimal::ZERO;
        let mut day_pnl = Decimal::ZERO;
        let mut week_pnl = Decimal::ZERO;
        let mut current_day: Option<NaiveDate> = None;
        let mut current_week: Option<(i32, u32)> = None;

        for trade in trades {
            let ts = trade.exit_time;
            let day = ts.date_naive();
            let iso = ts.iso_week();
            let week = (iso.year(), iso.week());

            // Accumulators reset exactly on the UTC day / ISO week turning.
            if current_day != Some(day) {
                day_pnl = Decimal::ZERO;
                current_day = Some(day);
            }
            if current_week != Some(week) {
                week_pnl = Decimal::ZERO;
                current_week = Some(week);
            }

            day_pnl += trade.pnl;
            week_pnl += trade.pnl;
            equity += trade.pnl;
            peak = peak.max(equity);
            let drawdown = peak - equity;

            let breach = if day_pnl < Decimal::ZERO && -day_pnl >= self.day_limit {
                Some((
                    TruncationScope::Daily,
                    format!("daily loss {day_pnl} breaches limit {}", self.day_limit),
                ))
            } else if week_pnl < Decimal::ZERO && -week_pnl >= self.week_limit {
                Some((
                    TruncationScope::Weekly,
                    format!("weekly loss {week_pnl} breaches limit {}", self.week_limit),
                ))
            } else if drawdown >= self.drawdown_limit {
                Some((
                    TruncationScope::Drawdown,
                    format!("drawdown {drawdown} breaches limit {}", self.drawdown_limit),
                ))
            } else {
                None
            };

            if let Some((scope, reason)) = breach {
                tracing::warn!(%scope, %reason, at = %ts, "portfolio guard truncated the ledger");
                return (kept, Some(Truncation { scope, at: ts, reason }));
            }

            kept.push(trade.clone());
        }

        (kept, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_types::Side;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn limits() -> PortfolioLimits {
        PortfolioLimits {
            max_daily_loss_pct: dec!(0.02),
            max_weekly_loss_pct: dec!(0.06),
            max_drawdown_pct: dec!(0.12),
        }
    }

    fn trade(ts: DateTime<Utc>, pnl: Decimal) -> Trade {
        Trade {
            trade_id: Uuid::new_v4(),
            side: Side::Long,
            quantity: dec!(1),
            entry_price: dec!(100),
            exit_price: dec!(100) + pnl,
            entry_time: ts,
            exit_time: ts,
            pnl,
            fees: Decimal::ZERO,
        }
    }

    fn ts(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, d, h, 0, 0).unwrap()
    }

    // Capital 10,000: day limit 200, week limit 600, drawdown limit 1,200.

    #[test]
    fn clean_sequence_passes_through_untouched() {
        let guard = PortfolioRiskGuard::new(dec!(10000), &limits());
        let trades = vec![
            trade(ts(5, 10), dec!(50)),
            trade(ts(5, 12), dec!(-100)),
            trade(ts(6, 10), dec!(-150)),
        ];
        let (kept, truncation) = guard.replay(&trades);
        assert_eq!(kept.len(), 3);
        assert!(truncation.is_none());
    }

    #[test]
    fn daily_breach_drops_the_breaching_trade_and_the_rest() {
        let guard = PortfolioRiskGuard::new(dec!(10000), &limits());
        let trades = vec![
            trade(ts(5, 10), dec!(-150)),
            trade(ts(5, 12), dec!(-60)), // day total -210 <= -200
            trade(ts(5, 14), dec!(500)), // never reached
        ];
        let (kept, truncation) = guard.replay(&trades);
        assert_eq!(kept.len(), 1);
        let cut = truncation.unwrap();
        assert_eq!(cut.scope, TruncationScope::Daily);
        assert_eq!(cut.at, ts(5, 12));
        // The surviving ledger's pnl excludes everything at or after the breach.
        let total: Decimal = kept.iter().map(|t| t.pnl).sum();
        assert_eq!(total, dec!(-150));
    }

    #[test]
    fn day_accumulator_resets_at_the_utc_boundary() {
        let guard = PortfolioRiskGuard::new(dec!(10000), &limits());
        // -150 on two consecutive days never breaches the 200 day limit.
        let trades = vec![
            trade(ts(5, 23), dec!(-150)),
            trade(ts(6, 1), dec!(-150)),
        ];
        let (kept, truncation) = guard.replay(&trades);
        assert_eq!(kept.len(), 2);
        assert!(truncation.is_none());
    }

    #[test]
    fn weekly_losses_accumulate_across_days() {
        let guard = PortfolioRiskGuard::new(dec!(10000), &limits());
        // Mon/Tue/Wed of ISO week 32, each below the day limit; the week
        // total crosses 600 on Wednesday.
        let trades = vec![
            trade(ts(4, 10), dec!(-190)),
            trade(ts(5, 10), dec!(-190)),
            trade(ts(6, 10), dec!(-190)),
            trade(ts(7, 10), dec!(-40)),
        ];
        let (kept, truncation) = guard.replay(&trades);
        assert_eq!(kept.len(), 3);
        assert_eq!(truncation.unwrap().scope, TruncationScope::Weekly);
    }

    #[test]
    fn week_accumulator_resets_on_the_iso_week_turn() {
        // Day limit widened to 500 so only the week limit (600) is in play.
        let wide_days = PortfolioLimits {
            max_daily_loss_pct: dec!(0.05),
            max_weekly_loss_pct: dec!(0.06),
            max_drawdown_pct: dec!(0.12),
        };
        let guard = PortfolioRiskGuard::new(dec!(10000), &wide_days);
        // Sunday of ISO week 32, then Monday of week 33: without the reset
        // the week total (-800) would breach.
        let trades = vec![
            trade(ts(10, 10), dec!(-400)),
            trade(ts(11, 10), dec!(-400)),
        ];
        let (kept, truncation) = guard.replay(&trades);
        assert_eq!(kept.len(), 2);
        assert!(truncation.is_none());
    }

    #[test]
    fn drawdown_from_peak_trips_after_a_run_up() {
        let wide = PortfolioLimits {
            max_daily_loss_pct: dec!(0.9),
            max_weekly_loss_pct: dec!(0.9),
            max_drawdown_pct: dec!(0.02), // 200 absolute
        };
        let guard = PortfolioRiskGuard::new(dec!(10000), &wide);
        // Spread over weeks so only drawdown is in play.
        let trades = vec![
            trade(ts(1, 10), dec!(800)),
            trade(ts(8, 10), dec!(700)), // peak 1500
            trade(ts(15, 10), dec!(-120)),
            trade(ts(22, 10), dec!(-110)), // equity 1270, drawdown 230
        ];
        let (kept, truncation) = guard.replay(&trades);
        assert_eq!(kept.len(), 3);
        assert_eq!(truncation.unwrap().scope, TruncationScope::Drawdown);
    }

    #[test]
    fn empty_ledger_is_a_no_op() {
        let guard = PortfolioRiskGuard::new(dec!(10000), &limits());
        let (kept, truncation) = guard.replay(&[]);
        assert!(kept.is_empty());
        assert!(truncation.is_none());
    }
}
