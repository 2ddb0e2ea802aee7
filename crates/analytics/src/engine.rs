use crate::error::AnalyticsError;
use crate::report::PerformanceReport;
use chrono::{DateTime, Utc};
use core_types::Trade;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

/// A stateless calculator for deriving performance metrics from trading activity.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for calculating performance metrics.
    ///
    /// # Arguments
    ///
    /// * `trades` - A slice of all completed `Trade`s from a trading session.
    /// * `equity_curve` - A time-series of the account's value.
    /// * `initial_capital` - The starting capital of the trading session.
    pub fn calculate(
        &self,
        trades: &[Trade],
        equity_curve: &[(DateTime<Utc>, Decimal)],
        initial_capital: Decimal,
    ) -> Result<PerformanceReport, AnalyticsError> {
        let mut report = PerformanceReport::new();

        if trades.is_empty() {
            // With no trades most metrics are zero or undefined; the zeroed
            // report says exactly that.
            return Ok(report);
        }

        self.calculate_profitability(trades, initial_capital, &mut report)?;
        self.calculate_drawdown(equity_curve, &mut report)?;
        self.calculate_time_metrics(trades, &mut report)?;
        self.calculate_sharpe(trades, &mut report);

        Ok(report)
    }

    /// Calculates all profitability-related metrics.
    fn calculate_profitability(
        &self,
        trades: &[Trade],
        initial_capital: Decimal,
        report: &mut PerformanceReport,
    ) -> Result<(), AnalyticsError> {
        report.total_trades = trades.len();

        for trade in trades {
            report.total_net_profit += trade.pnl;
            if trade.pnl > Decimal::ZERO {
                report.gross_profit += trade.pnl;
                report.winning_trades += 1;
            } else {
                report.gross_loss += trade.pnl.abs();
                report.losing_trades += 1;
            }
        }

        if report.gross_loss > Decimal::ZERO {
            report.profit_factor = Some(report.gross_profit / report.gross_loss);
        }

        if report.total_trades > 0 {
            report.win_rate_pct = Some(
                (Decimal::from(report.winning_trades) / Decimal::from(report.total_trades))
                    * Decimal::from(100),
            );
        }

        if report.winning_trades > 0 {
            report.average_win = report.gross_profit / Decimal::from(report.winning_trades);
        }

        if report.losing_trades > 0 {
            report.average_loss = report.gross_loss / Decimal::from(report.losing_trades);
            if report.average_loss > Decimal::ZERO {
                report.payoff_ratio = Some(report.average_win / report.average_loss);
            }
        }

        if initial_capital > Decimal::ZERO {
            report.total_return_pct =
                (report.total_net_profit / initial_capital) * Decimal::from(100);
        }

        Ok(())
    }

    /// Calculates maximum drawdown from the equity curve.
    fn calculate_drawdown(
        &self,
        equity_curve: &[(DateTime<Utc>, Decimal)],
        report: &mut PerformanceReport,
    ) -> Result<(), AnalyticsError> {
        if equity_curve.is_empty() {
            return Ok(());
        }

        let mut peak_equity = equity_curve[0].1;
        for &(_timestamp, equity) in equity_curve {
            if equity > peak_equity {
                peak_equity = equity;
            }
            let drawdown = peak_equity - equity;
            if drawdown > report.max_drawdown {
                report.max_drawdown = drawdown;
                if peak_equity > Decimal::ZERO {
                    report.max_drawdown_pct = (drawdown / peak_equity) * Decimal::from(100);
                }
            }
        }

        Ok(())
    }

    /// Calculates the average holding period across trades.
    fn calculate_time_metrics(
        &self,
        trades: &[Trade],
        report: &mut PerformanceReport,
    ) -> Result<(), AnalyticsError> {
        let total_held = trades
            .iter()
            .map(|t| t.exit_time - t.entry_time)
            .fold(chrono::Duration::zero(), |acc, held| acc + held);
        let count = i32::try_from(trades.len())
            .map_err(|_| AnalyticsError::Calculation("trade count overflow".to_string()))?;
        let average = total_held / count;
        report.average_holding_period = average.to_std().unwrap_or_default();
        Ok(())
    }

    /// Per-trade Sharpe ratio, annualized the way the shadow reports did it.
    /// Left unset when there are too few trades or no dispersion.
    fn calculate_sharpe(&self, trades: &[Trade], report: &mut PerformanceReport) {
        if trades.len() < 2 {
            return;
        }
        let pnls: Vec<f64> = trades
            .iter()
            .filter_map(|t| t.pnl.to_f64())
            .collect();
        if pnls.len() < 2 {
            return;
        }
        let n = pnls.len() as f64;
        let mean = pnls.iter().sum::<f64>() / n;
        let variance = pnls.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
        let stdev = variance.sqrt();
        if stdev > 0.0 {
            report.sharpe_ratio = Decimal::from_f64((mean / stdev) * 252f64.sqrt());
        }
    }
}
