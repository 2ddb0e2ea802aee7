//! # Bastion Backtester Crate
//!
//! The deterministic replay pipeline: classify bars into regime runs,
//! dispatch each run to the matching strategy variant, stitch the trades
//! back into one chronological ledger, and pass it through the portfolio
//! guard. Single-threaded and synchronous by design; replaying the same
//! bars with the same configuration always produces the same ledger.

use analytics::{AnalyticsEngine, PerformanceReport};
use chrono::{DateTime, Utc};
use configuration::Config;
use core_types::{Bar, RegimeLabel, Trade};
use executor::CostModel;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use strategies::{MeanReversion, RunStrategy, TrendFollowing};

pub mod error;
pub mod guard;
pub mod regime;

// Re-export the key components to provide a clean, public-facing API.
pub use error::BacktestError;
pub use guard::{PortfolioRiskGuard, Truncation};
pub use regime::{RegimeClassifier, RegimeRun};

/// Everything a replay produces: the guarded ledger, the equity curve
/// derived from it, the truncation outcome and the performance report.
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<(DateTime<Utc>, Decimal)>,
    pub truncation: Option<Truncation>,
    pub final_equity: Decimal,
    pub performance: PerformanceReport,
}

/// The main replay engine.
///
/// Owns one instance of each strategy variant; every run is dispatched
/// wholesale to the variant matching its label, and a run's machine always
/// starts FLAT, so no position ever crosses a regime boundary.
pub struct Orchestrator {
    classifier: RegimeClassifier,
    guard: PortfolioRiskGuard,
    trend: TrendFollowing,
    mean_reversion: MeanReversion,
    analytics: AnalyticsEngine,
    initial_capital: Decimal,
}

impl Orchestrator {
    /// Wires the pipeline from one validated configuration value.
    pub fn new(config: &Config) -> Result<Self, BacktestError> {
        let costs = CostModel::new(config.costs.clone(), config.execution.mode)?;
        let risk_amount =
            config.backtest.initial_capital * config.risk_limits.risk_per_trade_fraction;
        let max_losses = config.risk_limits.max_consecutive_losses;

        let trend = TrendFollowing::new(
            config.execution.clone(),
            &config.regime,
            costs.clone(),
            risk_amount,
            max_losses,
        )?;
        let mean_reversion = MeanReversion::new(
            config.execution.clone(),
            &config.regime,
            costs,
            risk_amount,
            max_losses,
        )?;

        Ok(Self {
            classifier: RegimeClassifier::new(&config.regime),
            guard: PortfolioRiskGuard::new(
                config.backtest.initial_capital,
                &config.portfolio_limits,
            ),
            trend,
            mean_reversion,
            analytics: AnalyticsEngine::new(),
            initial_capital: config.backtest.initial_capital,
        })
    }

    /// Runs the simulation over a pre-materialized bar sequence.
    pub fn run(&self, bars: &[Bar]) -> Result<BacktestReport, BacktestError> {
        if bars.is_empty() {
            return Err(BacktestError::DataUnavailable);
        }

        let runs = self.classifier.runs(bars);
        let progress_bar = ProgressBar::new(runs.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .progress_chars("=>-"),
        );

        let mut trades: Vec<Trade> = Vec::new();
        for run in &runs {
            tracing::debug!(label = ?run.label, bars = run.bars.len(), "dispatching regime run");
            let run_trades = match run.label {
                RegimeLabel::Trend => self.trend.run(run.bars)?,
                RegimeLabel::Range => self.mean_reversion.run(run.bars)?,
            };
            trades.extend(run_trades);
            progress_bar.inc(1);
        }
        progress_bar.finish_with_message("Replay complete.");

        // Runs are disjoint and dispatched in order, so the ledger is already
        // chronological; the sort pins down the guard's exit-time contract.
        trades.sort_by_key(|t| t.exit_time);

        let (trades, truncation) = self.guard.replay(&trades);
        let equity_curve = self.equity_curve(bars, &trades);
        let final_equity = equity_curve
            .last()
            .map(|&(_, eq)| eq)
            .unwrap_or(self.initial_capital);
        let performance =
            self.analytics
                .calculate(&trades, &equity_curve, self.initial_capital)?;

        Ok(BacktestReport {
            trades,
            equity_curve,
            truncation,
            final_equity,
            performance,
        })
    }

    /// Capital plus cumulative realized pnl, sampled at each trade exit.
    fn equity_curve(
        &self,
        bars: &[Bar],
        trades: &[Trade],
    ) -> Vec<(DateTime<Utc>, Decimal)> {
        let mut curve = Vec::with_capacity(trades.len() + 1);
        curve.push((bars[0].ts, self.initial_capital));
        let mut equity = self.initial_capital;
        for trade in trades {
            equity += trade.pnl;
            curve.push((trade.exit_time, equity));
        }
        curve
    }
}
