use core_types::ExecutionMode;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backtest: Backtest,
    pub risk_limits: RiskLimits,
    pub portfolio_limits: PortfolioLimits,
    pub execution: ExecutionParams,
    pub costs: CostParams,
    pub regime: RegimeParams,
    pub state: StateParams,
}

/// Contains parameters for a single backtest run.
#[derive(Debug, Clone, Deserialize)]
pub struct Backtest {
    /// The symbol the bar file belongs to (e.g., "BTCUSDT").
    pub symbol: String,
    /// The initial starting capital for the simulation.
    pub initial_capital: Decimal,
}

/// Hard limits enforced by the pre-trade risk kernel. Amounts are absolute,
/// in the account's quote currency.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskLimits {
    pub max_daily_loss: Decimal,
    pub max_weekly_loss: Decimal,
    pub max_drawdown: Decimal,
    pub max_consecutive_losses: u32,
    /// Fraction of equity put at risk on a single trade (e.g., 0.0035).
    pub risk_per_trade_fraction: Decimal,
    /// Semicolon-delimited "HH:MM-HH:MM" pairs during which entries are blocked.
    /// A window whose end precedes its start spans midnight.
    #[serde(default)]
    pub forbidden_windows: String,
}

/// Limits applied by the portfolio guard when replaying a finished trade
/// sequence, as fractions of starting capital.
#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioLimits {
    pub max_daily_loss_pct: Decimal,
    pub max_weekly_loss_pct: Decimal,
    pub max_drawdown_pct: Decimal,
}

/// Position-management parameters, expressed as ATR multiples and R-multiples
/// of the initial stop distance.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionParams {
    pub target_atr_multiple: Decimal,
    pub stop_atr_multiple: Decimal,
    /// Favorable move, in R, at which the one-shot partial exit fires. Zero disables.
    pub partial_exit_r: Decimal,
    /// Fraction of the position closed by the partial exit.
    #[serde(default = "default_partial_fraction")]
    pub partial_exit_fraction: Decimal,
    /// Favorable move, in R, that activates the trailing stop. Zero disables.
    pub trailing_trigger_r: Decimal,
    pub trailing_atr_multiple: Decimal,
    /// Trend entries require price within this many ATRs of the fast average.
    #[serde(default = "default_pullback_tolerance")]
    pub pullback_tolerance: Decimal,
    /// Mean-reversion entries require a deviation beyond
    /// `reference * band_fraction * atr_pct`.
    #[serde(default = "default_deviation_band")]
    pub deviation_band_fraction: Decimal,
    pub mode: ExecutionMode,
}

fn default_partial_fraction() -> Decimal {
    dec!(0.5)
}

fn default_pullback_tolerance() -> Decimal {
    dec!(0.25)
}

fn default_deviation_band() -> Decimal {
    dec!(0.10)
}

/// Fee, slippage and funding assumptions for simulated executions.
#[derive(Debug, Clone, Deserialize)]
pub struct CostParams {
    pub maker_bps: Decimal,
    pub taker_bps: Decimal,
    pub slippage_base_bps: Decimal,
    /// Extra slippage as a fraction of the bar's ATR (half-spread proxy).
    pub slippage_atr_fraction: Decimal,
    pub funding_rate_per_hour: Decimal,
}

/// Regime classification and run-dispatch parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct RegimeParams {
    /// Trend-strength value at or above which a bar is labelled Trend.
    pub trend_threshold: Decimal,
    /// Runs shorter than this produce no trades.
    pub min_run_len: usize,
    /// Minutes around each hour turn during which entries are blocked
    /// (simplified funding blackout). Zero disables.
    #[serde(default)]
    pub block_funding_minutes: u32,
    /// When set, trend entries require the bar's atr_pct to sit inside the
    /// run's [low, high] quantile band.
    #[serde(default)]
    pub use_atr_quantile: bool,
    #[serde(default = "default_atrq_low")]
    pub atr_quantile_low: Decimal,
    #[serde(default = "default_atrq_high")]
    pub atr_quantile_high: Decimal,
}

fn default_atrq_low() -> Decimal {
    dec!(0.2)
}

fn default_atrq_high() -> Decimal {
    dec!(0.9)
}

/// Where the kernel's durable state lives.
#[derive(Debug, Clone, Deserialize)]
pub struct StateParams {
    /// Path of the risk-state JSON file.
    pub path: String,
}

impl Config {
    /// Checks that the loaded values are logical before any component is
    /// constructed from them.
    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        use crate::error::ConfigError;

        let frac = self.risk_limits.risk_per_trade_fraction;
        if frac <= dec!(0) || frac >= dec!(1) {
            return Err(ConfigError::ValidationError(
                "risk_per_trade_fraction must be between 0 and 1".to_string(),
            ));
        }
        if self.execution.stop_atr_multiple <= dec!(0) {
            return Err(ConfigError::ValidationError(
                "stop_atr_multiple must be greater than 0".to_string(),
            ));
        }
        if self.execution.target_atr_multiple <= dec!(0) {
            return Err(ConfigError::ValidationError(
                "target_atr_multiple must be greater than 0".to_string(),
            ));
        }
        let pf = self.execution.partial_exit_fraction;
        if pf <= dec!(0) || pf >= dec!(1) {
            return Err(ConfigError::ValidationError(
                "partial_exit_fraction must be between 0 and 1".to_string(),
            ));
        }
        if self.backtest.initial_capital <= dec!(0) {
            return Err(ConfigError::ValidationError(
                "initial_capital must be greater than 0".to_string(),
            ));
        }
        if self.regime.min_run_len == 0 {
            return Err(ConfigError::ValidationError(
                "min_run_len must be at least 1".to_string(),
            ));
        }
        for bps in [
            self.costs.maker_bps,
            self.costs.taker_bps,
            self.costs.slippage_base_bps,
        ] {
            if bps < dec!(0) {
                return Err(ConfigError::ValidationError(
                    "fee and slippage rates must not be negative".to_string(),
                ));
            }
        }
        // Windows are validated eagerly so a typo fails at startup, not at
        // the first pre-trade check.
        crate::windows::parse_windows(&self.risk_limits.forbidden_windows)?;
        Ok(())
    }
}
