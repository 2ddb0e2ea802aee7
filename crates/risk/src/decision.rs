use rust_decimal::Decimal;
use serde::Serialize;

/// One tripped gate. `pre_trade_check` collects every reason that applies
/// rather than stopping at the first, so callers get a complete diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockReason {
    KillSwitch,
    ForbiddenWindow,
    DailyLimit { daily_pnl: Decimal, limit: Decimal },
    WeeklyLimit { weekly_pnl: Decimal, limit: Decimal },
    MaxDrawdown { drawdown: Decimal, limit: Decimal },
    ConsecutiveLosses { count: u32, limit: u32 },
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockReason::KillSwitch => write!(f, "kill_switch=ON"),
            BlockReason::ForbiddenWindow => write!(f, "forbidden_window"),
            BlockReason::DailyLimit { daily_pnl, limit } => {
                write!(f, "daily_limit_reached({daily_pnl}<=-{limit})")
            }
            BlockReason::WeeklyLimit { weekly_pnl, limit } => {
                write!(f, "weekly_limit_reached({weekly_pnl}<=-{limit})")
            }
            BlockReason::MaxDrawdown { drawdown, limit } => {
                write!(f, "max_drawdown_reached({drawdown}>={limit})")
            }
            BlockReason::ConsecutiveLosses { limit, .. } => {
                write!(f, "consecutive_losses>={limit}")
            }
        }
    }
}

/// The decision record returned by every `pre_trade_check` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskDecision {
    pub allowed: bool,
    pub reasons: Vec<BlockReason>,
    /// Equity multiplied by the configured per-trade risk fraction.
    pub max_risk_amount: Decimal,
    pub equity: Decimal,
    pub symbol: String,
}

impl RiskDecision {
    /// Joins the reasons the way they are logged, "ok" when none tripped.
    pub fn summary(&self) -> String {
        if self.reasons.is_empty() {
            "ok".to_string()
        } else {
            self.reasons
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(";")
        }
    }
}
