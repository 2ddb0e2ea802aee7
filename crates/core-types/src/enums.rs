use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Returns the opposite side of a position.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// Market regime assigned to a bar by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegimeLabel {
    Trend,
    Range,
}

/// How entry orders are assumed to execute, which determines the fee schedule
/// and whether entry slippage applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Entry rests as a maker order (maker fee, no entry slippage); exits are taker.
    MakerFirst,
    /// Both legs cross the spread at the taker fee with slippage.
    Taker,
}

/// Which limit the portfolio guard tripped when it truncated the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TruncationScope {
    Daily,
    Weekly,
    Drawdown,
}

impl std::fmt::Display for TruncationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TruncationScope::Daily => write!(f, "DAILY"),
            TruncationScope::Weekly => write!(f, "WEEKLY"),
            TruncationScope::Drawdown => write!(f, "MDD"),
        }
    }
}
