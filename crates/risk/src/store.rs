use crate::error::RiskError;
use crate::state::RiskState;
use std::fs;
use std::path::PathBuf;

/// Where the kernel's durable state lives.
///
/// The kernel loads through this seam once at construction and saves after
/// every mutation. Implementations must treat a missing or unreadable state
/// as the zeroed default rather than failing: losing the accumulators is
/// recoverable, refusing to trade decisions is not.
pub trait StateStore: Send {
    fn load(&self) -> RiskState;
    fn save(&self, state: &RiskState) -> Result<(), RiskError>;
}

/// JSON-file backed store, one file per kernel key.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> RiskState {
        match fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "corrupt risk state file, starting from defaults"
                    );
                    RiskState::default()
                }
            },
            Err(_) => RiskState::default(),
        }
    }

    fn save(&self, state: &RiskState) -> Result<(), RiskError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Volatile store for replays and tests where durability is unwanted.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: std::cell::RefCell<RiskState>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> RiskState {
        self.state.borrow().clone()
    }

    fn save(&self, state: &RiskState) -> Result<(), RiskError> {
        *self.state.borrow_mut() = state.clone();
        Ok(())
    }
}
