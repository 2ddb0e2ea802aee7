//! # Bastion Risk Crate
//!
//! The persistent pre-trade gate. [`RiskKernel`] tracks rolling daily and
//! weekly loss, drawdown from the equity peak and the consecutive-loss
//! streak, and answers one question before any order: may a new position be
//! opened right now?
//!
//! State durability goes through the [`StateStore`] seam so the kernel can
//! survive restarts without knowing where its state lives.

pub mod decision;
pub mod error;
pub mod kernel;
pub mod state;
pub mod store;

// Re-export the key components to provide a clean, public-facing API.
pub use decision::{BlockReason, RiskDecision};
pub use error::RiskError;
pub use kernel::RiskKernel;
pub use state::RiskState;
pub use store::{JsonStateStore, MemoryStateStore, StateStore};
