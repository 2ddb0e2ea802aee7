//! # Bastion Executor Crate
//!
//! This crate provides the cost side of simulated trade execution: fees,
//! slippage and funding. It defines the `CostModel`, a pure calculator that
//! determines the monetary effects of a fill without holding any state.
//!
//! ## Architectural Principles
//!
//! - **State vs. Logic Decoupling:** The `CostModel` only computes the
//!   effects of a trade (execution price, fees, funding). The position
//!   lifecycle engine is the state machine that applies those effects.
//!   This separation is key for testability and clarity.
//!
//! ## Public API
//!
//! - `CostModel`: fee/slippage/funding arithmetic for simulated fills.
//! - `ExecutorError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod costs;
pub mod error;

// Re-export the key components to provide a clean, public-facing API.
pub use costs::CostModel;
pub use error::ExecutorError;
