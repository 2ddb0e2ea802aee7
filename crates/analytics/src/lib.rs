//! # Bastion Analytics Crate
//!
//! Stateless performance accounting over a finished trade ledger and its
//! equity curve. Produces the [`PerformanceReport`] consumed by the CLI and
//! any downstream tooling.

pub mod engine;
pub mod error;
pub mod report;

// Re-export the key components to provide a clean, public-facing API.
pub use engine::AnalyticsEngine;
pub use error::AnalyticsError;
pub use report::PerformanceReport;
