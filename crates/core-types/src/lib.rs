pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{ExecutionMode, RegimeLabel, Side, TruncationScope};
pub use error::CoreError;
pub use structs::{Bar, Position, Trade};
