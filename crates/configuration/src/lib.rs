use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;
pub mod windows;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{
    Backtest, Config, CostParams, ExecutionParams, PortfolioLimits, RegimeParams, RiskLimits,
    StateParams,
};
pub use windows::{ForbiddenWindow, parse_windows};

/// Loads the application configuration from a TOML file.
///
/// This function is the primary entry point for this crate. It reads the
/// configuration file, deserializes it into our strongly-typed `Config`
/// struct, validates it, and returns it. Components never read ambient
/// environment state; they are handed this value once, at construction.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path))
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}
