use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Risk parameters from configuration are invalid: {0}")]
    InvalidParameters(String),

    #[error("Failed to persist risk state: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("Failed to encode risk state: {0}")]
    Encoding(#[from] serde_json::Error),
}
