use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Strategy parameters from configuration are invalid: {0}")]
    InvalidParameters(String),

    #[error("Cost model rejected its parameters: {0}")]
    Cost(#[from] executor::ExecutorError),
}
