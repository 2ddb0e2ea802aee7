use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Cost parameters from configuration are invalid: {0}")]
    InvalidParameters(String),
}
