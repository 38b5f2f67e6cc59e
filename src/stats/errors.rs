use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
