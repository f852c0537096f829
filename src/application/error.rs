use crate::domain::models::ValidationError;
use crate::infrastructure::error::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("async runtime unavailable: {0}")]
    Runtime(String),
}
