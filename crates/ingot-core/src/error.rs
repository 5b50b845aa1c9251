//! Error types for Ingot.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Task not found")]
    NotFound,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("worker was kicked")]
    WorkerKicked,

    /// Terminal failure recorded on a task's lease, surfaced by `wait`.
    #[error("Task failed: {0}")]
    TaskFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
