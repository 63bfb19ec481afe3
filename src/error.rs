//! Error types for q4m-worker.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// An override point was invoked on a queue that never supplied it.
    #[error("{0} must be implemented by the queue type")]
    Unimplemented(&'static str),

    #[error("invalid queue table name: {0:?}")]
    InvalidTableName(String),

    #[error("queue {table} returned no row under an open claim")]
    EmptyClaim { table: String },

    /// The job handler failed. The claim has been aborted by the time
    /// this reaches the caller of `run`.
    #[error("job failed: {0}")]
    Job(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("worker connection is closed")]
    Closed,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap any handler error as a job failure.
    pub fn job(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Job(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
