//! Connection-scoped queue engine calls.
//!
//! Q4M tracks "this connection owns the head row" per connection, so every
//! session wraps exactly one connection and a claim can never leak between
//! workers on different sessions.

use crate::error::Result;
use crate::model::JobRecord;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait QueueSession: Send {
    /// Number of rows currently in `table`.
    async fn count(&mut self, table: &str) -> Result<u64>;

    /// Block until this session owns a row of `table`.
    ///
    /// Returns `false` if the engine timed out without a row. `None` uses
    /// the engine's default timeout.
    async fn wait(&mut self, table: &str, timeout: Option<Duration>) -> Result<bool>;

    /// First row of `table` visible to this session. Under a claim this is
    /// the owned row.
    async fn fetch_head(&mut self, table: &str) -> Result<Option<JobRecord>>;

    /// Close the claim and delete the owned row.
    async fn end(&mut self) -> Result<()>;

    /// Close the claim and return the owned row to the queue.
    async fn abort(&mut self) -> Result<()>;

    /// Close the underlying connection.
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}
