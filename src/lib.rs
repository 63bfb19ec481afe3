//! # q4m-worker
//!
//! Worker-side client for MySQL Q4M queue tables.
//!
//! A [`Queue`](queue::Queue) names a table and handles one row at a time; a
//! [`Worker`](worker::Worker) claims the head row with `queue_wait`, runs the
//! handler, and resolves the claim with `queue_end` or `queue_abort`.
//! Sessions are connection-scoped: MySQL through [`db::Db`], or in process
//! through [`memory::MemoryEngine`].

pub mod config;
pub mod db;
pub mod error;
pub mod hook;
pub mod memory;
pub mod model;
pub mod naming;
pub mod queue;
pub mod runner;
pub mod session;
pub mod telemetry;
pub mod worker;

pub use error::{Error, Result};
pub use model::JobRecord;
pub use queue::Queue;
pub use session::QueueSession;
pub use worker::{Claim, RunOutcome, Worker, WorkerConfig};
