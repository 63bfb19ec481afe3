//! Span helpers for a single claim/execute/resolve cycle.

use tracing::Span;
use uuid::Uuid;

/// Start a span covering one `run` of a worker.
///
/// `job.result` is declared empty and filled by [`record_job_result`].
pub fn start_job_span(table: &str, worker_id: &Uuid) -> Span {
    tracing::info_span!(
        "q4m.job",
        "q4m.table" = table,
        "q4m.worker" = %worker_id,
        "job.result" = tracing::field::Empty,
    )
}

/// Record how the claim was closed ("committed", "aborted", ...).
pub fn record_job_result(span: &Span, result: &str) {
    span.record("job.result", result);
}
