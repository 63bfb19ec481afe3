//! Metric instruments for queue workers.
//!
//! All instruments come from the `"q4m-worker"` meter on the globally
//! registered `MeterProvider`; with none registered they are no-ops.

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("q4m-worker")
}

/// Counter: engine calls (count, wait, fetch, end, abort).
/// Labels: `table`, `operation`.
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("q4m.queue.operations")
        .with_description("Number of queue engine calls")
        .build()
}

/// Counter: jobs handed to a handler.
/// Labels: `table`, `result` ("committed" | "aborted").
pub fn jobs_executed() -> Counter<u64> {
    meter()
        .u64_counter("q4m.jobs.executed")
        .with_description("Number of claimed jobs resolved by a worker")
        .build()
}

/// Histogram: handler duration in milliseconds.
/// Labels: `table`.
pub fn job_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("q4m.job.duration_ms")
        .with_description("Job handler duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Record one engine call against `table`.
pub fn record_operation(table: &str, operation: &'static str) {
    queue_operations().add(
        1,
        &[
            KeyValue::new("table", table.to_string()),
            KeyValue::new("operation", operation),
        ],
    );
}
