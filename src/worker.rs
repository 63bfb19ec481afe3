//! Queue worker: claim one row, hand it to the queue's handler, resolve it.
//!
//! Each [`Worker::run`] performs one claim cycle against the queue's table:
//!
//! 1. probe the table (or reuse the construction-time probe) and return
//!    [`RunOutcome::Idle`] when it is empty;
//! 2. `queue_wait` until this session owns the head row;
//! 3. fetch that row and log it;
//! 4. run [`Queue::execute`];
//! 5. `queue_end` on success, `queue_abort` on failure.
//!
//! The open claim is held by a [`Claim`] guard. Every path out of a claim
//! closes it with exactly one of commit or abort; a guard dropped while
//! still open (panic, cancelled future) is aborted before the session is
//! used again.

use crate::error::{Error, Result};
use crate::model::JobRecord;
use crate::naming::validate_table_name;
use crate::queue::Queue;
use crate::session::QueueSession;
use crate::telemetry::job::{record_job_result, start_job_span};
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use std::time::{Duration, Instant};
use tracing::{Instrument, Span, debug, error, info, warn};
use uuid::Uuid;

/// When the worker checks whether its table has rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbePolicy {
    /// Count rows before every run.
    #[default]
    EveryRun,
    /// Count rows once when the worker is built and trust that answer.
    OnConstruction,
}

impl std::str::FromStr for ProbePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "every_run" => Ok(ProbePolicy::EveryRun),
            "construction" | "on_construction" => Ok(ProbePolicy::OnConstruction),
            other => Err(Error::Config(format!(
                "unknown probe policy {other:?} (expected every_run or construction)"
            ))),
        }
    }
}

/// Worker settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerConfig {
    /// Timeout handed to `queue_wait`. `None` uses the engine default.
    pub wait_timeout: Option<Duration>,
    pub probe: ProbePolicy,
}

/// What a single [`Worker::run`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The table was empty; nothing was claimed.
    Idle,
    /// The engine timed out before a row could be claimed.
    TimedOut,
    /// The job was handled and removed from the queue.
    Completed(JobRecord),
}

/// An open claim on the head row of a queue table.
///
/// Close it with [`Claim::commit`] or [`Claim::abort`]. Dropping it open
/// leaves the row owned by the session until the worker aborts it.
pub struct Claim<'w, S: QueueSession> {
    session: &'w mut S,
    abandoned: &'w mut bool,
    table: &'w str,
    open: bool,
}

impl<'w, S: QueueSession> Claim<'w, S> {
    async fn acquire(
        session: &'w mut S,
        abandoned: &'w mut bool,
        table: &'w str,
        timeout: Option<Duration>,
    ) -> Result<Option<Self>> {
        if !session.wait(table, timeout).await? {
            debug!(table, "queue_wait timed out");
            return Ok(None);
        }
        Ok(Some(Self {
            session,
            abandoned,
            table,
            open: true,
        }))
    }

    /// The claimed row.
    pub async fn job(&mut self) -> Result<Option<JobRecord>> {
        self.session.fetch_head(self.table).await
    }

    /// Remove the claimed row from the queue for good.
    pub async fn commit(mut self) -> Result<()> {
        self.session.end().await?;
        self.open = false;
        Ok(())
    }

    /// Return the claimed row to the queue for another worker.
    pub async fn abort(mut self) -> Result<()> {
        error!(table = self.table, "job aborted, row returned to queue");
        self.session.abort().await?;
        self.open = false;
        Ok(())
    }
}

impl<S: QueueSession> Drop for Claim<'_, S> {
    fn drop(&mut self) {
        if self.open {
            warn!(table = self.table, "claim dropped while open, will abort");
            *self.abandoned = true;
        }
    }
}

/// Consumes one queue table through one session.
pub struct Worker<Q, S> {
    id: Uuid,
    queue: Q,
    session: Option<S>,
    table: String,
    has_jobs: bool,
    abandoned: bool,
    config: WorkerConfig,
}

impl<Q: Queue, S: QueueSession> Worker<Q, S> {
    /// Build a worker with default settings and probe its table.
    pub async fn new(session: S, queue: Q) -> Result<Self> {
        Self::with_config(session, queue, WorkerConfig::default()).await
    }

    /// Build a worker and probe its table.
    ///
    /// Fails if the queue cannot name a valid table or the probe fails.
    pub async fn with_config(session: S, queue: Q, config: WorkerConfig) -> Result<Self> {
        let table = queue.table_name()?;
        validate_table_name(&table)?;

        let mut worker = Self {
            id: Uuid::new_v4(),
            queue,
            session: Some(session),
            table,
            has_jobs: false,
            abandoned: false,
            config,
        };
        if !worker.probe().await? {
            warn!(table = %worker.table, "no job in queue");
        }
        Ok(worker)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Result of the latest probe.
    pub fn has_jobs(&self) -> bool {
        self.has_jobs
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_none()
    }

    /// Count the table's rows and remember whether it has any.
    pub async fn probe(&mut self) -> Result<bool> {
        let session = self.session.as_mut().ok_or(Error::Closed)?;
        let count = session.count(&self.table).await?;
        self.has_jobs = count > 0;
        debug!(table = %self.table, count, "probed queue");
        Ok(self.has_jobs)
    }

    /// Run one claim cycle, then shut down if `terminate` is set.
    ///
    /// A handler failure aborts the claim and is returned as-is, even when
    /// the abort itself fails; that claim is aborted again on the next run.
    /// If that retry fails too, the worker closes its session and every
    /// later call returns [`Error::Closed`]. Engine failures propagate
    /// without retry.
    pub async fn run(&mut self, terminate: bool) -> Result<RunOutcome> {
        let outcome = self.run_once().await?;
        if terminate {
            self.shutdown().await?;
        }
        Ok(outcome)
    }

    async fn run_once(&mut self) -> Result<RunOutcome> {
        self.recover_abandoned().await?;
        if self.config.probe == ProbePolicy::EveryRun {
            self.probe().await?;
        }
        if !self.has_jobs {
            return Ok(RunOutcome::Idle);
        }

        let span = start_job_span(&self.table, &self.id);
        let session = self.session.as_mut().ok_or(Error::Closed)?;
        process_claim(
            &self.queue,
            session,
            &mut self.abandoned,
            &self.table,
            self.config.wait_timeout,
            &span,
        )
        .instrument(span.clone())
        .await
    }

    /// Open a claim for manual handling.
    ///
    /// Returns `None` if the engine timed out. The caller decides between
    /// [`Claim::commit`] and [`Claim::abort`].
    pub async fn claim(&mut self) -> Result<Option<Claim<'_, S>>> {
        self.recover_abandoned().await?;
        let session = self.session.as_mut().ok_or(Error::Closed)?;
        Claim::acquire(
            session,
            &mut self.abandoned,
            &self.table,
            self.config.wait_timeout,
        )
        .await
    }

    async fn recover_abandoned(&mut self) -> Result<()> {
        if !self.abandoned {
            return Ok(());
        }
        let session = self.session.as_mut().ok_or(Error::Closed)?;
        error!(table = %self.table, "aborting abandoned claim");
        let result = session.abort().await;
        self.abandoned = false;
        let Err(e) = result else {
            return Ok(());
        };

        // The session may still own the row, and a later wait would consume
        // it. Closing the connection is the remaining way to hand it back.
        error!(table = %self.table, error = %e, "abort of abandoned claim failed, closing worker");
        if let Some(session) = self.session.take() {
            if let Err(close_err) = session.close().await {
                warn!(table = %self.table, error = %close_err, "close after failed abort failed");
            }
        }
        Err(e)
    }

    /// Close the session. Later calls are no-ops.
    pub async fn shutdown(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        if self.abandoned {
            if let Err(e) = session.abort().await {
                warn!(table = %self.table, error = %e, "abort on shutdown failed");
            }
            self.abandoned = false;
        }
        session.close().await?;
        info!(table = %self.table, worker = %self.id, "worker shut down");
        Ok(())
    }
}

async fn process_claim<Q: Queue, S: QueueSession>(
    queue: &Q,
    session: &mut S,
    abandoned: &mut bool,
    table: &str,
    wait_timeout: Option<Duration>,
    span: &Span,
) -> Result<RunOutcome> {
    let Some(mut claim) = Claim::acquire(session, abandoned, table, wait_timeout).await? else {
        record_job_result(span, "timed_out");
        return Ok(RunOutcome::TimedOut);
    };

    let Some(job) = claim.job().await? else {
        if let Err(abort_err) = claim.abort().await {
            error!(table, error = %abort_err, "abort of empty claim failed");
        }
        record_job_result(span, "empty");
        return Err(Error::EmptyClaim {
            table: table.to_string(),
        });
    };

    info!(job = %job, "Executing");
    let started = Instant::now();
    let result = queue.execute(&job).await;
    metrics::job_duration_ms().record(
        started.elapsed().as_secs_f64() * 1000.0,
        &[KeyValue::new("table", table.to_string())],
    );

    match result {
        Ok(()) => {
            claim.commit().await?;
            record_resolution(span, table, "committed");
            Ok(RunOutcome::Completed(job))
        }
        Err(e) => {
            warn!(error = %e, "job handler failed");
            // The handler's error wins. An open claim is retried on the next run.
            if let Err(abort_err) = claim.abort().await {
                error!(table, error = %abort_err, "abort after job failure failed");
            }
            record_resolution(span, table, "aborted");
            Err(e)
        }
    }
}

fn record_resolution(span: &Span, table: &str, result: &'static str) {
    record_job_result(span, result);
    metrics::jobs_executed().add(
        1,
        &[
            KeyValue::new("table", table.to_string()),
            KeyValue::new("result", result),
        ],
    );
}
