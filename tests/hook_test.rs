//! Tests for the external-command queue.

use q4m_worker::hook::CommandQueue;
use q4m_worker::memory::MemoryEngine;
use q4m_worker::{Error, JobRecord, Queue, RunOutcome, Worker};

fn job() -> JobRecord {
    JobRecord::from_pairs([("id", Some("1")), ("payload", Some("hello"))])
}

#[test]
fn command_queue_uses_its_configured_table() {
    let queue = CommandQueue::new("shop.mailings", "true");
    assert_eq!(queue.table_name().unwrap(), "shop.mailings");
}

#[tokio::test]
async fn zero_exit_status_succeeds() {
    let queue = CommandQueue::new("mailings", "true");
    queue.execute(&job()).await.unwrap();
}

#[tokio::test]
async fn non_zero_exit_status_is_a_job_failure() {
    let queue = CommandQueue::new("mailings", "false");
    let err = queue.execute(&job()).await.unwrap_err();
    assert!(matches!(err, Error::Job(_)), "got {err:?}");
}

#[tokio::test]
async fn command_sees_job_in_environment() {
    let queue = CommandQueue::new("mailings", "sh").args([
        "-c",
        r#"test "$Q4M_TABLE" = mailings && test "$Q4M_JOB" = '{"id":"1","payload":"hello"}'"#,
    ]);
    queue.execute(&job()).await.unwrap();
}

#[tokio::test]
async fn worker_aborts_when_command_fails() {
    let engine = MemoryEngine::new();
    engine.push("mailings", job());
    let mut worker = Worker::new(engine.session(), CommandQueue::new("mailings", "false"))
        .await
        .unwrap();

    assert!(worker.run(false).await.is_err());
    assert_eq!(engine.rows("mailings"), vec![job()]);
}

#[tokio::test]
async fn worker_commits_when_command_succeeds() {
    let engine = MemoryEngine::new();
    engine.push("mailings", job());
    let mut worker = Worker::new(engine.session(), CommandQueue::new("mailings", "true"))
        .await
        .unwrap();

    assert_eq!(worker.run(true).await.unwrap(), RunOutcome::Completed(job()));
    assert!(engine.is_empty("mailings"));
}
