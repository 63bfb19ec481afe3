//! Tests for the in-memory Q4M emulation.

use q4m_worker::memory::MemoryEngine;
use q4m_worker::{JobRecord, QueueSession};
use std::time::Duration;

fn job(id: &str) -> JobRecord {
    JobRecord::from_pairs([("id", Some(id))])
}

#[tokio::test]
async fn concurrent_sessions_claim_disjoint_rows() {
    let engine = MemoryEngine::new();
    engine.push("jobs", job("1"));
    engine.push("jobs", job("2"));

    let mut a = engine.session();
    let mut b = engine.session();

    assert!(a.wait("jobs", None).await.unwrap());
    assert!(b.wait("jobs", None).await.unwrap());

    assert_eq!(a.fetch_head("jobs").await.unwrap(), Some(job("1")));
    assert_eq!(b.fetch_head("jobs").await.unwrap(), Some(job("2")));
}

#[tokio::test]
async fn end_deletes_and_abort_restores() {
    let engine = MemoryEngine::new();
    engine.push("jobs", job("1"));
    engine.push("jobs", job("2"));
    let mut session = engine.session();

    assert!(session.wait("jobs", None).await.unwrap());
    session.abort().await.unwrap();
    assert_eq!(engine.rows("jobs"), vec![job("1"), job("2")]);

    assert!(session.wait("jobs", None).await.unwrap());
    assert_eq!(session.fetch_head("jobs").await.unwrap(), Some(job("1")));
    session.end().await.unwrap();
    assert_eq!(engine.rows("jobs"), vec![job("2")]);
    assert!(!session.is_owner());
}

#[tokio::test]
async fn second_wait_in_owner_mode_consumes_previous_row() {
    let engine = MemoryEngine::new();
    engine.push("jobs", job("1"));
    engine.push("jobs", job("2"));
    let mut session = engine.session();

    assert!(session.wait("jobs", None).await.unwrap());
    assert!(session.wait("jobs", None).await.unwrap());

    assert_eq!(engine.rows("jobs"), vec![job("2")]);
    assert_eq!(session.fetch_head("jobs").await.unwrap(), Some(job("2")));
}

#[tokio::test]
async fn wait_times_out_on_empty_table() {
    let engine = MemoryEngine::new();
    engine.create_table("jobs");
    let mut session = engine.session();

    let claimed = session
        .wait("jobs", Some(Duration::from_millis(20)))
        .await
        .unwrap();
    assert!(!claimed);
}

#[tokio::test]
async fn blocked_wait_wakes_on_push() {
    let engine = MemoryEngine::new();
    engine.create_table("jobs");
    let mut session = engine.session();

    let producer = engine.clone();
    let push = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        producer.push("jobs", job("late"));
    });

    let claimed = session
        .wait("jobs", Some(Duration::from_secs(5)))
        .await
        .unwrap();
    push.await.unwrap();

    assert!(claimed);
    assert_eq!(session.fetch_head("jobs").await.unwrap(), Some(job("late")));
}

#[tokio::test]
async fn closing_an_owner_session_returns_its_row() {
    let engine = MemoryEngine::new();
    engine.push("jobs", job("1"));

    let mut owner = engine.session();
    assert!(owner.wait("jobs", None).await.unwrap());
    let mut other = engine.session();
    assert_eq!(other.fetch_head("jobs").await.unwrap(), None);

    owner.close().await.unwrap();
    assert_eq!(other.fetch_head("jobs").await.unwrap(), Some(job("1")));
}

#[tokio::test]
async fn abort_outside_owner_mode_fails() {
    let engine = MemoryEngine::new();
    engine.create_table("jobs");
    let mut session = engine.session();
    assert!(session.abort().await.is_err());
    assert!(session.end().await.is_err());
}

#[tokio::test]
async fn count_includes_owned_rows_and_rejects_unknown_tables() {
    let engine = MemoryEngine::new();
    engine.push("jobs", job("1"));
    let mut session = engine.session();
    assert!(session.wait("jobs", None).await.unwrap());

    assert_eq!(session.count("jobs").await.unwrap(), 1);
    assert!(session.count("missing").await.is_err());
}
