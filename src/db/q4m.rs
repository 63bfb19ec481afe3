//! Q4M queue calls via direct SQLx.
//!
//! Calls Q4M's SQL functions: queue_wait, queue_end, queue_abort. Row
//! fetches go through the text protocol so every column decodes as text
//! regardless of the table's schema.

use super::Db;
use crate::error::Result;
use crate::model::JobRecord;
use crate::naming::validate_table_name;
use crate::session::QueueSession;
use crate::telemetry::metrics::record_operation;
use async_trait::async_trait;
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Executor, Row};
use std::time::Duration;

/// Backquote `table` or `db.table` for use as an identifier.
fn quote_table(table: &str) -> Result<String> {
    validate_table_name(table)?;
    Ok(table
        .split('.')
        .map(|part| format!("`{part}`"))
        .collect::<Vec<_>>()
        .join("."))
}

/// `queue_wait` takes whole seconds. Round up so a sub-second timeout
/// still blocks, and clamp to the bind type.
fn wait_seconds(timeout: Duration) -> i64 {
    let secs = timeout
        .as_secs()
        .saturating_add(u64::from(timeout.subsec_nanos() > 0));
    i64::try_from(secs).unwrap_or(i64::MAX)
}

fn decode_row(row: &MySqlRow) -> Result<JobRecord> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        let raw: Option<Vec<u8>> = row.try_get_unchecked(i)?;
        columns.push(column.name().to_string());
        values.push(raw.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()));
    }
    Ok(JobRecord::new(columns, values))
}

#[async_trait]
impl QueueSession for Db {
    async fn count(&mut self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_table(table)?);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(self.conn()).await?;
        record_operation(table, "count");
        Ok(count.max(0) as u64)
    }

    async fn wait(&mut self, table: &str, timeout: Option<Duration>) -> Result<bool> {
        validate_table_name(table)?;
        let owned: Option<i64> = match timeout {
            Some(timeout) => {
                sqlx::query_scalar("SELECT queue_wait(?, ?)")
                    .bind(table)
                    .bind(wait_seconds(timeout))
                    .fetch_one(self.conn())
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT queue_wait(?)")
                    .bind(table)
                    .fetch_one(self.conn())
                    .await?
            }
        };
        let claimed = owned == Some(1);
        record_operation(table, if claimed { "wait" } else { "wait_timeout" });
        self.claimed = claimed.then(|| table.to_string());
        Ok(claimed)
    }

    async fn fetch_head(&mut self, table: &str) -> Result<Option<JobRecord>> {
        let sql = format!("SELECT * FROM {} LIMIT 1", quote_table(table)?);
        let row = Executor::fetch_optional(self.conn(), sqlx::raw_sql(&sql)).await?;
        record_operation(table, "fetch");
        row.as_ref().map(decode_row).transpose()
    }

    async fn end(&mut self) -> Result<()> {
        sqlx::query("SELECT queue_end()").execute(self.conn()).await?;
        let table = self.claimed.take().unwrap_or_default();
        record_operation(&table, "end");
        Ok(())
    }

    async fn abort(&mut self) -> Result<()> {
        sqlx::query("SELECT queue_abort()")
            .execute(self.conn())
            .await?;
        let table = self.claimed.take().unwrap_or_default();
        record_operation(&table, "abort");
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.close_connection().await
    }
}
