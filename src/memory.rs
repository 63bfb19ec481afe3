//! In-process emulation of the Q4M queue contract.
//!
//! [`MemoryEngine`] holds queue tables in memory and hands out independent
//! [`MemorySession`]s, each behaving like its own MySQL connection: a wait
//! claims the first row nobody owns, other sessions cannot see that row
//! until it is aborted, and ending the claim deletes it. Useful for tests
//! and for embedding a worker without a database.

use crate::error::{Error, Result};
use crate::model::JobRecord;
use crate::session::QueueSession;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Q4M's `queue_wait` timeout when none is given.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Row {
    id: u64,
    owner: Option<u64>,
    record: JobRecord,
}

#[derive(Debug, Default)]
struct Tables {
    tables: HashMap<String, Vec<Row>>,
    next_row: u64,
}

impl Tables {
    fn table_mut(&mut self, table: &str) -> Result<&mut Vec<Row>> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| Error::Other(format!("table {table} doesn't exist")))
    }
}

struct Inner {
    tables: Mutex<Tables>,
    /// Woken whenever a row becomes claimable.
    available: Notify,
    next_session: AtomicU64,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Shared in-memory queue storage.
#[derive(Clone)]
pub struct MemoryEngine {
    inner: Arc<Inner>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: Mutex::new(Tables::default()),
                available: Notify::new(),
                next_session: AtomicU64::new(1),
            }),
        }
    }

    /// Create `table` if it does not exist yet.
    pub fn create_table(&self, table: &str) {
        self.inner.lock().tables.entry(table.to_string()).or_default();
    }

    /// Append a job to `table`, creating the table if needed.
    pub fn push(&self, table: &str, record: JobRecord) {
        {
            let mut tables = self.inner.lock();
            let id = tables.next_row;
            tables.next_row += 1;
            tables.tables.entry(table.to_string()).or_default().push(Row {
                id,
                owner: None,
                record,
            });
        }
        self.inner.available.notify_waiters();
    }

    /// All rows of `table` in enqueue order, owned or not.
    pub fn rows(&self, table: &str) -> Vec<JobRecord> {
        self.inner
            .lock()
            .tables
            .get(table)
            .map(|rows| rows.iter().map(|r| r.record.clone()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self, table: &str) -> usize {
        self.inner.lock().tables.get(table).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// Open a new, independent session.
    pub fn session(&self) -> MemorySession {
        MemorySession {
            inner: Arc::clone(&self.inner),
            id: self.inner.next_session.fetch_add(1, Ordering::Relaxed),
            owned: None,
        }
    }
}

/// One connection's view of a [`MemoryEngine`].
pub struct MemorySession {
    inner: Arc<Inner>,
    id: u64,
    /// `(table, row id)` while in owner mode.
    owned: Option<(String, u64)>,
}

impl MemorySession {
    /// Whether this session currently owns a row.
    pub fn is_owner(&self) -> bool {
        self.owned.is_some()
    }

    fn try_claim(&mut self, table: &str) -> Result<bool> {
        let mut tables = self.inner.lock();
        let rows = tables.table_mut(table)?;
        match rows.iter_mut().find(|r| r.owner.is_none()) {
            Some(row) => {
                row.owner = Some(self.id);
                self.owned = Some((table.to_string(), row.id));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn release(&mut self, delete: bool) -> Result<()> {
        let (table, id) = self
            .owned
            .take()
            .ok_or_else(|| Error::Other("not in queue owner mode".to_string()))?;
        {
            let mut tables = self.inner.lock();
            let rows = tables.table_mut(&table)?;
            if delete {
                rows.retain(|r| r.id != id);
            } else if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
                row.owner = None;
            }
        }
        if !delete {
            self.inner.available.notify_waiters();
        }
        Ok(())
    }
}

#[async_trait]
impl QueueSession for MemorySession {
    async fn count(&mut self, table: &str) -> Result<u64> {
        let mut tables = self.inner.lock();
        Ok(tables.table_mut(table)?.len() as u64)
    }

    async fn wait(&mut self, table: &str, timeout: Option<Duration>) -> Result<bool> {
        // A second wait in owner mode consumes the previously owned row.
        if self.owned.is_some() {
            self.release(true)?;
        }

        let deadline = Instant::now() + timeout.unwrap_or(DEFAULT_WAIT_TIMEOUT);
        let inner = Arc::clone(&self.inner);
        loop {
            let notified = inner.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.try_claim(table)? {
                return Ok(true);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(false);
            }
        }
    }

    async fn fetch_head(&mut self, table: &str) -> Result<Option<JobRecord>> {
        let mut tables = self.inner.lock();
        let rows = tables.table_mut(table)?;
        let row = match &self.owned {
            Some((owned_table, id)) if owned_table == table => {
                rows.iter().find(|r| r.id == *id)
            }
            _ => rows.iter().find(|r| r.owner.is_none()),
        };
        Ok(row.map(|r| r.record.clone()))
    }

    async fn end(&mut self) -> Result<()> {
        self.release(true)
    }

    async fn abort(&mut self) -> Result<()> {
        self.release(false)
    }

    async fn close(mut self) -> Result<()> {
        if self.owned.is_some() {
            self.release(false)?;
        }
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        // A dropped connection returns its row, as the server does.
        if self.owned.is_some() {
            let _ = self.release(false);
        }
    }
}
