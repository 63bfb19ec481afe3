//! MySQL connection handle for Q4M queue tables.
//!
//! Holds a single connection rather than a pool: Q4M ties the claim on a
//! queue row to the connection that issued `queue_wait`, so the worker must
//! run every call of a claim cycle on the same connection.

pub mod q4m;

use crate::error::Result;
use sqlx::{Connection, MySqlConnection};

/// Database handle. Owns one MySQL connection.
pub struct Db {
    conn: MySqlConnection,
    /// Table of the row this connection currently owns, if any.
    claimed: Option<String>,
}

impl Db {
    /// Open a connection to MySQL.
    pub async fn connect(url: &str) -> Result<Self> {
        let conn = MySqlConnection::connect(url).await?;
        Ok(Self {
            conn,
            claimed: None,
        })
    }

    /// Simple health check, run a SELECT 1.
    pub async fn health_check(&mut self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&mut self.conn).await?;
        Ok(())
    }

    pub(crate) fn conn(&mut self) -> &mut MySqlConnection {
        &mut self.conn
    }

    pub(crate) async fn close_connection(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}
