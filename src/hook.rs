//! Queue whose handler is an external command.
//!
//! The command receives the claimed row through its environment:
//! `Q4M_TABLE` names the queue table and `Q4M_JOB` holds the row as a
//! JSON object keyed by column. Exit status zero commits the job; anything
//! else aborts it.

use crate::error::{Error, Result};
use crate::model::JobRecord;
use crate::queue::Queue;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

pub struct CommandQueue {
    table: String,
    command: PathBuf,
    args: Vec<String>,
}

impl CommandQueue {
    pub fn new(table: impl Into<String>, command: impl Into<PathBuf>) -> Self {
        Self {
            table: table.into(),
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Relative paths containing a separator resolve against the current
    /// directory; bare names are looked up on `PATH`.
    fn resolved_command(&self) -> Result<PathBuf> {
        let command: &Path = &self.command;
        if command.is_relative() && command.components().count() > 1 {
            Ok(std::env::current_dir()?.join(command))
        } else {
            Ok(command.to_path_buf())
        }
    }
}

#[async_trait]
impl Queue for CommandQueue {
    fn type_name(&self) -> &str {
        "CommandQueue"
    }

    fn table_name(&self) -> Result<String> {
        Ok(self.table.clone())
    }

    async fn execute(&self, job: &JobRecord) -> Result<()> {
        let command = self.resolved_command()?;
        debug!(command = %command.display(), table = %self.table, "running job command");

        let status = Command::new(&command)
            .args(&self.args)
            .env("Q4M_TABLE", &self.table)
            .env("Q4M_JOB", job.to_json().to_string())
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::job(format!(
                "{} exited with status {}",
                command.display(),
                status.code().unwrap_or(-1)
            )))
        }
    }
}
