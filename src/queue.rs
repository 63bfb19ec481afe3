//! Queue definitions: the override points a concrete queue supplies.
//!
//! A queue type names the table it consumes and handles one claimed row at
//! a time. Both are trait methods with defaults, so a type that implements
//! nothing behaves as an unconfigured queue: its table name follows the
//! naming convention and `execute` fails with [`Error::Unimplemented`].

use crate::error::{Error, Result};
use crate::model::JobRecord;
use crate::naming::{TableNaming, short_type_name};
use async_trait::async_trait;

#[async_trait]
pub trait Queue: Send + Sync {
    /// Identifying name used by conventional table naming.
    fn type_name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Naming policy applied by the default `table_name`.
    fn naming(&self) -> TableNaming {
        TableNaming::Convention
    }

    /// Table this queue consumes.
    fn table_name(&self) -> Result<String> {
        self.naming().resolve(self.type_name())
    }

    /// Handle one claimed job.
    ///
    /// Returning `Err` aborts the claim, putting the row back on the queue.
    async fn execute(&self, job: &JobRecord) -> Result<()> {
        let _ = job;
        Err(Error::Unimplemented("execute"))
    }
}
