//! Record storage backends

mod memory;
mod sqlite;

#[cfg(test)]
mod tests;

pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;

use crate::error::Result;
use crate::record::{ExecutionRecord, SessionRecord};
use uuid::Uuid;

/// Trait for record storage backends
///
/// Allows SQLite, in-memory, and external stores to be used
/// interchangeably. All operations are best-effort from the bridge's
/// perspective; a failing store degrades collection to in-memory only.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert an execution record
    async fn insert_record(&self, record: &ExecutionRecord) -> Result<()>;

    /// Insert or update a session
    async fn upsert_session(&self, session: &SessionRecord) -> Result<()>;

    /// Get a session by id
    async fn get_session(&self, id: Uuid) -> Result<Option<SessionRecord>>;

    /// Total number of stored records
    async fn record_count(&self) -> Result<u64>;

    /// The most recent records, newest first
    async fn recent_records(&self, limit: u32) -> Result<Vec<ExecutionRecord>>;

    /// Store name (for logging)
    fn name(&self) -> &str;
}
