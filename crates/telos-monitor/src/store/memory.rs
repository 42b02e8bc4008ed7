//! In-memory record store
//!
//! The degradation target when persistence fails, and the default for
//! tests.

use super::RecordStore;
use crate::error::Result;
use crate::record::{ExecutionRecord, SessionRecord};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Record store holding everything in process memory
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<ExecutionRecord>>,
    sessions: RwLock<HashMap<Uuid, SessionRecord>>,
}

impl MemoryRecordStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_record(&self, record: &ExecutionRecord) -> Result<()> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn upsert_session(&self, session: &SessionRecord) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<SessionRecord>> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn record_count(&self) -> Result<u64> {
        Ok(self.records.read().await.len() as u64)
    }

    async fn recent_records(&self, limit: u32) -> Result<Vec<ExecutionRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
