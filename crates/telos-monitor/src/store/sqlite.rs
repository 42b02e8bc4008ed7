//! SQLite record store

use super::RecordStore;
use crate::error::{Error, Result};
use crate::record::{ExecutionRecord, RecordType, SessionRecord, SessionStatus};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Record store persisting to SQLite via sqlx
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Create a store over an existing pool
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) a database file and run migrations
    pub async fn from_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Database(format!("failed to create directory: {e}")))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        info!("SQLite record store initialized at {}", db_path.display());
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        debug!("In-memory SQLite record store initialized");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS execution_records (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                project_id TEXT,
                record_type TEXT NOT NULL,
                tool_name TEXT,
                input TEXT,
                output TEXT,
                success INTEGER NOT NULL DEFAULT 1,
                duration_ms INTEGER NOT NULL DEFAULT 0,
                error_message TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                mode TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT,
                turn_count INTEGER NOT NULL DEFAULT 0,
                tokens_used INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'active'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_records_session ON execution_records(session_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<ExecutionRecord> {
        let id: String = row.get("id");
        let session_id: String = row.get("session_id");
        let record_type: String = row.get("record_type");
        let input: Option<String> = row.get("input");
        let output: Option<String> = row.get("output");
        let created_at: String = row.get("created_at");

        Ok(ExecutionRecord {
            id: Uuid::parse_str(&id).map_err(|e| Error::Serialization(e.to_string()))?,
            session_id: Uuid::parse_str(&session_id)
                .map_err(|e| Error::Serialization(e.to_string()))?,
            project_id: row.get("project_id"),
            record_type: RecordType::from_str(&record_type).map_err(Error::Serialization)?,
            tool_name: row.get("tool_name"),
            input: parse_json_column(input)?,
            output: parse_json_column(output)?,
            success: row.get::<i64, _>("success") != 0,
            duration_ms: row.get("duration_ms"),
            error_message: row.get("error_message"),
            created_at: parse_timestamp(&created_at)?,
        })
    }
}

fn parse_json_column(column: Option<String>) -> Result<Option<serde_json::Value>> {
    match column {
        Some(text) => serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| Error::Serialization(e.to_string())),
        None => Ok(None),
    }
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Serialization(e.to_string()))
}

#[async_trait::async_trait]
impl RecordStore for SqliteRecordStore {
    #[instrument(skip(self, record), fields(record_id = %record.id))]
    async fn insert_record(&self, record: &ExecutionRecord) -> Result<()> {
        let input = record
            .input
            .as_ref()
            .map(|v| serde_json::to_string(v))
            .transpose()
            .map_err(|e| Error::Serialization(e.to_string()))?;
        let output = record
            .output
            .as_ref()
            .map(|v| serde_json::to_string(v))
            .transpose()
            .map_err(|e| Error::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO execution_records (
                id, session_id, project_id, record_type, tool_name,
                input, output, success, duration_ms, error_message, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.session_id.to_string())
        .bind(&record.project_id)
        .bind(record.record_type.as_str())
        .bind(&record.tool_name)
        .bind(input)
        .bind(output)
        .bind(i64::from(record.success))
        .bind(record.duration_ms)
        .bind(&record.error_message)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn upsert_session(&self, session: &SessionRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, mode, started_at, ended_at, turn_count, tokens_used, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                ended_at = excluded.ended_at,
                turn_count = excluded.turn_count,
                tokens_used = excluded.tokens_used,
                status = excluded.status
            "#,
        )
        .bind(session.id.to_string())
        .bind(&session.mode)
        .bind(session.started_at.to_rfc3339())
        .bind(session.ended_at.map(|t| t.to_rfc3339()))
        .bind(session.turn_count)
        .bind(session.tokens_used)
        .bind(session.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<SessionRecord>> {
        let row = sqlx::query(
            "SELECT id, mode, started_at, ended_at, turn_count, tokens_used, status \
             FROM sessions WHERE id = ?1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.get("id");
        let started_at: String = row.get("started_at");
        let ended_at: Option<String> = row.get("ended_at");
        let status: String = row.get("status");

        Ok(Some(SessionRecord {
            id: Uuid::parse_str(&id).map_err(|e| Error::Serialization(e.to_string()))?,
            mode: row.get("mode"),
            started_at: parse_timestamp(&started_at)?,
            ended_at: ended_at.as_deref().map(parse_timestamp).transpose()?,
            turn_count: row.get("turn_count"),
            tokens_used: row.get("tokens_used"),
            status: if status == "ended" {
                SessionStatus::Ended
            } else {
                SessionStatus::Active
            },
        }))
    }

    async fn record_count(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM execution_records")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        let n: i64 = row.get("n");
        Ok(n as u64)
    }

    async fn recent_records(&self, limit: u32) -> Result<Vec<ExecutionRecord>> {
        let rows = sqlx::query(
            "SELECT id, session_id, project_id, record_type, tool_name, input, output, \
                    success, duration_ms, error_message, created_at \
             FROM execution_records ORDER BY created_at DESC LIMIT ?1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
