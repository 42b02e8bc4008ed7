use super::*;
use crate::record::{RecordType, SessionStatus};

fn sample_record(session_id: Uuid) -> ExecutionRecord {
    let mut record = ExecutionRecord::new(session_id, RecordType::ToolExecution);
    record.tool_name = Some("file".to_string());
    record.input = Some(serde_json::json!({"path": "a.txt"}));
    record.output = Some(serde_json::json!({"written": true}));
    record.duration_ms = 12;
    record
}

#[tokio::test]
async fn test_memory_store_roundtrip() {
    let store = MemoryRecordStore::new();
    let session = SessionRecord::new("attached");

    store.upsert_session(&session).await.unwrap();
    store
        .insert_record(&sample_record(session.id))
        .await
        .unwrap();
    store
        .insert_record(&sample_record(session.id))
        .await
        .unwrap();

    assert_eq!(store.record_count().await.unwrap(), 2);
    assert_eq!(store.recent_records(1).await.unwrap().len(), 1);
    let loaded = store.get_session(session.id).await.unwrap().unwrap();
    assert_eq!(loaded.mode, "attached");
}

#[tokio::test]
async fn test_sqlite_store_roundtrip() {
    let store = SqliteRecordStore::in_memory().await.unwrap();
    let session = SessionRecord::new("attached");

    store.upsert_session(&session).await.unwrap();
    let record = sample_record(session.id);
    store.insert_record(&record).await.unwrap();

    assert_eq!(store.record_count().await.unwrap(), 1);
    let loaded = &store.recent_records(10).await.unwrap()[0];
    assert_eq!(loaded.id, record.id);
    assert_eq!(loaded.record_type, RecordType::ToolExecution);
    assert_eq!(loaded.tool_name.as_deref(), Some("file"));
    assert_eq!(loaded.input.as_ref().unwrap()["path"], "a.txt");
    assert_eq!(loaded.duration_ms, 12);
    assert!(loaded.success);
}

#[tokio::test]
async fn test_sqlite_session_upsert_updates() {
    let store = SqliteRecordStore::in_memory().await.unwrap();
    let mut session = SessionRecord::new("attached");
    store.upsert_session(&session).await.unwrap();

    session.turn_count = 5;
    session.tokens_used = 1234;
    session.end();
    store.upsert_session(&session).await.unwrap();

    let loaded = store.get_session(session.id).await.unwrap().unwrap();
    assert_eq!(loaded.turn_count, 5);
    assert_eq!(loaded.tokens_used, 1234);
    assert_eq!(loaded.status, SessionStatus::Ended);
    assert!(loaded.ended_at.is_some());
}

#[tokio::test]
async fn test_sqlite_store_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("monitor").join("records.db");

    let store = SqliteRecordStore::from_path(&db_path).await.unwrap();
    let session = SessionRecord::new("autonomous");
    store.upsert_session(&session).await.unwrap();
    store
        .insert_record(&sample_record(session.id))
        .await
        .unwrap();

    assert!(db_path.exists());
    assert_eq!(store.record_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_missing_session_is_none() {
    let store = SqliteRecordStore::in_memory().await.unwrap();
    assert!(store.get_session(Uuid::new_v4()).await.unwrap().is_none());
}
