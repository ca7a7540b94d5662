//! SQLite trace store
//!
//! Durable local backend. Optimized for single-process, low-latency use:
//! WAL mode for concurrent reads during writes, in-memory temp storage,
//! automatic WAL checkpointing. Schema is created on startup.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{ConnectOptions, Row};
use tracing::log::LevelFilter;

use super::{StoreError, TraceStore};
use crate::core::constants::{
    SQLITE_BUSY_TIMEOUT_SECS, SQLITE_CACHE_SIZE, SQLITE_DB_FILENAME, SQLITE_MAX_CONNECTIONS,
    SQLITE_WAL_AUTOCHECKPOINT,
};
use crate::core::storage::{AppStorage, DataSubdir};
use crate::data::types::{Session, SessionCounterDelta, SessionStatus, UniversalTrace};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id            TEXT PRIMARY KEY,
    name          TEXT,
    start_time_ms INTEGER NOT NULL,
    end_time_ms   INTEGER,
    status        TEXT NOT NULL,
    total_traces  INTEGER NOT NULL DEFAULT 0,
    error_count   INTEGER NOT NULL DEFAULT 0,
    success_count INTEGER NOT NULL DEFAULT 0,
    metadata      TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS traces (
    id           TEXT PRIMARY KEY,
    session_id   TEXT NOT NULL,
    parent_id    TEXT,
    timestamp_ms INTEGER NOT NULL,
    trace_type   TEXT NOT NULL,
    status       TEXT NOT NULL,
    data         TEXT NOT NULL DEFAULT 'null',
    metadata     TEXT NOT NULL DEFAULT '{}',
    duration_ms  INTEGER
);

CREATE INDEX IF NOT EXISTS idx_traces_session
    ON traces (session_id, timestamp_ms);
"#;

pub struct SqliteTraceStore {
    pool: SqlitePool,
}

impl SqliteTraceStore {
    /// Initialize the store, creating the database file and schema if needed
    pub async fn init(storage: &AppStorage) -> Result<Self, StoreError> {
        let db_path = storage.subdir(DataSubdir::Sqlite).join(SQLITE_DB_FILENAME);

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(SQLITE_BUSY_TIMEOUT_SECS))
            .pragma("cache_size", SQLITE_CACHE_SIZE)
            .pragma("temp_store", "MEMORY")
            .pragma("wal_autocheckpoint", SQLITE_WAL_AUTOCHECKPOINT)
            .log_statements(LevelFilter::Trace);

        let pool = SqlitePoolOptions::new()
            .max_connections(SQLITE_MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        tracing::debug!(path = %db_path.display(), "SqliteTraceStore initialized");
        Ok(Self { pool })
    }
}

fn row_to_trace(row: &SqliteRow) -> Result<UniversalTrace, StoreError> {
    let data: String = row.try_get("data")?;
    let metadata: String = row.try_get("metadata")?;
    let timestamp_ms: i64 = row.try_get("timestamp_ms")?;
    let duration_ms: Option<i64> = row.try_get("duration_ms")?;

    Ok(UniversalTrace {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        parent_id: row.try_get("parent_id")?,
        timestamp: DateTime::from_timestamp_millis(timestamp_ms),
        trace_type: row.try_get("trace_type")?,
        status: row.try_get("status")?,
        data: serde_json::from_str(&data)?,
        metadata: serde_json::from_str(&metadata)?,
        duration_ms: duration_ms.map(|d| d.max(0) as u64),
    })
}

fn row_to_session(row: &SqliteRow) -> Result<Session, StoreError> {
    let start_time_ms: i64 = row.try_get("start_time_ms")?;
    let end_time_ms: Option<i64> = row.try_get("end_time_ms")?;
    let status: String = row.try_get("status")?;
    let metadata: String = row.try_get("metadata")?;
    let total_traces: i64 = row.try_get("total_traces")?;
    let error_count: i64 = row.try_get("error_count")?;
    let success_count: i64 = row.try_get("success_count")?;

    Ok(Session {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        start_time: DateTime::from_timestamp_millis(start_time_ms).unwrap_or_else(Utc::now),
        end_time: end_time_ms.and_then(DateTime::from_timestamp_millis),
        status: SessionStatus::parse(&status).unwrap_or_default(),
        total_traces: total_traces.max(0) as u64,
        error_count: error_count.max(0) as u64,
        success_count: success_count.max(0) as u64,
        metadata: serde_json::from_str(&metadata)?,
    })
}

#[async_trait]
impl TraceStore for SqliteTraceStore {
    async fn save_trace(&self, trace: &UniversalTrace) -> Result<(), StoreError> {
        let timestamp_ms = trace.timestamp.unwrap_or_else(Utc::now).timestamp_millis();
        let data = serde_json::to_string(&trace.data)?;
        let metadata = serde_json::to_string(&trace.metadata)?;

        sqlx::query(
            "INSERT INTO traces \
                 (id, session_id, parent_id, timestamp_ms, trace_type, status, data, metadata, duration_ms) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                 session_id = excluded.session_id, \
                 parent_id = excluded.parent_id, \
                 timestamp_ms = excluded.timestamp_ms, \
                 trace_type = excluded.trace_type, \
                 status = excluded.status, \
                 data = excluded.data, \
                 metadata = excluded.metadata, \
                 duration_ms = excluded.duration_ms",
        )
        .bind(&trace.id)
        .bind(&trace.session_id)
        .bind(&trace.parent_id)
        .bind(timestamp_ms)
        .bind(&trace.trace_type)
        .bind(&trace.status)
        .bind(data)
        .bind(metadata)
        .bind(trace.duration_ms.map(|d| d as i64))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_session_traces(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<UniversalTrace>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, session_id, parent_id, timestamp_ms, trace_type, status, data, metadata, duration_ms \
             FROM traces WHERE session_id = ? \
             ORDER BY timestamp_ms ASC, rowid ASC LIMIT ?",
        )
        .bind(session_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_trace).collect()
    }

    async fn load_traces_by_ids(
        &self,
        ids: &[String],
    ) -> Result<Vec<UniversalTrace>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, session_id, parent_id, timestamp_ms, trace_type, status, data, metadata, duration_ms \
             FROM traces WHERE id IN ({placeholders})"
        );

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_trace).collect()
    }

    async fn load_session(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, start_time_ms, end_time_ms, status, total_traces, error_count, success_count, metadata \
             FROM sessions WHERE id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_session).transpose()
    }

    async fn save_session(&self, session: &Session) -> Result<(), StoreError> {
        let metadata = serde_json::to_string(&session.metadata)?;

        sqlx::query(
            "INSERT INTO sessions \
                 (id, name, start_time_ms, end_time_ms, status, total_traces, error_count, success_count, metadata) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                 name = excluded.name, \
                 end_time_ms = excluded.end_time_ms, \
                 status = excluded.status, \
                 metadata = excluded.metadata",
        )
        .bind(&session.id)
        .bind(&session.name)
        .bind(session.start_time.timestamp_millis())
        .bind(session.end_time.map(|t| t.timestamp_millis()))
        .bind(session.status.as_str())
        .bind(session.total_traces as i64)
        .bind(session.error_count as i64)
        .bind(session.success_count as i64)
        .bind(metadata)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_session_counters(
        &self,
        session_id: &str,
        delta: SessionCounterDelta,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE sessions SET \
                 total_traces = total_traces + ?, \
                 error_count = error_count + ?, \
                 success_count = success_count + ? \
             WHERE id = ?",
        )
        .bind(delta.total)
        .bind(delta.errors)
        .bind(delta.successes)
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE sessions SET status = ?, end_time_ms = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(end_time.map(|t| t.timestamp_millis()))
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn make_store() -> (SqliteTraceStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sqlite")).unwrap();
        let storage = AppStorage::init_at(dir.path().to_path_buf());
        let store = SqliteTraceStore::init(&storage).await.unwrap();
        (store, dir)
    }

    fn trace(id: &str, session_id: &str, parent_id: Option<&str>) -> UniversalTrace {
        UniversalTrace {
            id: id.to_string(),
            session_id: session_id.to_string(),
            parent_id: parent_id.map(str::to_string),
            timestamp: Some(Utc::now()),
            trace_type: "prompt".to_string(),
            status: "completed".to_string(),
            data: serde_json::json!({"text": "hello"}),
            metadata: serde_json::Map::new(),
            duration_ms: Some(12),
        }
    }

    #[tokio::test]
    async fn test_trace_round_trip() {
        let (store, _dir) = make_store().await;
        let t = trace("t1", "s1", Some("t0"));
        store.save_trace(&t).await.unwrap();

        let loaded = store.load_traces_by_ids(&["t1".to_string()]).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "t1");
        assert_eq!(loaded[0].parent_id.as_deref(), Some("t0"));
        assert_eq!(loaded[0].data, serde_json::json!({"text": "hello"}));
        assert_eq!(loaded[0].duration_ms, Some(12));
    }

    #[tokio::test]
    async fn test_save_trace_idempotent() {
        let (store, _dir) = make_store().await;
        let mut t = trace("t1", "s1", None);
        store.save_trace(&t).await.unwrap();
        t.status = "failed".to_string();
        store.save_trace(&t).await.unwrap();

        let loaded = store.load_session_traces("s1", 100).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].status, "failed");
    }

    #[tokio::test]
    async fn test_load_session_traces_ordered_and_limited() {
        let (store, _dir) = make_store().await;
        for i in 0..4 {
            let mut t = trace(&format!("t{i}"), "s1", None);
            t.timestamp = DateTime::from_timestamp_millis(1_700_000_000_000 + i);
            store.save_trace(&t).await.unwrap();
        }

        let loaded = store.load_session_traces("s1", 3).await.unwrap();
        let ids: Vec<_> = loaded.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t0", "t1", "t2"]);
    }

    #[tokio::test]
    async fn test_session_round_trip_and_counters() {
        let (store, _dir) = make_store().await;
        let mut session = Session::new("s1");
        session.name = Some("checkout flow".to_string());
        store.save_session(&session).await.unwrap();

        store
            .update_session_counters("s1", SessionCounterDelta { total: 2, errors: 1, successes: 1 })
            .await
            .unwrap();

        let loaded = store.load_session("s1").await.unwrap().unwrap();
        assert_eq!(loaded.name.as_deref(), Some("checkout flow"));
        assert_eq!(loaded.total_traces, 2);
        assert_eq!(loaded.error_count, 1);
        assert_eq!(loaded.success_count, 1);
    }

    #[tokio::test]
    async fn test_set_session_status() {
        let (store, _dir) = make_store().await;
        store.save_session(&Session::new("s1")).await.unwrap();
        store
            .set_session_status("s1", SessionStatus::Archived, Some(Utc::now()))
            .await
            .unwrap();

        let loaded = store.load_session("s1").await.unwrap().unwrap();
        assert_eq!(loaded.status, SessionStatus::Archived);
        assert!(loaded.end_time.is_some());
    }

    #[tokio::test]
    async fn test_unknown_ids_silently_skipped() {
        let (store, _dir) = make_store().await;
        store.save_trace(&trace("t1", "s1", None)).await.unwrap();

        let loaded = store
            .load_traces_by_ids(&["ghost".to_string(), "t1".to_string()])
            .await
            .unwrap();
        assert_eq!(loaded.len(), 1);
    }
}
