//! Trace store - the persistence collaborator
//!
//! The engine treats persistence as an external collaborator behind the
//! [`TraceStore`] trait. Two backends:
//! - `sqlite` (default) - durable local store, WAL mode
//! - `memory` - process-local, for tests and ephemeral deployments
//!
//! `save_trace` is idempotent on trace id; lookups of unknown ids return
//! empty results rather than errors, matching the engine's best-effort
//! debugging posture.

mod error;
mod memory;
mod sqlite;

pub use error::StoreError;
pub use memory::MemoryTraceStore;
pub use sqlite::SqliteTraceStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::config::{StoreBackendKind, StoreConfig};
use crate::core::storage::AppStorage;
use crate::data::types::{Session, SessionCounterDelta, SessionStatus, UniversalTrace};

/// Persistence boundary for traces and sessions
#[async_trait]
pub trait TraceStore: Send + Sync {
    /// Persist one trace; replaces any previous record with the same id
    async fn save_trace(&self, trace: &UniversalTrace) -> Result<(), StoreError>;

    /// All traces of a session in submission order, up to `limit`
    async fn load_session_traces(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<UniversalTrace>, StoreError>;

    /// Load traces by id; unknown ids are silently omitted
    async fn load_traces_by_ids(&self, ids: &[String])
    -> Result<Vec<UniversalTrace>, StoreError>;

    async fn load_session(&self, session_id: &str) -> Result<Option<Session>, StoreError>;

    /// Persist session metadata; replaces any previous record with the same id
    async fn save_session(&self, session: &Session) -> Result<(), StoreError>;

    /// Apply a counter delta to a stored session; no-op for unknown sessions
    async fn update_session_counters(
        &self,
        session_id: &str,
        delta: SessionCounterDelta,
    ) -> Result<(), StoreError>;

    /// Explicit lifecycle transition; no-op for unknown sessions
    async fn set_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    /// Flush and release backend resources
    async fn close(&self);

    fn backend_name(&self) -> &'static str;
}

/// Initialize the configured store backend
pub async fn init(
    config: &StoreConfig,
    storage: &AppStorage,
) -> Result<Arc<dyn TraceStore>, StoreError> {
    let store: Arc<dyn TraceStore> = match config.backend {
        StoreBackendKind::Sqlite => Arc::new(SqliteTraceStore::init(storage).await?),
        StoreBackendKind::Memory => Arc::new(MemoryTraceStore::new()),
    };
    tracing::debug!(backend = store.backend_name(), "Trace store initialized");
    Ok(store)
}
