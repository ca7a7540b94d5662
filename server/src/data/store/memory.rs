//! In-memory trace store
//!
//! Process-local backend used by tests and ephemeral deployments. Preserves
//! per-session submission order so catch-up replay matches the durable
//! backend's behavior.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::{StoreError, TraceStore};
use crate::data::types::{Session, SessionCounterDelta, SessionStatus, UniversalTrace};

#[derive(Default)]
pub struct MemoryTraceStore {
    traces: DashMap<String, UniversalTrace>,
    /// Session id -> trace ids in first-seen order
    session_order: DashMap<String, Vec<String>>,
    sessions: DashMap<String, Session>,
}

impl MemoryTraceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TraceStore for MemoryTraceStore {
    async fn save_trace(&self, trace: &UniversalTrace) -> Result<(), StoreError> {
        // Hold the order entry while inserting so a concurrent duplicate save
        // cannot register the same id twice
        let mut order = self.session_order.entry(trace.session_id.clone()).or_default();
        if !order.contains(&trace.id) {
            order.push(trace.id.clone());
        }
        self.traces.insert(trace.id.clone(), trace.clone());
        Ok(())
    }

    async fn load_session_traces(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<UniversalTrace>, StoreError> {
        let Some(order) = self.session_order.get(session_id) else {
            return Ok(Vec::new());
        };
        Ok(order
            .iter()
            .take(limit)
            .filter_map(|id| self.traces.get(id).map(|t| t.clone()))
            .collect())
    }

    async fn load_traces_by_ids(
        &self,
        ids: &[String],
    ) -> Result<Vec<UniversalTrace>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.traces.get(id).map(|t| t.clone()))
            .collect())
    }

    async fn load_session(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.get(session_id).map(|s| s.clone()))
    }

    async fn save_session(&self, session: &Session) -> Result<(), StoreError> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn update_session_counters(
        &self,
        session_id: &str,
        delta: SessionCounterDelta,
    ) -> Result<(), StoreError> {
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            session.total_traces = session.total_traces.saturating_add_signed(delta.total);
            session.error_count = session.error_count.saturating_add_signed(delta.errors);
            session.success_count = session.success_count.saturating_add_signed(delta.successes);
        }
        Ok(())
    }

    async fn set_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            session.status = status;
            session.end_time = end_time;
        }
        Ok(())
    }

    async fn close(&self) {}

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(id: &str, session_id: &str) -> UniversalTrace {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "sessionId": session_id,
            "type": "prompt",
            "status": "completed",
            "timestamp": Utc::now(),
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_is_idempotent_on_id() {
        let store = MemoryTraceStore::new();
        let t = trace("t1", "s1");
        store.save_trace(&t).await.unwrap();
        store.save_trace(&t).await.unwrap();

        let traces = store.load_session_traces("s1", 100).await.unwrap();
        assert_eq!(traces.len(), 1);
    }

    #[tokio::test]
    async fn test_session_traces_preserve_order() {
        let store = MemoryTraceStore::new();
        for i in 0..5 {
            store.save_trace(&trace(&format!("t{i}"), "s1")).await.unwrap();
        }

        let traces = store.load_session_traces("s1", 100).await.unwrap();
        let ids: Vec<_> = traces.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t0", "t1", "t2", "t3", "t4"]);
    }

    #[tokio::test]
    async fn test_load_by_ids_skips_unknown() {
        let store = MemoryTraceStore::new();
        store.save_trace(&trace("t1", "s1")).await.unwrap();

        let traces = store
            .load_traces_by_ids(&["t1".to_string(), "ghost".to_string()])
            .await
            .unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].id, "t1");
    }

    #[tokio::test]
    async fn test_counter_updates() {
        let store = MemoryTraceStore::new();
        store.save_session(&Session::new("s1")).await.unwrap();
        store
            .update_session_counters("s1", SessionCounterDelta { total: 3, errors: 1, successes: 2 })
            .await
            .unwrap();

        let session = store.load_session("s1").await.unwrap().unwrap();
        assert_eq!(session.total_traces, 3);
        assert_eq!(session.error_count, 1);
        assert_eq!(session.success_count, 2);
    }

    #[tokio::test]
    async fn test_set_session_status() {
        let store = MemoryTraceStore::new();
        store.save_session(&Session::new("s1")).await.unwrap();
        let ended = Utc::now();
        store
            .set_session_status("s1", SessionStatus::Completed, Some(ended))
            .await
            .unwrap();

        let session = store.load_session("s1").await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.end_time, Some(ended));
    }

    #[tokio::test]
    async fn test_unknown_session_is_none() {
        let store = MemoryTraceStore::new();
        assert!(store.load_session("nope").await.unwrap().is_none());
        assert!(store.load_session_traces("nope", 10).await.unwrap().is_empty());
    }
}
