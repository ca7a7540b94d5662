//! Session registry
//!
//! Process-wide authoritative table of active sessions and their
//! connected-client membership. Membership operations are in-memory and
//! non-blocking; only `ensure_session` and counter mirroring touch the store.
//! Dashmap's sharded locks give per-key isolation, so traffic on one session
//! never contends with another.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::data::store::{StoreError, TraceStore};
use crate::data::types::{Session, SessionCounterDelta, SessionStatus, TraceStatus};

/// Ephemeral record of one live connection; never persisted
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedClient {
    pub connection_id: String,
    pub connected_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

pub struct SessionRegistry {
    store: Arc<dyn TraceStore>,
    sessions: DashMap<String, Session>,
    /// Session id -> member connection ids
    members: DashMap<String, HashSet<String>>,
    connections: DashMap<String, ConnectedClient>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn TraceStore>) -> Self {
        Self {
            store,
            sessions: DashMap::new(),
            members: DashMap::new(),
            connections: DashMap::new(),
        }
    }

    /// Return the existing session or lazily create an active one. Idempotent.
    ///
    /// Optional `name`/`metadata` from whole-session submissions are merged
    /// into the session record and persisted.
    pub async fn ensure_session(
        &self,
        session_id: &str,
        name: Option<&str>,
        metadata: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Result<Session, StoreError> {
        let loaded = if self.sessions.contains_key(session_id) {
            None
        } else {
            // Not in memory: adopt the stored record or create a fresh one
            match self.store.load_session(session_id).await? {
                Some(session) => Some(session),
                None => {
                    let session = Session::new(session_id);
                    self.store.save_session(&session).await?;
                    tracing::debug!(session_id, "Session created");
                    Some(session)
                }
            }
        };

        // entry() arbitrates concurrent creators; first insert wins
        let mut entry = match loaded {
            Some(session) => self.sessions.entry(session_id.to_string()).or_insert(session),
            None => self
                .sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Session::new(session_id)),
        };

        let mut dirty = false;
        if let Some(name) = name
            && entry.name.as_deref() != Some(name)
        {
            entry.name = Some(name.to_string());
            dirty = true;
        }
        if let Some(metadata) = metadata
            && !metadata.is_empty()
        {
            for (key, value) in metadata {
                entry.metadata.insert(key.clone(), value.clone());
            }
            dirty = true;
        }

        let session = entry.clone();
        drop(entry);

        if dirty {
            self.store.save_session(&session).await?;
        }
        Ok(session)
    }

    /// Session metadata from memory, falling back to the store
    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        if let Some(session) = self.sessions.get(session_id) {
            return Ok(Some(session.clone()));
        }
        self.store.load_session(session_id).await
    }

    /// Track a new live connection (not yet in any session)
    pub fn register_connection(&self, connection_id: &str) {
        self.connections.insert(
            connection_id.to_string(),
            ConnectedClient {
                connection_id: connection_id.to_string(),
                connected_at: Utc::now(),
                session_id: None,
                user_id: None,
            },
        );
    }

    /// Add a connection to a session's membership.
    ///
    /// A connection belongs to at most one session; joining a new session
    /// implicitly leaves the previous one.
    pub fn join(&self, connection_id: &str, session_id: &str, user_id: Option<&str>) {
        let previous = {
            let mut client = self
                .connections
                .entry(connection_id.to_string())
                .or_insert_with(|| ConnectedClient {
                    connection_id: connection_id.to_string(),
                    connected_at: Utc::now(),
                    session_id: None,
                    user_id: None,
                });
            let previous = client.session_id.replace(session_id.to_string());
            client.user_id = user_id.map(str::to_string);
            previous
        };

        if let Some(previous) = previous.filter(|p| p.as_str() != session_id) {
            self.remove_member(&previous, connection_id);
        }

        self.members
            .entry(session_id.to_string())
            .or_default()
            .insert(connection_id.to_string());

        tracing::debug!(connection_id, session_id, "Connection joined session");
    }

    /// Idempotent removal from the connection's current session
    pub fn leave(&self, connection_id: &str) {
        let session_id = self
            .connections
            .get_mut(connection_id)
            .and_then(|mut client| client.session_id.take());

        if let Some(session_id) = session_id {
            self.remove_member(&session_id, connection_id);
            tracing::debug!(connection_id, session_id = %session_id, "Connection left session");
        }
    }

    /// Current members of a session's room
    pub fn members_of(&self, session_id: &str) -> Vec<ConnectedClient> {
        let ids: Vec<String> = match self.members.get(session_id) {
            Some(members) => members.iter().cloned().collect(),
            None => return Vec::new(),
        };
        ids.iter()
            .filter_map(|id| self.connections.get(id).map(|c| c.clone()))
            .collect()
    }

    /// Unconditional disconnect cleanup: leaves any room and drops the record
    pub fn remove_connection(&self, connection_id: &str) {
        self.leave(connection_id);
        self.connections.remove(connection_id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Update session counters for one recorded trace, in memory and in the
    /// store. The store mirror is best effort; a failure is logged, not
    /// propagated.
    pub async fn record_trace_status(&self, session_id: &str, status: TraceStatus) {
        let delta = SessionCounterDelta::for_status(status);

        if let Some(mut session) = self.sessions.get_mut(session_id) {
            session.total_traces = session.total_traces.saturating_add_signed(delta.total);
            session.error_count = session.error_count.saturating_add_signed(delta.errors);
            session.success_count = session.success_count.saturating_add_signed(delta.successes);
        }

        if let Err(e) = self.store.update_session_counters(session_id, delta).await {
            tracing::warn!(session_id, error = %e, "Failed to mirror session counters");
        }
    }

    /// Explicit lifecycle transition. Completed/archived sessions get an end
    /// time; reactivation clears it.
    pub async fn set_status(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> Result<Option<Session>, StoreError> {
        let end_time = match status {
            SessionStatus::Active => None,
            SessionStatus::Completed | SessionStatus::Archived => Some(Utc::now()),
        };

        let updated = if let Some(mut session) = self.sessions.get_mut(session_id) {
            session.status = status;
            session.end_time = end_time;
            Some(session.clone())
        } else {
            None
        };

        let updated = match updated {
            Some(session) => Some(session),
            None => {
                let mut stored = self.store.load_session(session_id).await?;
                if let Some(ref mut session) = stored {
                    session.status = status;
                    session.end_time = end_time;
                }
                stored
            }
        };

        if updated.is_some() {
            self.store
                .set_session_status(session_id, status, end_time)
                .await?;
        }
        Ok(updated)
    }

    fn remove_member(&self, session_id: &str, connection_id: &str) {
        if let Some(mut members) = self.members.get_mut(session_id) {
            members.remove(connection_id);
        }
    }
}
