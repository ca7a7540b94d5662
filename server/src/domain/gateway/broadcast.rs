//! Broadcast gateway
//!
//! Owns the live-connection outbound channels and fans events out to session
//! rooms. Membership comes from the session registry; room-scoped data is
//! never broadcast globally. A delivery failure to one connection is logged
//! and never affects the rest of the room or the originating submission.
//!
//! Per-connection state machine:
//! Connecting -> Connected -> (optionally) InSession -> Disconnected.
//! `register` completes the handshake, `join`/`leave` move in and out of a
//! room, and `disconnect` cleanup is unconditional regardless of state.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::protocol::ServerMessage;
use crate::core::constants::SESSION_STATE_MAX_TRACES;
use crate::data::store::{StoreError, TraceStore};
use crate::data::types::UniversalTrace;
use crate::domain::sessions::SessionRegistry;

pub struct BroadcastGateway {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn TraceStore>,
    senders: DashMap<String, mpsc::UnboundedSender<ServerMessage>>,
}

impl BroadcastGateway {
    pub fn new(registry: Arc<SessionRegistry>, store: Arc<dyn TraceStore>) -> Self {
        Self {
            registry,
            store,
            senders: DashMap::new(),
        }
    }

    /// Complete the handshake for a new connection.
    ///
    /// Generates the connection id, registers the outbound channel, and
    /// queues the `connected` acknowledgment as the first message.
    pub fn register(&self) -> (String, mpsc::UnboundedReceiver<ServerMessage>) {
        let connection_id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();

        let _ = tx.send(ServerMessage::Connected {
            connection_id: connection_id.clone(),
            timestamp: Utc::now(),
        });

        self.senders.insert(connection_id.clone(), tx);
        self.registry.register_connection(&connection_id);

        tracing::debug!(connection_id = %connection_id, "Connection registered");
        (connection_id, rx)
    }

    /// Unconditional disconnect cleanup; safe to call in any state
    pub fn disconnect(&self, connection_id: &str) {
        self.senders.remove(connection_id);
        self.registry.remove_connection(connection_id);
        tracing::debug!(connection_id, "Connection disconnected");
    }

    /// Join a session room, lazily creating the session, and acknowledge
    pub async fn join(
        &self,
        connection_id: &str,
        session_id: &str,
        user_id: Option<&str>,
    ) -> Result<(), StoreError> {
        self.registry.ensure_session(session_id, None, None).await?;
        self.registry.join(connection_id, session_id, user_id);
        self.send_to(
            connection_id,
            ServerMessage::SessionJoined {
                session_id: session_id.to_string(),
                timestamp: Utc::now(),
            },
        );
        Ok(())
    }

    /// Leave the current room and acknowledge
    pub fn leave(&self, connection_id: &str, session_id: &str) {
        self.registry.leave(connection_id);
        self.send_to(
            connection_id,
            ServerMessage::SessionLeft {
                session_id: session_id.to_string(),
                timestamp: Utc::now(),
            },
        );
    }

    /// Deliver one processed trace to every member of its session's room
    pub fn publish_trace(&self, trace: &UniversalTrace) {
        self.publish_to_room(
            &trace.session_id,
            ServerMessage::NewTrace {
                trace: Box::new(trace.clone()),
            },
        );
    }

    /// Deliver an aggregated batch summary to one session's room
    pub fn publish_batch_result(
        &self,
        batch_id: &str,
        session_id: &str,
        processed_count: usize,
        failed_count: usize,
        trace_ids: Vec<String>,
    ) {
        self.publish_to_room(
            session_id,
            ServerMessage::BatchResult {
                batch_id: batch_id.to_string(),
                session_id: session_id.to_string(),
                processed_count,
                failed_count,
                trace_ids,
            },
        );
    }

    /// Deliver a whole-session submission summary to its room
    pub fn publish_session_result(
        &self,
        session_id: &str,
        processed_count: usize,
        failed_count: usize,
    ) {
        self.publish_to_room(
            session_id,
            ServerMessage::SessionResult {
                session_id: session_id.to_string(),
                processed_count,
                failed_count,
            },
        );
    }

    /// Deliver an arbitrary session-level notification to its room
    pub fn publish_session_update(&self, session_id: &str, update: serde_json::Value) {
        self.publish_to_room(
            session_id,
            ServerMessage::SessionUpdate {
                session_id: session_id.to_string(),
                update,
            },
        );
    }

    /// Catch-up protocol: answer one connection with the session's current
    /// trace list from the store. Unknown sessions yield an empty list.
    pub async fn send_session_state(&self, connection_id: &str, session_id: &str) {
        match self
            .store
            .load_session_traces(session_id, SESSION_STATE_MAX_TRACES)
            .await
        {
            Ok(traces) => {
                self.send_to(
                    connection_id,
                    ServerMessage::SessionState {
                        session_id: session_id.to_string(),
                        traces,
                        timestamp: Utc::now(),
                    },
                );
            }
            Err(e) => {
                tracing::warn!(session_id, error = %e, "Session state load failed");
                self.send_error(connection_id, format!("session state unavailable: {e}"));
            }
        }
    }

    /// Structured error reply, scoped to the offending connection
    pub fn send_error(&self, connection_id: &str, message: impl Into<String>) {
        self.send_to(
            connection_id,
            ServerMessage::Error {
                message: message.into(),
            },
        );
    }

    pub fn connection_count(&self) -> usize {
        self.senders.len()
    }

    /// Drop all outbound channels so connection loops terminate
    pub fn close_all(&self) {
        self.senders.clear();
    }

    fn publish_to_room(&self, session_id: &str, message: ServerMessage) {
        let members = self.registry.members_of(session_id);
        if members.is_empty() {
            return;
        }
        tracing::trace!(session_id, members = members.len(), "Room broadcast");
        for member in members {
            self.send_to(&member.connection_id, message.clone());
        }
    }

    fn send_to(&self, connection_id: &str, message: ServerMessage) {
        let Some(sender) = self.senders.get(connection_id) else {
            return;
        };
        if sender.send(message).is_err() {
            tracing::warn!(connection_id, "Delivery failed; connection channel closed");
        }
    }
}
