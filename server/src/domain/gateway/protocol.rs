//! Live-connection protocol messages
//!
//! Tagged JSON shapes exchanged with connected observers. These are message
//! shapes, not wire bytes; the WebSocket route is only the transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::types::UniversalTrace;

/// Messages a connection may send to the gateway
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Enter a session room (implicitly leaving any previous room)
    JoinSession {
        #[serde(alias = "session_id")]
        session_id: String,
        #[serde(default, alias = "user_id")]
        user_id: Option<String>,
    },
    /// Leave the current session room
    LeaveSession {
        #[serde(alias = "session_id")]
        session_id: String,
    },
    /// Client-submitted trace; validated like any inbound trace. Nested under
    /// `trace` because the trace record carries its own `type` field.
    TraceEvent { trace: Box<UniversalTrace> },
    /// Catch-up request for the session's current trace list
    RequestSessionState {
        #[serde(alias = "session_id")]
        session_id: String,
    },
}

/// Messages the gateway pushes to connections
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Handshake acknowledgment carrying the generated connection id
    Connected {
        connection_id: String,
        timestamp: DateTime<Utc>,
    },
    SessionJoined {
        session_id: String,
        timestamp: DateTime<Utc>,
    },
    SessionLeft {
        session_id: String,
        timestamp: DateTime<Utc>,
    },
    /// Room broadcast of one newly processed trace
    NewTrace { trace: Box<UniversalTrace> },
    /// Aggregated result of a batch submission touching this room's session
    BatchResult {
        batch_id: String,
        session_id: String,
        processed_count: usize,
        failed_count: usize,
        trace_ids: Vec<String>,
    },
    /// Aggregated result of a whole-session submission
    SessionResult {
        session_id: String,
        processed_count: usize,
        failed_count: usize,
    },
    /// Arbitrary session-level notification (e.g. status change)
    SessionUpdate {
        session_id: String,
        update: Value,
    },
    /// Catch-up reply with the session's current trace list
    SessionState {
        session_id: String,
        traces: Vec<UniversalTrace>,
        timestamp: DateTime<Utc>,
    },
    /// Structured failure reply, scoped to the offending connection
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_join_parses() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"join_session","sessionId":"s1","userId":"u1"}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::JoinSession { session_id, user_id } => {
                assert_eq!(session_id, "s1");
                assert_eq!(user_id.as_deref(), Some("u1"));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_client_trace_event_parses() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"trace_event","trace":{"id":"t1","sessionId":"s1","type":"prompt","status":"completed"}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::TraceEvent { trace } => {
                assert_eq!(trace.id, "t1");
                assert_eq!(trace.session_id, "s1");
                assert_eq!(trace.trace_type, "prompt");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_unknown_client_message_rejected() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe_all"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_message_tags() {
        let msg = ServerMessage::SessionJoined {
            session_id: "s1".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "session_joined");
        assert_eq!(json["sessionId"], "s1");
    }

    #[test]
    fn test_new_trace_nests_record() {
        let trace: UniversalTrace = serde_json::from_str(
            r#"{"id":"t1","sessionId":"s1","type":"prompt","status":"completed"}"#,
        )
        .unwrap();
        let json = serde_json::to_value(ServerMessage::NewTrace { trace: Box::new(trace) }).unwrap();
        assert_eq!(json["type"], "new_trace");
        assert_eq!(json["trace"]["id"], "t1");
        assert_eq!(json["trace"]["type"], "prompt");
    }
}
