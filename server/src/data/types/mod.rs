//! Shared data types across the store, pipeline, and API layers

mod enums;

pub use enums::{SessionStatus, TraceStatus, TraceType};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One observed event emitted by an instrumented LLM application.
///
/// `type` and `status` stay as strings here; the closed vocabularies live in
/// [`TraceType`] and [`TraceStatus`] and are enforced by the validator.
/// `data` and `metadata` are opaque structured payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversalTrace {
    /// Defaults to empty when absent so the validator can reject it as a
    /// structured failure instead of a deserialization error
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "session_id")]
    pub session_id: String,
    #[serde(default, alias = "parent_id", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Creation time; enrichment defaults it to ingestion time when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "type", default)]
    pub trace_type: String,
    #[serde(default = "default_trace_status")]
    pub status: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default, alias = "duration_ms", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

fn default_trace_status() -> String {
    TraceStatus::Pending.as_str().to_string()
}

impl UniversalTrace {
    /// Status interpreted against the closed vocabulary; unknown strings are
    /// treated as pending (validator downgrades them to a warning)
    pub fn parsed_status(&self) -> TraceStatus {
        TraceStatus::parse(&self.status).unwrap_or_default()
    }

    /// Detected or declared language, if enrichment has run
    pub fn language(&self) -> Option<&str> {
        self.metadata.get("language").and_then(Value::as_str)
    }

    /// Detected or declared framework, if enrichment has run
    pub fn framework(&self) -> Option<&str> {
        self.metadata.get("framework").and_then(Value::as_str)
    }
}

/// High-throughput submission wrapper; not persisted as an entity itself
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceBatch {
    #[serde(alias = "batch_id")]
    pub batch_id: String,
    pub traces: Vec<UniversalTrace>,
}

/// Whole-session submission: session-level metadata plus its traces
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    #[serde(alias = "session_id")]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub traces: Vec<UniversalTrace>,
}

/// A debugging scope grouping traces and live observers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub total_traces: u64,
    pub error_count: u64,
    pub success_count: u64,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Session {
    /// New active session starting now
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            start_time: Utc::now(),
            end_time: None,
            status: SessionStatus::Active,
            total_traces: 0,
            error_count: 0,
            success_count: 0,
            metadata: Map::new(),
        }
    }
}

/// Counter adjustment applied to a session when a trace is recorded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounterDelta {
    pub total: i64,
    pub errors: i64,
    pub successes: i64,
}

impl SessionCounterDelta {
    /// Delta for one trace with the given status
    pub fn for_status(status: TraceStatus) -> Self {
        Self {
            total: 1,
            errors: i64::from(status.is_error()),
            successes: i64::from(status.is_success()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_accepts_camel_and_snake_case() {
        let camel: UniversalTrace = serde_json::from_str(
            r#"{"id":"t1","sessionId":"s1","type":"prompt","status":"completed"}"#,
        )
        .unwrap();
        let snake: UniversalTrace = serde_json::from_str(
            r#"{"id":"t1","session_id":"s1","type":"prompt","status":"completed"}"#,
        )
        .unwrap();
        assert_eq!(camel.session_id, "s1");
        assert_eq!(snake.session_id, "s1");
    }

    #[test]
    fn test_trace_defaults() {
        let trace: UniversalTrace =
            serde_json::from_str(r#"{"id":"t1","sessionId":"s1"}"#).unwrap();
        assert_eq!(trace.status, "pending");
        assert!(trace.trace_type.is_empty());
        assert!(trace.timestamp.is_none());
        assert!(trace.data.is_null());
        assert!(trace.metadata.is_empty());
    }

    #[test]
    fn test_parsed_status_unknown_is_pending() {
        let mut trace: UniversalTrace =
            serde_json::from_str(r#"{"id":"t1","sessionId":"s1","type":"prompt"}"#).unwrap();
        trace.status = "exploded".to_string();
        assert_eq!(trace.parsed_status(), TraceStatus::Pending);
    }

    #[test]
    fn test_counter_delta_for_status() {
        let delta = SessionCounterDelta::for_status(TraceStatus::Failed);
        assert_eq!(delta, SessionCounterDelta { total: 1, errors: 1, successes: 0 });

        let delta = SessionCounterDelta::for_status(TraceStatus::Completed);
        assert_eq!(delta, SessionCounterDelta { total: 1, errors: 0, successes: 1 });
    }

    #[test]
    fn test_session_serializes_camel_case() {
        let session = Session::new("s1");
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("startTime").is_some());
        assert!(json.get("totalTraces").is_some());
    }
}
