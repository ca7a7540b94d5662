//! Trace validation
//!
//! Pure structural/semantic checks over one universal trace record. No side
//! effects; the same input always yields the same result. Expected failures
//! are values in the returned [`ValidationResult`], never errors.

use serde::Serialize;

use crate::data::types::{TraceStatus, TraceType, UniversalTrace};

/// Outcome of validating a single trace
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Structural validator for inbound traces
///
/// `metadata_max_bytes` is the payload-bloat ceiling: oversized metadata is
/// flagged as a warning, not a failure.
#[derive(Debug, Clone, Copy)]
pub struct TraceValidator {
    metadata_max_bytes: usize,
}

impl TraceValidator {
    pub fn new(metadata_max_bytes: usize) -> Self {
        Self { metadata_max_bytes }
    }

    pub fn validate(&self, trace: &UniversalTrace) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if trace.id.trim().is_empty() {
            errors.push("trace id is missing or empty".to_string());
        }
        if trace.session_id.trim().is_empty() {
            errors.push("session id is missing or empty".to_string());
        }

        if TraceType::parse(&trace.trace_type).is_none() {
            if trace.trace_type.is_empty() {
                errors.push("trace type is missing".to_string());
            } else {
                errors.push(format!("unknown trace type: {}", trace.trace_type));
            }
        }

        if let Some(ref parent_id) = trace.parent_id
            && parent_id == &trace.id
            && !trace.id.is_empty()
        {
            errors.push("trace cannot be its own parent".to_string());
        }

        if trace.timestamp.is_none() {
            warnings.push("timestamp missing; defaulting to ingestion time".to_string());
        }

        if TraceStatus::parse(&trace.status).is_none() {
            warnings.push(format!(
                "unknown status '{}'; treated as pending",
                trace.status
            ));
        }

        let metadata_bytes = serde_json::to_string(&trace.metadata)
            .map(|s| s.len())
            .unwrap_or(0);
        if metadata_bytes > self.metadata_max_bytes {
            warnings.push(format!(
                "metadata is {} bytes, exceeds ceiling of {}",
                metadata_bytes, self.metadata_max_bytes
            ));
        }

        ValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> TraceValidator {
        TraceValidator::new(1024)
    }

    fn trace(json: serde_json::Value) -> UniversalTrace {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_valid_trace() {
        let t = trace(serde_json::json!({
            "id": "t1",
            "sessionId": "s1",
            "type": "prompt",
            "status": "completed",
            "timestamp": chrono::Utc::now(),
        }));
        let result = validator().validate(&t);
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_missing_id_and_session() {
        let t = trace(serde_json::json!({"id": "", "sessionId": " ", "type": "prompt"}));
        let result = validator().validate(&t);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let t = trace(serde_json::json!({"id": "t1", "sessionId": "s1", "type": "telemetry"}));
        let result = validator().validate(&t);
        assert!(!result.valid);
        assert!(result.errors[0].contains("unknown trace type"));
    }

    #[test]
    fn test_self_parent_rejected() {
        let t = trace(serde_json::json!({
            "id": "t1",
            "sessionId": "s1",
            "parentId": "t1",
            "type": "prompt",
        }));
        let result = validator().validate(&t);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("own parent")));
    }

    #[test]
    fn test_missing_timestamp_warns() {
        let t = trace(serde_json::json!({"id": "t1", "sessionId": "s1", "type": "prompt"}));
        let result = validator().validate(&t);
        assert!(result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("timestamp")));
    }

    #[test]
    fn test_oversized_metadata_warns_but_passes() {
        let blob = "x".repeat(2048);
        let t = trace(serde_json::json!({
            "id": "t1",
            "sessionId": "s1",
            "type": "prompt",
            "timestamp": chrono::Utc::now(),
            "metadata": {"blob": blob},
        }));
        let result = validator().validate(&t);
        assert!(result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("ceiling")));
    }

    #[test]
    fn test_unknown_status_warns() {
        let t = trace(serde_json::json!({
            "id": "t1",
            "sessionId": "s1",
            "type": "prompt",
            "status": "exploded",
            "timestamp": chrono::Utc::now(),
        }));
        let result = validator().validate(&t);
        assert!(result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("exploded")));
    }

    #[test]
    fn test_validation_is_deterministic() {
        let t = trace(serde_json::json!({"id": "t1", "sessionId": "s1", "type": "nope"}));
        let v = validator();
        assert_eq!(v.validate(&t), v.validate(&t));
    }
}
