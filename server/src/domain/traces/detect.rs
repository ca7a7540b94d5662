//! Language/framework detection
//!
//! Heuristic cascade over a raw trace: explicit metadata wins outright,
//! otherwise shape-sniffing of the payload and stack-trace patterns. Total
//! function; the worst case is the `custom`/`javascript` fallback below the
//! confidence threshold.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::data::types::UniversalTrace;

/// Language identifiers this engine recognizes
pub const SUPPORTED_LANGUAGES: &[&str] = &["javascript", "python", "go", "java", "csharp", "rust"];

/// Framework identifiers this engine recognizes
pub const SUPPORTED_FRAMEWORKS: &[&str] = &[
    "langchain",
    "llamaindex",
    "autogen",
    "crewai",
    "flowise",
    "custom",
];

/// Detection outcome with the evidence that produced it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub language: String,
    pub framework: String,
    pub confidence: f32,
    pub evidence: Vec<String>,
}

/// Infer producing language and framework from a trace's shape
pub fn detect(trace: &UniversalTrace) -> Detection {
    let mut language = "javascript".to_string();
    let mut framework = "custom".to_string();
    let mut confidence: f32 = 0.0;
    let mut evidence = Vec::new();

    let explicit_language = metadata_str(&trace.metadata, "language");
    let explicit_framework = metadata_str(&trace.metadata, "framework");

    if let Some(lang) = explicit_language {
        evidence.push(format!("explicit language field: {lang}"));
        language = lang.to_string();
        confidence = 1.0;
    }
    if let Some(fw) = explicit_framework {
        evidence.push(format!("explicit framework field: {fw}"));
        framework = fw.to_string();
        confidence = 1.0;
    }
    if explicit_language.is_some() && explicit_framework.is_some() {
        return Detection { language, framework, confidence, evidence };
    }

    // Framework shape-sniffing over the opaque payload
    if explicit_framework.is_none() {
        if has_key(trace, "run_id") || has_nested_key(&trace.data, "serialized", "kwargs") {
            evidence.push("LangChain payload shape (run_id/serialized.kwargs)".to_string());
            framework = "langchain".to_string();
            confidence = confidence.max(0.8);
            // JS/Python ambiguous; this ingestion path defaults to JS
            if explicit_language.is_none() {
                language = "javascript".to_string();
            }
        } else if has_key(trace, "query_id") || has_key(trace, "node_ids") {
            evidence.push("LlamaIndex payload shape (query_id/node_ids)".to_string());
            framework = "llamaindex".to_string();
            confidence = confidence.max(0.8);
            if explicit_language.is_none() {
                evidence.push("LlamaIndex is typically Python".to_string());
                language = "python".to_string();
            }
        }
    }

    // Runtime markers pin the language
    if explicit_language.is_none() {
        let markers: &[(&[&str], &str)] = &[
            (&["python_version", "pip_version", "virtual_env"], "python"),
            (&["node_version", "npm_version"], "javascript"),
            (&["go_version", "go_mod"], "go"),
            (&["java_version", "maven_version", "gradle_version"], "java"),
        ];
        for (keys, lang) in markers {
            if keys.iter().any(|k| trace.metadata.contains_key(*k)) {
                evidence.push(format!("{lang} runtime metadata detected"));
                language = lang.to_string();
                confidence = confidence.max(0.9);
                break;
            }
        }
    }

    // Stack-trace patterns
    if explicit_language.is_none()
        && let Some(stack) = stack_trace_text(trace)
    {
        if stack.contains("Traceback (most recent call last)") || stack.contains(".py\", line") {
            evidence.push("Python stack trace pattern".to_string());
            language = "python".to_string();
            confidence = confidence.max(0.8);
        } else if stack.contains("at ") && (stack.contains(".js:") || stack.contains(".ts:")) {
            evidence.push("JavaScript stack trace pattern".to_string());
            language = "javascript".to_string();
            confidence = confidence.max(0.8);
        } else if stack.contains("at java.") || stack.contains(".java:") {
            evidence.push("Java stack trace pattern".to_string());
            language = "java".to_string();
            confidence = confidence.max(0.8);
        }
    }

    if evidence.is_empty() {
        evidence.push("no recognizable markers".to_string());
        confidence = 0.2;
    }

    Detection { language, framework, confidence, evidence }
}

fn metadata_str<'a>(metadata: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    metadata.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Key present in either the data payload (top level) or the metadata map
fn has_key(trace: &UniversalTrace, key: &str) -> bool {
    trace.metadata.contains_key(key)
        || trace.data.as_object().is_some_and(|obj| obj.contains_key(key))
}

fn has_nested_key(data: &Value, outer: &str, inner: &str) -> bool {
    data.get(outer)
        .and_then(Value::as_object)
        .is_some_and(|obj| obj.contains_key(inner))
}

fn stack_trace_text(trace: &UniversalTrace) -> Option<&str> {
    trace
        .metadata
        .get("stack_trace")
        .or_else(|| trace.metadata.get("error"))
        .or_else(|| trace.data.get("stack_trace"))
        .or_else(|| trace.data.get("error"))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::DETECTION_CONFIDENCE_THRESHOLD;

    fn trace(json: serde_json::Value) -> UniversalTrace {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_explicit_metadata_wins_outright() {
        let t = trace(serde_json::json!({
            "id": "t1",
            "sessionId": "s1",
            "type": "prompt",
            "metadata": {"language": "rust", "framework": "custom"},
        }));
        let detection = detect(&t);
        assert_eq!(detection.language, "rust");
        assert_eq!(detection.framework, "custom");
        assert_eq!(detection.confidence, 1.0);
    }

    #[test]
    fn test_langchain_shape_defaults_to_javascript() {
        let t = trace(serde_json::json!({
            "id": "t1",
            "sessionId": "s1",
            "type": "chain_start",
            "data": {"run_id": "r-9", "serialized": {"kwargs": {}}},
        }));
        let detection = detect(&t);
        assert_eq!(detection.framework, "langchain");
        assert_eq!(detection.language, "javascript");
        assert!(detection.confidence >= DETECTION_CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn test_llamaindex_shape_implies_python() {
        let t = trace(serde_json::json!({
            "id": "t1",
            "sessionId": "s1",
            "type": "agent_step",
            "data": {"query_id": "q-1", "node_ids": ["n1", "n2"]},
        }));
        let detection = detect(&t);
        assert_eq!(detection.framework, "llamaindex");
        assert_eq!(detection.language, "python");
    }

    #[test]
    fn test_runtime_marker_pins_language() {
        let t = trace(serde_json::json!({
            "id": "t1",
            "sessionId": "s1",
            "type": "prompt",
            "metadata": {"python_version": "3.12.1"},
        }));
        let detection = detect(&t);
        assert_eq!(detection.language, "python");
        assert!(detection.confidence >= 0.9);
    }

    #[test]
    fn test_python_stack_trace_pattern() {
        let t = trace(serde_json::json!({
            "id": "t1",
            "sessionId": "s1",
            "type": "error",
            "metadata": {"stack_trace": "Traceback (most recent call last):\n  File \"app.py\", line 3"},
        }));
        let detection = detect(&t);
        assert_eq!(detection.language, "python");
    }

    #[test]
    fn test_unrecognized_trace_falls_back_below_threshold() {
        let t = trace(serde_json::json!({
            "id": "t1",
            "sessionId": "s1",
            "type": "prompt",
        }));
        let detection = detect(&t);
        assert_eq!(detection.framework, "custom");
        assert!(detection.confidence < DETECTION_CONFIDENCE_THRESHOLD);
        assert!(!detection.evidence.is_empty());
    }

    #[test]
    fn test_explicit_framework_with_sniffed_language() {
        let t = trace(serde_json::json!({
            "id": "t1",
            "sessionId": "s1",
            "type": "prompt",
            "metadata": {"framework": "crewai", "node_version": "22.1.0"},
        }));
        let detection = detect(&t);
        assert_eq!(detection.framework, "crewai");
        assert_eq!(detection.language, "javascript");
        assert_eq!(detection.confidence, 1.0);
    }
}
