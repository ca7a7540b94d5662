//! Cross-trace correlation
//!
//! Rebuilds parent/child and session-sibling structure for a requested set of
//! trace ids, independent of producing language. Read-only; no broadcast, no
//! persistence side effects. Unknown ids are silently skipped - correlation
//! is a debugging aid, not a transactional operation.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::data::store::{StoreError, TraceStore};
use crate::data::types::UniversalTrace;

/// Derived, ephemeral correlation structure; computed on demand, never stored
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationGraph {
    /// Every included trace id, requested and ancestor alike
    pub nodes: Vec<String>,
    /// Parent id -> child ids
    pub edges: BTreeMap<String, Vec<String>>,
    /// Ancestors pulled in beyond the requested set; not expanded further
    pub boundary: Vec<String>,
    /// Session id -> member trace ids (sibling adjacency)
    pub sessions: BTreeMap<String, Vec<String>>,
    pub languages: BTreeSet<String>,
    pub frameworks: BTreeSet<String>,
}

pub struct CorrelationEngine {
    store: Arc<dyn TraceStore>,
}

impl CorrelationEngine {
    pub fn new(store: Arc<dyn TraceStore>) -> Self {
        Self { store }
    }

    /// Build the correlation graph for the requested trace ids.
    ///
    /// Ancestor chains are followed upward: a parent outside the requested
    /// set is loaded and included as a boundary node, then its own parent is
    /// followed in turn, but boundary nodes are never expanded sideways into
    /// their session siblings.
    pub async fn correlate(&self, trace_ids: &[String]) -> Result<CorrelationGraph, StoreError> {
        let requested: HashSet<&String> = trace_ids.iter().collect();

        let mut traces: BTreeMap<String, UniversalTrace> = BTreeMap::new();
        for trace in self.store.load_traces_by_ids(trace_ids).await? {
            traces.insert(trace.id.clone(), trace);
        }

        // Walk parent links upward; `attempted` guards against ids the store
        // does not know and against parent cycles
        let mut attempted: HashSet<String> = traces.keys().cloned().collect();
        loop {
            let missing: Vec<String> = traces
                .values()
                .filter_map(|t| t.parent_id.clone())
                .filter(|parent| !attempted.contains(parent))
                .collect();
            if missing.is_empty() {
                break;
            }
            attempted.extend(missing.iter().cloned());

            let ancestors = self.store.load_traces_by_ids(&missing).await?;
            if ancestors.is_empty() {
                break;
            }
            for ancestor in ancestors {
                traces.insert(ancestor.id.clone(), ancestor);
            }
        }

        let mut edges: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut sessions: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut languages = BTreeSet::new();
        let mut frameworks = BTreeSet::new();

        for trace in traces.values() {
            if let Some(ref parent_id) = trace.parent_id
                && traces.contains_key(parent_id)
            {
                edges.entry(parent_id.clone()).or_default().push(trace.id.clone());
            }
            sessions
                .entry(trace.session_id.clone())
                .or_default()
                .push(trace.id.clone());
            if let Some(language) = trace.language() {
                languages.insert(language.to_string());
            }
            if let Some(framework) = trace.framework() {
                frameworks.insert(framework.to_string());
            }
        }

        let boundary: Vec<String> = traces
            .keys()
            .filter(|id| !requested.contains(id))
            .cloned()
            .collect();
        let nodes: Vec<String> = traces.keys().cloned().collect();

        Ok(CorrelationGraph {
            nodes,
            edges,
            boundary,
            sessions,
            languages,
            frameworks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::store::MemoryTraceStore;

    fn trace(id: &str, session_id: &str, parent_id: Option<&str>, framework: &str) -> UniversalTrace {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "sessionId": session_id,
            "parentId": parent_id,
            "type": "agent_step",
            "status": "completed",
            "timestamp": chrono::Utc::now(),
            "metadata": {"language": "python", "framework": framework},
        }))
        .unwrap()
    }

    async fn engine_with(traces: Vec<UniversalTrace>) -> CorrelationEngine {
        let store = Arc::new(MemoryTraceStore::new());
        for t in &traces {
            store.save_trace(t).await.unwrap();
        }
        CorrelationEngine::new(store)
    }

    #[tokio::test]
    async fn test_ancestor_closure() {
        let engine = engine_with(vec![
            trace("t1", "s1", None, "langchain"),
            trace("t2", "s1", Some("t1"), "langchain"),
            trace("t3", "s1", Some("t2"), "langchain"),
        ])
        .await;

        let graph = engine.correlate(&["t3".to_string()]).await.unwrap();

        assert_eq!(graph.nodes, vec!["t1", "t2", "t3"]);
        assert_eq!(graph.boundary, vec!["t1", "t2"]);
        assert_eq!(graph.edges.get("t1"), Some(&vec!["t2".to_string()]));
        assert_eq!(graph.edges.get("t2"), Some(&vec!["t3".to_string()]));
    }

    #[tokio::test]
    async fn test_unknown_ids_silently_skipped() {
        let engine = engine_with(vec![trace("t1", "s1", None, "custom")]).await;

        let graph = engine
            .correlate(&["t1".to_string(), "ghost".to_string()])
            .await
            .unwrap();

        assert_eq!(graph.nodes, vec!["t1"]);
        assert!(graph.boundary.is_empty());
    }

    #[tokio::test]
    async fn test_empty_request_yields_empty_graph() {
        let engine = engine_with(vec![]).await;
        let graph = engine.correlate(&[]).await.unwrap();
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
    }

    #[tokio::test]
    async fn test_missing_parent_is_not_a_node() {
        let engine = engine_with(vec![trace("t2", "s1", Some("gone"), "custom")]).await;

        let graph = engine.correlate(&["t2".to_string()]).await.unwrap();

        assert_eq!(graph.nodes, vec!["t2"]);
        assert!(graph.edges.is_empty());
    }

    #[tokio::test]
    async fn test_parent_cycle_terminates() {
        let engine = engine_with(vec![
            trace("a", "s1", Some("b"), "custom"),
            trace("b", "s1", Some("a"), "custom"),
        ])
        .await;

        let graph = engine.correlate(&["a".to_string()]).await.unwrap();

        assert_eq!(graph.nodes, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_hybrid_session_aggregates() {
        let mut js = trace("t2", "s1", None, "langchain");
        js.metadata.insert("language".to_string(), "javascript".into());
        let engine = engine_with(vec![trace("t1", "s1", None, "llamaindex"), js]).await;

        let graph = engine
            .correlate(&["t1".to_string(), "t2".to_string()])
            .await
            .unwrap();

        assert_eq!(graph.sessions.get("s1").map(Vec::len), Some(2));
        assert!(graph.languages.contains("python"));
        assert!(graph.languages.contains("javascript"));
        assert!(graph.frameworks.contains("llamaindex"));
        assert!(graph.frameworks.contains("langchain"));
    }
}
