//! Trace ingestion pipeline
//!
//! Orchestrates the processing stages for every inbound trace:
//!
//! ```text
//! validate -> detect/enrich -> session counters -> persist -> broadcast
//! ```
//!
//! Three entry points (`submit_trace`, `submit_batch`, `submit_session`), each
//! returning a structured result. Expected failures are values, never errors:
//! a validation rejection, a persistence failure, and a durable success are
//! three distinct result shapes. Traces within one call are processed and
//! broadcast in the order supplied.
//!
//! Batch and whole-session submissions publish one aggregated summary per
//! involved session room instead of N individual events, to bound broadcast
//! volume; late joiners recover the full list via the catch-up protocol.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use super::detect::detect;
use super::validate::{TraceValidator, ValidationResult};
use crate::core::config::IngestConfig;
use crate::core::constants::DETECTION_CONFIDENCE_THRESHOLD;
use crate::data::store::TraceStore;
use crate::data::types::{SessionPayload, TraceBatch, UniversalTrace};
use crate::domain::gateway::BroadcastGateway;
use crate::domain::sessions::SessionRegistry;

/// Result of one trace submission
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    pub success: bool,
    pub validation: ValidationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_trace: Option<UniversalTrace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitResult {
    fn rejected(validation: ValidationResult) -> Self {
        let error = format!("validation failed: {}", validation.errors.join(", "));
        Self {
            success: false,
            validation,
            processed_trace: None,
            error: Some(error),
        }
    }
}

/// Per-trace entry in batch/session results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResult {
    pub trace_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a batch submission; partial failures do not abort the batch
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub success: bool,
    pub batch_id: String,
    pub processed_count: usize,
    pub failed_count: usize,
    pub results: Vec<TraceResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a whole-session submission
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSubmitResult {
    pub session_id: String,
    pub processed_count: usize,
    pub failed_count: usize,
    pub results: Vec<TraceResult>,
}

pub struct TracePipeline {
    store: Arc<dyn TraceStore>,
    registry: Arc<SessionRegistry>,
    gateway: Arc<BroadcastGateway>,
    validator: TraceValidator,
    batch_max_traces: usize,
}

impl TracePipeline {
    pub fn new(
        store: Arc<dyn TraceStore>,
        registry: Arc<SessionRegistry>,
        gateway: Arc<BroadcastGateway>,
        config: &IngestConfig,
    ) -> Self {
        Self {
            store,
            registry,
            gateway,
            validator: TraceValidator::new(config.metadata_max_bytes),
            batch_max_traces: config.batch_max_traces,
        }
    }

    /// Process one trace and fan it out to its session's room
    pub async fn submit_trace(&self, trace: UniversalTrace) -> SubmitResult {
        self.process_trace(trace, true).await
    }

    /// Process each batch element independently; one failing trace does not
    /// abort the rest. Successful ids are announced as one aggregated
    /// `batch_result` event per involved session room.
    pub async fn submit_batch(&self, batch: TraceBatch) -> BatchResult {
        if batch.traces.len() > self.batch_max_traces {
            let failed_count = batch.traces.len();
            return BatchResult {
                success: false,
                batch_id: batch.batch_id,
                processed_count: 0,
                failed_count,
                results: Vec::new(),
                error: Some(format!(
                    "batch of {} traces exceeds limit of {}",
                    failed_count, self.batch_max_traces
                )),
            };
        }

        let mut results = Vec::with_capacity(batch.traces.len());
        // Successful (durable) trace ids grouped by session for the summary
        let mut by_session: HashMap<String, Vec<String>> = HashMap::new();

        for trace in batch.traces {
            let trace_id = trace.id.clone();
            let session_id = trace.session_id.clone();
            let result = self.process_trace(trace, false).await;
            if result.success {
                by_session.entry(session_id).or_default().push(trace_id.clone());
            }
            results.push(TraceResult {
                trace_id,
                success: result.success,
                error: result.error,
            });
        }

        let processed_count = results.iter().filter(|r| r.success).count();
        let failed_count = results.len() - processed_count;

        for (session_id, trace_ids) in by_session {
            self.gateway.publish_batch_result(
                &batch.batch_id,
                &session_id,
                processed_count,
                failed_count,
                trace_ids,
            );
        }

        tracing::debug!(
            batch_id = %batch.batch_id,
            processed_count,
            failed_count,
            "Batch processed"
        );

        BatchResult {
            success: processed_count > 0,
            batch_id: batch.batch_id,
            processed_count,
            failed_count,
            results,
            error: None,
        }
    }

    /// Process a whole-session payload: session metadata is merged first,
    /// every trace is rescoped to the payload's session, then processed with
    /// the same per-trace independence as a batch.
    pub async fn submit_session(&self, payload: SessionPayload) -> SessionSubmitResult {
        let session_id = payload.session_id.clone();

        if let Err(e) = self
            .registry
            .ensure_session(&session_id, payload.name.as_deref(), Some(&payload.metadata))
            .await
        {
            tracing::warn!(session_id = %session_id, error = %e, "Session submission rejected");
            let error = format!("session lookup failed: {e}");
            let results: Vec<TraceResult> = payload
                .traces
                .iter()
                .map(|t| TraceResult {
                    trace_id: t.id.clone(),
                    success: false,
                    error: Some(error.clone()),
                })
                .collect();
            let failed_count = results.len();
            return SessionSubmitResult {
                session_id,
                processed_count: 0,
                failed_count,
                results,
            };
        }

        let mut results = Vec::with_capacity(payload.traces.len());
        for mut trace in payload.traces {
            trace.session_id = session_id.clone();
            let trace_id = trace.id.clone();
            let result = self.process_trace(trace, false).await;
            results.push(TraceResult {
                trace_id,
                success: result.success,
                error: result.error,
            });
        }

        let processed_count = results.iter().filter(|r| r.success).count();
        let failed_count = results.len() - processed_count;

        self.gateway
            .publish_session_result(&session_id, processed_count, failed_count);

        SessionSubmitResult {
            session_id,
            processed_count,
            failed_count,
            results,
        }
    }

    /// Validate, enrich, count, persist, and optionally broadcast one trace.
    ///
    /// Counters and broadcasts are not rolled back when persistence fails;
    /// that outcome is reported as `success=false` with a valid validation
    /// result ("delivered but not durably recorded").
    async fn process_trace(&self, trace: UniversalTrace, publish: bool) -> SubmitResult {
        let validation = self.validator.validate(&trace);
        if !validation.valid {
            tracing::debug!(trace_id = %trace.id, errors = ?validation.errors, "Trace rejected");
            return SubmitResult::rejected(validation);
        }
        for warning in &validation.warnings {
            tracing::debug!(trace_id = %trace.id, warning = %warning, "Trace warning");
        }

        let trace = self.enrich(trace);

        if let Err(e) = self
            .registry
            .ensure_session(&trace.session_id, None, None)
            .await
        {
            tracing::warn!(trace_id = %trace.id, error = %e, "Session lookup failed");
            return SubmitResult {
                success: false,
                validation,
                processed_trace: None,
                error: Some(format!("session lookup failed: {e}")),
            };
        }

        self.registry
            .record_trace_status(&trace.session_id, trace.parsed_status())
            .await;

        let persist_error = self.store.save_trace(&trace).await.err();
        if let Some(ref e) = persist_error {
            tracing::warn!(trace_id = %trace.id, error = %e, "Trace not durably recorded");
        }

        if publish {
            self.gateway.publish_trace(&trace);
        }

        SubmitResult {
            success: persist_error.is_none(),
            validation,
            error: persist_error.map(|e| format!("persistence failed: {e}")),
            processed_trace: Some(trace),
        }
    }

    /// Default the timestamp, run detection when language/framework are not
    /// declared, and stamp server metadata
    fn enrich(&self, mut trace: UniversalTrace) -> UniversalTrace {
        if trace.timestamp.is_none() {
            trace.timestamp = Some(Utc::now());
        }

        if trace.language().is_none() || trace.framework().is_none() {
            let detection = detect(&trace);
            if detection.confidence < DETECTION_CONFIDENCE_THRESHOLD {
                tracing::warn!(
                    trace_id = %trace.id,
                    confidence = detection.confidence,
                    "Ambiguous framework detection"
                );
            }
            if trace.language().is_none() {
                trace
                    .metadata
                    .insert("language".to_string(), detection.language.clone().into());
            }
            if trace.framework().is_none() {
                trace
                    .metadata
                    .insert("framework".to_string(), detection.framework.clone().into());
            }
            trace.metadata.insert(
                "_detection".to_string(),
                serde_json::json!({
                    "confidence": detection.confidence,
                    "evidence": detection.evidence,
                }),
            );
        }

        trace.metadata.insert(
            "_server".to_string(),
            serde_json::json!({
                "processedAt": Utc::now(),
                "serverVersion": env!("CARGO_PKG_VERSION"),
            }),
        );

        trace
    }
}
