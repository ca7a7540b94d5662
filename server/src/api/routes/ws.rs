//! Live-connection WebSocket endpoint
//!
//! Transport for the gateway protocol. Each connection runs one select loop:
//! outbound gateway messages, inbound client frames, and the shutdown signal.
//! Malformed frames are answered with an `error` message on that connection
//! only; they never terminate the connection or touch the rest of the room.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};

use super::super::ApiState;
use crate::domain::gateway::ClientMessage;

pub async fn ws_handler(State(state): State<ApiState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: ApiState) {
    let (connection_id, mut outbound) = state.gateway.register();
    let (mut sink, mut stream) = socket.split();
    let mut shutdown_rx = state.shutdown_rx.clone();

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
            outgoing = outbound.recv() => {
                match outgoing {
                    Some(message) => match serde_json::to_string(&message) {
                        Ok(payload) => {
                            if sink.send(Message::Text(payload.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize server message");
                        }
                    },
                    // Gateway dropped the channel (shutdown)
                    None => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&state, &connection_id, text.as_str()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // Ping/pong are answered by the transport; binary is ignored
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %connection_id, error = %e, "Transport error");
                        break;
                    }
                }
            }
        }
    }

    // Cleanup is unconditional, whatever state the connection was in
    state.gateway.disconnect(&connection_id);
}

async fn handle_client_message(state: &ApiState, connection_id: &str, text: &str) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            state
                .gateway
                .send_error(connection_id, format!("malformed message: {e}"));
            return;
        }
    };

    match message {
        ClientMessage::JoinSession { session_id, user_id } => {
            if let Err(e) = state
                .gateway
                .join(connection_id, &session_id, user_id.as_deref())
                .await
            {
                tracing::warn!(connection_id, session_id = %session_id, error = %e, "Join failed");
                state
                    .gateway
                    .send_error(connection_id, format!("join failed: {e}"));
            }
        }
        ClientMessage::LeaveSession { session_id } => {
            state.gateway.leave(connection_id, &session_id);
        }
        ClientMessage::TraceEvent { trace } => {
            // Same contract as any inbound submitter
            let result = state.pipeline.submit_trace(*trace).await;
            if !result.success
                && let Some(error) = result.error
            {
                state.gateway.send_error(connection_id, error);
            }
        }
        ClientMessage::RequestSessionState { session_id } => {
            state
                .gateway
                .send_session_state(connection_id, &session_id)
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::sync::watch;

    use crate::core::config::IngestConfig;
    use crate::data::store::MemoryTraceStore;
    use crate::domain::gateway::{BroadcastGateway, ServerMessage};
    use crate::domain::sessions::SessionRegistry;
    use crate::domain::traces::{CorrelationEngine, TracePipeline};

    fn state() -> ApiState {
        let store = Arc::new(MemoryTraceStore::new());
        let registry = Arc::new(SessionRegistry::new(store.clone()));
        let gateway = Arc::new(BroadcastGateway::new(registry.clone(), store.clone()));
        let pipeline = Arc::new(TracePipeline::new(
            store.clone(),
            registry.clone(),
            gateway.clone(),
            &IngestConfig::default(),
        ));
        let correlator = Arc::new(CorrelationEngine::new(store.clone()));
        let (_tx, shutdown_rx) = watch::channel(false);
        ApiState {
            pipeline,
            correlator,
            registry,
            gateway,
            store,
            shutdown_rx,
        }
    }

    #[tokio::test]
    async fn test_malformed_message_answered_with_error() {
        let state = state();
        let (connection_id, mut rx) = state.gateway.register();
        rx.recv().await.unwrap();

        handle_client_message(&state, &connection_id, "{not json").await;

        match rx.recv().await.unwrap() {
            ServerMessage::Error { message } => assert!(message.contains("malformed")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_join_then_trace_event_round_trip() {
        let state = state();
        let (submitter, mut rx_submitter) = state.gateway.register();
        let (observer, mut rx_observer) = state.gateway.register();
        rx_submitter.recv().await.unwrap();
        rx_observer.recv().await.unwrap();

        handle_client_message(&state, &observer, r#"{"type":"join_session","sessionId":"s1"}"#)
            .await;
        assert!(matches!(
            rx_observer.recv().await.unwrap(),
            ServerMessage::SessionJoined { .. }
        ));

        handle_client_message(
            &state,
            &submitter,
            r#"{"type":"trace_event","trace":{"id":"t1","sessionId":"s1","type":"prompt","status":"completed"}}"#,
        )
        .await;

        match rx_observer.recv().await.unwrap() {
            ServerMessage::NewTrace { trace } => assert_eq!(trace.id, "t1"),
            other => panic!("expected new_trace, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_trace_event_errors_sender_only() {
        let state = state();
        let (submitter, mut rx_submitter) = state.gateway.register();
        let (observer, mut rx_observer) = state.gateway.register();
        rx_submitter.recv().await.unwrap();
        rx_observer.recv().await.unwrap();
        handle_client_message(&state, &observer, r#"{"type":"join_session","sessionId":"s1"}"#)
            .await;
        rx_observer.recv().await.unwrap();

        handle_client_message(
            &state,
            &submitter,
            r#"{"type":"trace_event","trace":{"id":"","sessionId":"s1","type":"prompt"}}"#,
        )
        .await;

        assert!(matches!(
            rx_submitter.recv().await.unwrap(),
            ServerMessage::Error { .. }
        ));
        assert!(rx_observer.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_request_session_state_catch_up() {
        let state = state();

        // K traces submitted before the observer ever connects
        for i in 0..3 {
            let trace: crate::data::types::UniversalTrace = serde_json::from_value(
                serde_json::json!({
                    "id": format!("t{i}"),
                    "sessionId": "s1",
                    "type": "prompt",
                    "status": "completed",
                }),
            )
            .unwrap();
            assert!(state.pipeline.submit_trace(trace).await.success);
        }

        let (late_joiner, mut rx) = state.gateway.register();
        rx.recv().await.unwrap();
        handle_client_message(&state, &late_joiner, r#"{"type":"join_session","sessionId":"s1"}"#)
            .await;
        rx.recv().await.unwrap();
        handle_client_message(
            &state,
            &late_joiner,
            r#"{"type":"request_session_state","sessionId":"s1"}"#,
        )
        .await;

        match rx.recv().await.unwrap() {
            ServerMessage::SessionState { traces, .. } => {
                let ids: Vec<_> = traces.iter().map(|t| t.id.as_str()).collect();
                assert_eq!(ids, vec!["t0", "t1", "t2"]);
            }
            other => panic!("expected session_state, got {other:?}"),
        }
    }
}
