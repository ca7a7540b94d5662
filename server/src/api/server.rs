//! API server initialization

use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::ApiState;
use super::openapi;
use super::routes::{health, sessions, traces, ws};
use crate::core::CoreApp;
use crate::core::constants::DEFAULT_BODY_LIMIT;

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app } = self;

        // Clone shutdown before moving app
        let shutdown = app.shutdown.clone();

        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);

        let state = ApiState {
            pipeline: app.pipeline.clone(),
            correlator: app.correlator.clone(),
            registry: app.registry.clone(),
            gateway: app.gateway.clone(),
            store: app.store.clone(),
            shutdown_rx: shutdown.subscribe(),
        };

        let router = Router::new()
            .route("/api/v1/health", get(health::health))
            .route("/api/v1/openapi.json", get(openapi::openapi_json))
            .route("/api/v1/traces", post(traces::submit_trace))
            .route("/api/v1/traces/batch", post(traces::submit_batch))
            .route("/api/v1/traces/session", post(traces::submit_session))
            .route("/api/v1/traces/correlate", post(traces::correlate))
            .route("/api/v1/traces/detect", post(traces::detect_trace))
            .route("/api/v1/sessions/{session_id}", get(sessions::get_session))
            .route(
                "/api/v1/sessions/{session_id}/traces",
                get(sessions::get_session_traces),
            )
            .route(
                "/api/v1/sessions/{session_id}/status",
                post(sessions::set_session_status),
            )
            .route("/ws", get(ws::ws_handler))
            .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "API server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        Ok(app)
    }
}
