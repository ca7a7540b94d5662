//! HTTP/WebSocket API surface

pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod types;

pub use server::ApiServer;

use std::sync::Arc;

use tokio::sync::watch;

use crate::data::store::TraceStore;
use crate::domain::gateway::BroadcastGateway;
use crate::domain::sessions::SessionRegistry;
use crate::domain::traces::{CorrelationEngine, TracePipeline};

/// Shared state handed to every route handler
#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<TracePipeline>,
    pub correlator: Arc<CorrelationEngine>,
    pub registry: Arc<SessionRegistry>,
    pub gateway: Arc<BroadcastGateway>,
    pub store: Arc<dyn TraceStore>,
    pub shutdown_rx: watch::Receiver<bool>,
}
