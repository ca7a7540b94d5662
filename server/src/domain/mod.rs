//! Domain logic for live trace debugging
//!
//! - `traces` - validation, detection, ingestion pipeline, correlation
//! - `sessions` - session registry and live-client membership
//! - `gateway` - session room broadcast and the live-connection protocol

pub mod gateway;
pub mod sessions;
pub mod traces;

pub use gateway::{BroadcastGateway, ClientMessage, ServerMessage};
pub use sessions::{ConnectedClient, SessionRegistry};
pub use traces::{CorrelationEngine, TracePipeline};
