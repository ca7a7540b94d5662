//! Real-time session broadcast gateway

mod broadcast;
mod protocol;

pub use broadcast::BroadcastGateway;
pub use protocol::{ClientMessage, ServerMessage};
