//! Session lifecycle and live-client membership

mod registry;

pub use registry::{ConnectedClient, SessionRegistry};
