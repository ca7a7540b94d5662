//! Data layer
//!
//! - `store` - the persistence collaborator (sqlite + memory backends)
//! - `types` - shared trace/session types across all layers

pub mod store;
pub mod types;

pub use store::{MemoryTraceStore, SqliteTraceStore, StoreError, TraceStore};
pub use types::{
    Session, SessionCounterDelta, SessionPayload, SessionStatus, TraceBatch, TraceStatus,
    TraceType, UniversalTrace,
};
