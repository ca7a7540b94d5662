//! Trace processing domain
//!
//! - `validate` - structural validation of one universal trace
//! - `detect` - language/framework inference
//! - `pipeline` - validate -> enrich -> persist -> broadcast ingestion
//! - `correlate` - on-demand parent/child/sibling graph reconstruction

pub mod correlate;
pub mod detect;
pub mod pipeline;
pub mod validate;

pub use correlate::{CorrelationEngine, CorrelationGraph};
pub use detect::{Detection, SUPPORTED_FRAMEWORKS, SUPPORTED_LANGUAGES, detect};
pub use pipeline::{BatchResult, SessionSubmitResult, SubmitResult, TracePipeline, TraceResult};
pub use validate::{TraceValidator, ValidationResult};
