//! tracedeck server library
//!
//! Real-time trace ingestion, correlation, and session broadcast engine for
//! LLM-application debugging.

pub mod api;
pub mod app;
pub mod core;
pub mod data;
pub mod domain;
