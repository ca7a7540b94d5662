//! Classification enums for trace and session records
//!
//! Trace `type` and `status` travel as plain strings on the wire so the
//! validator can reject out-of-enum values as a structured failure instead of
//! a deserialization error. These enums are the closed vocabularies those
//! strings are checked against.

use serde::{Deserialize, Serialize};

// ============================================================================
// TRACE TYPE
// ============================================================================

/// Event types a universal trace can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceType {
    Prompt,
    Response,
    FunctionCall,
    ToolUse,
    AgentStep,
    Error,
    Warning,
    ChainStart,
    ChainEnd,
}

impl TraceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Response => "response",
            Self::FunctionCall => "function_call",
            Self::ToolUse => "tool_use",
            Self::AgentStep => "agent_step",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::ChainStart => "chain_start",
            Self::ChainEnd => "chain_end",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "prompt" => Some(Self::Prompt),
            "response" => Some(Self::Response),
            "function_call" => Some(Self::FunctionCall),
            "tool_use" => Some(Self::ToolUse),
            "agent_step" => Some(Self::AgentStep),
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "chain_start" => Some(Self::ChainStart),
            "chain_end" => Some(Self::ChainEnd),
            _ => None,
        }
    }

    pub const fn all() -> &'static [TraceType] {
        &[
            Self::Prompt,
            Self::Response,
            Self::FunctionCall,
            Self::ToolUse,
            Self::AgentStep,
            Self::Error,
            Self::Warning,
            Self::ChainStart,
            Self::ChainEnd,
        ]
    }
}

// ============================================================================
// TRACE STATUS
// ============================================================================

/// Processing status of a single trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Cancelled,
    Error,
}

impl TraceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Whether this status counts toward a session's error counter
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }

    /// Whether this status counts toward a session's success counter
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

// ============================================================================
// SESSION STATUS
// ============================================================================

/// Lifecycle status of a debugging session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
    Archived,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}
