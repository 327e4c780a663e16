//! Error types for Selfloom
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in Selfloom
#[derive(Debug, Error)]
pub enum LoomError {
    /// The event stream consumer went away
    #[error("Event stream closed by consumer")]
    StreamClosed,

    /// Document store error
    #[error("Document error: {0}")]
    Document(String),

    /// LLM API error
    #[error("LLM error: {0}")]
    Llm(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Selfloom operations
pub type Result<T> = std::result::Result<T, LoomError>;
