//! Request types for OpenRouter API communication
//!
//! This module defines the payload types for completion and chat requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A message in a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Numeric generation parameters, fixed for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Max new tokens per completion
    pub max_tokens: u32,
    pub temperature: f64,
    pub min_p: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 128,
            temperature: 1.0,
            min_p: 0.02,
        }
    }
}

/// A raw-completion request - everything needed for one generation call.
/// Constructed fresh per call, never mutated.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub min_p: f64,
}

impl CompletionRequest {
    /// Create a request from a context string and session parameters
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, params: &GenerationParams) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            min_p: params.min_p,
        }
    }

    /// Serialize to the OpenRouter completions payload
    pub fn to_payload(&self) -> Value {
        serde_json::json!({
            "model": self.model,
            "prompt": self.prompt,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "min_p": self.min_p,
        })
    }
}

/// A chat request against the instruct endpoint (judging, naming).
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
}

impl ChatRequest {
    /// Create a single-turn user request
    pub fn user(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::user(content)],
        }
    }

    /// Serialize to the OpenRouter chat completions payload
    pub fn to_payload(&self) -> Value {
        serde_json::json!({
            "model": self.model,
            "messages": self.messages,
        })
    }
}
