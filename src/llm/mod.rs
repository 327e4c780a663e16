//! LLM client layer - OpenRouter API integration with retry and backoff
//!
//! This module provides:
//! - Request types for the completions and chat endpoints
//! - CompletionClient trait for API abstraction
//! - OpenRouterClient implementation
//! - Retry/backoff policy and failure markers

pub mod client;
pub mod openrouter;
pub mod retry;
pub mod types;

pub use client::{CompletionClient, LlmError, MockClient, RetryClass};
pub use openrouter::{OpenRouterClient, OPENROUTER_BASE_URL};
pub use retry::{
    backoff_delay, complete_with_retry, delay_for, rate_limit_delay, unexpected_backoff_delay,
    RetryPolicy, COMPLETION_FAILED_PREFIX, NO_TOKEN_MARKER,
};
pub use types::{ChatRequest, CompletionRequest, GenerationParams, Message, Role};
