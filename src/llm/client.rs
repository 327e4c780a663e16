//! Core LLM client trait, error taxonomy, and test double

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::types::{ChatRequest, CompletionRequest};

/// Stateless completion client - each call is independent.
///
/// Two endpoint kinds: raw completions for generation and chat completions
/// for judging/naming. Implementations classify failures into [`LlmError`]
/// so the retry layer can decide what is worth retrying.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Single raw-completion request against the generation endpoint
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;

    /// Single chat request against the instruct endpoint
    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError>;

    /// Whether a credential is configured for this client
    fn is_ready(&self) -> bool;
}

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("no API token configured")]
    MissingToken,

    #[error("rate limited (429)")]
    RateLimited,

    #[error("auth/credits error {status}")]
    Auth { status: u16 },

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// How the retry layer should treat a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Abort immediately - further attempts cannot succeed (auth, no token)
    Fatal,
    /// Fixed long delay, then retry
    RateLimited,
    /// Transport/server error - standard backoff schedule
    Transport,
    /// Response arrived but could not be interpreted - shorter backoff cap
    Unexpected,
}

impl LlmError {
    pub fn retry_class(&self) -> RetryClass {
        match self {
            LlmError::MissingToken | LlmError::Auth { .. } => RetryClass::Fatal,
            LlmError::RateLimited => RetryClass::RateLimited,
            LlmError::Api { .. } | LlmError::Network(_) => RetryClass::Transport,
            LlmError::InvalidResponse(_) => RetryClass::Unexpected,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.retry_class() == RetryClass::Fatal
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited)
    }
}

/// Scripted client for tests.
///
/// Results are popped in call order; an exhausted script falls back to a
/// deterministic placeholder completion. Optional per-call delays simulate
/// uneven completion latency for fan-out ordering tests.
pub struct MockClient {
    completions: Mutex<VecDeque<Result<String, LlmError>>>,
    chats: Mutex<VecDeque<Result<String, LlmError>>>,
    completion_delays: Vec<Duration>,
    completion_calls: AtomicUsize,
    chat_calls: AtomicUsize,
    ready: bool,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            completions: Mutex::new(VecDeque::new()),
            chats: Mutex::new(VecDeque::new()),
            completion_delays: Vec::new(),
            completion_calls: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
            ready: true,
        }
    }

    /// Script the results returned by `complete`, in order
    pub fn with_completions(self, results: Vec<Result<String, LlmError>>) -> Self {
        *self.completions.lock().unwrap() = results.into();
        self
    }

    /// Script the results returned by `chat`, in order
    pub fn with_chats(self, results: Vec<Result<String, LlmError>>) -> Self {
        *self.chats.lock().unwrap() = results.into();
        self
    }

    /// Delay the i-th `complete` call by `delays[i]` before returning
    pub fn with_completion_delays(mut self, delays: Vec<Duration>) -> Self {
        self.completion_delays = delays;
        self
    }

    /// Simulate a client with no credential configured
    pub fn not_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    pub fn completion_calls(&self) -> usize {
        self.completion_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionClient for MockClient {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmError> {
        let index = self.completion_calls.fetch_add(1, Ordering::SeqCst);
        // Pop before sleeping so script order matches dispatch order even
        // when later calls finish first.
        let result = self
            .completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!(" mock completion {}", index + 1)));

        if let Some(delay) = self.completion_delays.get(index) {
            tokio::time::sleep(*delay).await;
        }

        result
    }

    async fn chat(&self, _request: ChatRequest) -> Result<String, LlmError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.chats
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("1".to_string()))
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}
