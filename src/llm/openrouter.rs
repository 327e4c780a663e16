//! OpenRouter API client implementation
//!
//! This module implements the CompletionClient trait for the OpenRouter API,
//! covering both the raw completions endpoint (generation) and the chat
//! completions endpoint (judging/naming).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::{LoomError, Result};
use crate::llm::client::{CompletionClient, LlmError};
use crate::llm::types::{ChatRequest, CompletionRequest};

/// OpenRouter API base URL
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Request timeout per call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// OpenRouter API client
pub struct OpenRouterClient {
    client: Client,
    token: Option<String>,
    base_url: String,
}

impl OpenRouterClient {
    /// Create a new client.
    ///
    /// A missing token is a supported state: calls short-circuit with
    /// [`LlmError::MissingToken`] instead of going to the network.
    pub fn new(token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LoomError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token: token.filter(|t| !t.is_empty()),
            base_url: OPENROUTER_BASE_URL.to_string(),
        })
    }

    /// Override the base URL (for tests against a local server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Send a payload and classify the outcome
    async fn post(&self, path: &str, payload: &Value) -> std::result::Result<Value, LlmError> {
        let token = self.token.as_deref().ok_or(LlmError::MissingToken)?;

        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        match status {
            429 => Err(LlmError::RateLimited),
            401 | 402 | 403 => Err(LlmError::Auth { status }),
            s if !(200..300).contains(&s) => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(LlmError::Api { status: s, message })
            }
            _ => response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse(format!("malformed body: {}", e))),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    async fn complete(&self, request: CompletionRequest) -> std::result::Result<String, LlmError> {
        let body = self.post("/completions", &request.to_payload()).await?;

        body["choices"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].text".to_string()))
    }

    async fn chat(&self, request: ChatRequest) -> std::result::Result<String, LlmError> {
        let body = self.post("/chat/completions", &request.to_payload()).await?;

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                LlmError::InvalidResponse("missing choices[0].message.content".to_string())
            })
    }

    fn is_ready(&self) -> bool {
        self.token.is_some()
    }
}

impl std::fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("base_url", &self.base_url)
            .field("token_set", &self.token.is_some())
            .finish()
    }
}
