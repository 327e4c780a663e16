//! Retry/backoff policy for resilient LLM calls.
//!
//! Every generation call resolves to a string: either the completion text or
//! a distinguishable failure marker. No error escapes to the caller - a
//! failed candidate is simply a weaker, clearly-marked option downstream.
//!
//! Backoff schedule (attempt index from 0):
//! - 0: 0.1s, 1: 0.2s, 2: 0.5s, then min(60, 2^(a-1))s - each plus jitter
//! - rate limit (429): fixed 65s regardless of attempt
//! - auth/payment/forbidden: abort immediately
//! - malformed-but-received responses use a shorter cap (10s), kept
//!   asymmetric with the transport schedule on purpose

use std::time::Duration;

use rand::Rng;

use crate::llm::client::{CompletionClient, RetryClass};
use crate::llm::types::CompletionRequest;

/// Marker returned when no credential is configured (no network attempt)
pub const NO_TOKEN_MARKER: &str = " [No API token configured]";

/// Prefix of the marker returned after retries are exhausted
pub const COMPLETION_FAILED_PREFIX: &str = " [Completion failed after";

/// Retry policy for a single resilient call
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts per call
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 10 }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// The terminal failure marker for this policy.
    ///
    /// Distinguishable from any successful completion, including an empty
    /// one, so downstream logic never mistakes it for real content.
    pub fn exhausted_marker(&self) -> String {
        format!("{} {} attempts]", COMPLETION_FAILED_PREFIX, self.max_retries)
    }
}

/// Uniform jitter added to backoff delays
fn jitter() -> Duration {
    Duration::from_secs_f64(rand::rng().random_range(0.0..0.2))
}

/// Backoff delay for transport/server errors at the given attempt
pub fn backoff_delay(attempt: u32) -> Duration {
    let base = match attempt {
        0 => Duration::from_millis(100),
        1 => Duration::from_millis(200),
        2 => Duration::from_millis(500),
        a => Duration::from_secs(60.min(2u64.saturating_pow(a - 1))),
    };
    base + jitter()
}

/// Fixed delay applied on a rate-limit response, regardless of attempt
pub fn rate_limit_delay() -> Duration {
    Duration::from_secs(65)
}

/// Backoff for errors where a response arrived but could not be
/// interpreted. Caps at 10s instead of 60s; the asymmetry with
/// [`backoff_delay`] is deliberate.
pub fn unexpected_backoff_delay(attempt: u32) -> Duration {
    match attempt {
        0 => Duration::from_millis(100),
        1 => Duration::from_millis(200),
        a => Duration::from_secs(10.min(2u64.saturating_pow(a))) + jitter(),
    }
}

/// Delay for a retryable failure class at the given attempt
pub fn delay_for(class: RetryClass, attempt: u32) -> Duration {
    match class {
        RetryClass::RateLimited => rate_limit_delay(),
        RetryClass::Unexpected => unexpected_backoff_delay(attempt),
        // Fatal never sleeps; callers abort before asking for a delay.
        RetryClass::Fatal | RetryClass::Transport => backoff_delay(attempt),
    }
}

/// Perform one resilient generation call.
///
/// Returns the completion text on success, [`NO_TOKEN_MARKER`] when no
/// credential is configured, or the policy's exhausted marker after all
/// retries fail. Fatal (auth/payment) errors stop retrying immediately.
pub async fn complete_with_retry<C>(client: &C, request: CompletionRequest, policy: &RetryPolicy) -> String
where
    C: CompletionClient + ?Sized,
{
    if !client.is_ready() {
        return NO_TOKEN_MARKER.to_string();
    }

    for attempt in 0..policy.max_retries {
        match client.complete(request.clone()).await {
            Ok(text) => return text,
            Err(err) => {
                let class = err.retry_class();
                if class == RetryClass::Fatal {
                    tracing::warn!(attempt, error = %err, "fatal error, stopping retries");
                    break;
                }

                let delay = delay_for(class, attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "generation call failed, backing off"
                );

                if attempt + 1 < policy.max_retries {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    policy.exhausted_marker()
}
