//! Judge - model-assisted candidate selection.
//!
//! Builds one ranking prompt enumerating the candidates 1..N, asks the
//! instruct model for a single number, and parses the first word-bounded
//! digit in range from the free-form reply. Failure handling is two-tiered:
//! unparsable replies are soft failures retried on the normal backoff
//! schedule, auth errors abort immediately, and exhausting all retries
//! resolves to a uniform random index. The judge never returns "no decision".

use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;

use crate::llm::{delay_for, ChatRequest, CompletionClient, RetryClass, RetryPolicy};

/// Word-bounded single digits, scanned left to right
fn digit_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b([1-9])\b").expect("valid digit pattern"))
}

/// Extract the first standalone digit in `[1, n]` from free-form text.
///
/// Digits outside the valid range (e.g. "I choose 7" with five candidates)
/// are skipped, not accepted.
pub fn parse_choice(text: &str, n: usize) -> Option<usize> {
    digit_pattern()
        .captures_iter(text)
        .filter_map(|c| c.get(1)?.as_str().parse::<usize>().ok())
        .find(|&digit| digit >= 1 && digit <= n)
}

/// Candidate selection with soft-retry and random fallback.
#[derive(Debug, Clone)]
pub struct Judge {
    /// Instruct model used for ranking
    pub model: String,
    pub policy: RetryPolicy,
}

impl Judge {
    pub fn new(model: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            model: model.into(),
            policy,
        }
    }

    /// Build the ranking prompt. The candidate count is stated explicitly
    /// rather than assuming five.
    pub fn build_prompt(&self, context: &str, candidates: &[String]) -> String {
        let n = candidates.len();

        let mut options = String::new();
        for (i, candidate) in candidates.iter().enumerate() {
            options.push_str(&format!("{}. {}\n\n", i + 1, candidate));
        }

        format!(
            "{}\n\n{}\n\nWhich of the following {} completions of the given text is more \
             interesting? Reply with only a single number from 1 to {}. You should pick \
             whichever completion is the most surprising, unusual, or interesting. You're \
             looking for the most *interesting* one.",
            context, options, n, n
        )
    }

    /// Pick a winning index in `[1, N]`.
    ///
    /// Guaranteed to resolve: exhausted retries (or a missing credential)
    /// fall back to a uniform random index.
    pub async fn choose<C>(&self, client: &C, context: &str, candidates: &[String]) -> usize
    where
        C: CompletionClient + ?Sized,
    {
        let n = candidates.len();
        debug_assert!(n >= 1, "judge requires at least one candidate");

        if !client.is_ready() {
            return random_choice(n);
        }

        let prompt = self.build_prompt(context, candidates);

        for attempt in 0..self.policy.max_retries {
            let delay = match client.chat(ChatRequest::user(&self.model, &prompt)).await {
                Ok(reply) => {
                    if let Some(choice) = parse_choice(&reply, n) {
                        return choice;
                    }
                    tracing::warn!(attempt, reply = %reply, "judge gave unparsable reply, retrying");
                    delay_for(RetryClass::Transport, attempt)
                }
                Err(err) => {
                    let class = err.retry_class();
                    if class == RetryClass::Fatal {
                        tracing::warn!(attempt, error = %err, "judge hit fatal error, stopping retries");
                        break;
                    }
                    tracing::warn!(attempt, error = %err, "judge call failed, backing off");
                    delay_for(class, attempt)
                }
            };

            if attempt + 1 < self.policy.max_retries {
                tokio::time::sleep(delay).await;
            }
        }

        let fallback = random_choice(n);
        tracing::warn!(
            max_retries = self.policy.max_retries,
            choice = fallback,
            "judge exhausted retries, using random choice"
        );
        fallback
    }
}

/// Uniform random index in `[1, n]`
fn random_choice(n: usize) -> usize {
    rand::rng().random_range(1..=n)
}
