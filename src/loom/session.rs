//! Loom session - the state machine tying the loop together.
//!
//! One session owns one growing document and runs forever: truncate,
//! generate N candidates, judge, append, emit events - then sleep a pacing
//! delay and go again. The only terminal states are the consumer
//! disconnecting and a grading invariant violation.

use std::sync::Arc;
use std::time::Duration;

use crate::context::truncate_to_budget;
use crate::error::{LoomError, Result};
use crate::llm::{CompletionClient, GenerationParams, RetryPolicy};
use crate::loom::candidates::generate_candidates;
use crate::loom::events::{EventEmitter, LoomEvent};
use crate::loom::judge::Judge;
use crate::loom::naming::generate_document_name;

/// Seed used when the client supplies no override
pub const DEFAULT_SEED_TEXT: &str = "Where are you? I swear I";

/// Round at which the one-time naming milestone fires
const NAMING_ROUND: u64 = 3;

/// Parameters fixed for the lifetime of one session.
#[derive(Debug, Clone)]
pub struct SessionParams {
    /// Seed override; falls back to [`DEFAULT_SEED_TEXT`]
    pub seed: Option<String>,
    /// Candidate slots per round
    pub candidate_count: usize,
    /// Generation model id
    pub base_model: String,
    /// Judging/naming model id
    pub grader_model: String,
    pub generation: GenerationParams,
    /// Context budget (tokens) for generation calls
    pub base_context_limit: usize,
    /// Context budget (tokens) for judging calls, independent of the above
    pub grader_context_limit: usize,
    /// Retry cap per resilient call
    pub max_retries: u32,
    /// Politeness delay between rounds
    pub pacing: Duration,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            seed: None,
            candidate_count: 5,
            base_model: "z-ai/glm-4.5-air:free".to_string(),
            grader_model: "z-ai/glm-4.5-air:free".to_string(),
            generation: GenerationParams::default(),
            base_context_limit: 8000,
            grader_context_limit: 4000,
            max_retries: 10,
            pacing: Duration::from_secs(1),
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoomOutcome {
    /// The stream consumer went away; no further events were attempted
    Disconnected,
    /// The judge produced an out-of-range index (invariant violation)
    GraderFailed,
}

/// A single loom session.
///
/// Owns the document for its lifetime; nothing else mutates it.
pub struct LoomSession<C: CompletionClient> {
    client: Arc<C>,
    params: SessionParams,
    emitter: EventEmitter,
}

impl<C: CompletionClient> LoomSession<C> {
    pub fn new(client: Arc<C>, params: SessionParams, emitter: EventEmitter) -> Self {
        Self {
            client,
            params,
            emitter,
        }
    }

    /// Run the loop until disconnect or grading failure.
    ///
    /// A disconnect is a normal ending, not an error.
    pub async fn run(self) -> Result<LoomOutcome> {
        match self.drive().await {
            Ok(outcome) => Ok(outcome),
            Err(LoomError::StreamClosed) => {
                log::info!("Consumer disconnected, stopping loom");
                Ok(LoomOutcome::Disconnected)
            }
            Err(e) => Err(e),
        }
    }

    async fn drive(&self) -> Result<LoomOutcome> {
        let n = self.params.candidate_count;
        let policy = RetryPolicy::new(self.params.max_retries);
        let judge = Judge::new(&self.params.grader_model, policy.clone());

        let mut full_text = self
            .params
            .seed
            .clone()
            .unwrap_or_else(|| DEFAULT_SEED_TEXT.to_string());

        self.emitter
            .emit(LoomEvent::Init {
                text: full_text.clone(),
            })
            .await?;

        let mut iteration: u64 = 1;
        loop {
            self.emitter
                .emit(LoomEvent::IterationStart { iteration })
                .await?;

            let base_context = truncate_to_budget(&full_text, self.params.base_context_limit);

            for index in 1..=n {
                self.emitter
                    .emit(LoomEvent::CompletionStart { index })
                    .await?;
            }

            let candidates = generate_candidates(
                self.client.as_ref(),
                base_context,
                &self.params.base_model,
                &self.params.generation,
                n,
                &policy,
            )
            .await;

            // Phase boundary: skip emitting a full round into a dead channel.
            if self.emitter.is_closed() {
                return Err(LoomError::StreamClosed);
            }

            for (i, text) in candidates.iter().enumerate() {
                self.emitter
                    .emit(LoomEvent::CompletionDone {
                        index: i + 1,
                        text: text.clone(),
                    })
                    .await?;
            }

            self.emitter.emit(LoomEvent::GradingStart).await?;

            let grader_context = truncate_to_budget(&full_text, self.params.grader_context_limit);
            let chosen_index = judge
                .choose(self.client.as_ref(), grader_context, &candidates)
                .await;

            if self.emitter.is_closed() {
                return Err(LoomError::StreamClosed);
            }

            // The judge guarantees an in-range index; this is the defensive
            // invariant-violation path and the loop's only fatal ending.
            if chosen_index < 1 || chosen_index > candidates.len() {
                log::error!("Grader returned index {} for {} candidates", chosen_index, n);
                self.emitter
                    .emit(LoomEvent::Error {
                        message: "Grader failed".to_string(),
                    })
                    .await?;
                return Ok(LoomOutcome::GraderFailed);
            }

            let chosen_text = candidates[chosen_index - 1].clone();
            self.emitter
                .emit(LoomEvent::GradingDone {
                    chosen_index,
                    chosen_text: chosen_text.clone(),
                })
                .await?;

            // The document's only mutation point.
            full_text.push_str(&chosen_text);
            self.emitter
                .emit(LoomEvent::TextUpdated {
                    full_text: full_text.clone(),
                })
                .await?;

            if iteration == NAMING_ROUND {
                match generate_document_name(
                    self.client.as_ref(),
                    &self.params.grader_model,
                    &full_text,
                    self.params.grader_context_limit,
                )
                .await
                {
                    Ok(name) => self.emitter.emit(LoomEvent::DocumentNamed { name }).await?,
                    Err(e) => log::warn!("Failed to generate document name: {}", e),
                }
            }

            tokio::time::sleep(self.params.pacing).await;
            iteration += 1;
        }
    }
}
