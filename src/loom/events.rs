//! Push-stream event catalog and emitter.
//!
//! Every loop transition is serialized into one typed event and flushed in
//! the exact order produced - no batching, no coalescing. The `type` values
//! on the wire are stable; the presentation layer keys off them.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{LoomError, Result};

/// One push-stream event, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoomEvent {
    /// Seed document at session start
    Init { text: String },

    /// A round begins
    IterationStart { iteration: u64 },

    /// Candidate slot dispatched
    CompletionStart { index: usize },

    /// Candidate slot resolved (success or failure marker)
    CompletionDone { index: usize, text: String },

    /// Judge invoked
    GradingStart,

    /// Winner selected
    GradingDone { chosen_index: usize, chosen_text: String },

    /// Document after append
    TextUpdated { full_text: String },

    /// Milestone title (round 3 only, best-effort)
    DocumentNamed { name: String },

    /// Fatal condition, stream ends
    Error { message: String },
}

impl LoomEvent {
    /// Render as a server-sent-events frame
    pub fn to_sse(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(format!("data: {}\n\n", json))
    }
}

/// Create a bounded event channel with its emitter end
pub fn event_channel(capacity: usize) -> (EventEmitter, mpsc::Receiver<LoomEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventEmitter { tx }, rx)
}

/// Ordered push-stream emitter.
///
/// Wraps the sending half of the session's channel. A closed channel means
/// the consumer is gone; `emit` surfaces that as [`LoomError::StreamClosed`]
/// so the loop terminates instead of computing unseen rounds.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: mpsc::Sender<LoomEvent>,
}

impl EventEmitter {
    /// Emit one event, in order, awaiting channel capacity
    pub async fn emit(&self, event: LoomEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| LoomError::StreamClosed)
    }

    /// Whether the consumer has disconnected.
    ///
    /// Checked at phase boundaries so a dead consumer stops the loop even
    /// between emits.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
