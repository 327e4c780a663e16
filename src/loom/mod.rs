//! Loom core - the self-continuing generation loop
//!
//! This module provides:
//! - The typed push-stream event catalog and emitter
//! - Concurrent candidate fan-out with positional ordering
//! - The judge (candidate selection with soft-retry and random fallback)
//! - Milestone document naming
//! - The session state machine driving it all

pub mod candidates;
pub mod events;
pub mod judge;
pub mod naming;
pub mod session;

pub use candidates::generate_candidates;
pub use events::{event_channel, EventEmitter, LoomEvent};
pub use judge::Judge;
pub use naming::{generate_document_name, sanitize_name};
pub use session::{LoomOutcome, LoomSession, SessionParams, DEFAULT_SEED_TEXT};
