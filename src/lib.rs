//! Selfloom - a self-continuing text generation loom
//!
//! Selfloom drives an unattended generation loop: each round it fans out
//! several candidate continuations of a growing document, asks a judging
//! model to pick the most interesting one, appends the winner, and pushes
//! every state transition to a live consumer as an ordered event stream.

pub mod config;
pub mod context;
pub mod error;
pub mod llm;
pub mod loom;
pub mod store;

pub use error::{LoomError, Result};
