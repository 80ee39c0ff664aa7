//! Terminal interaction.
//!
//! - Screen snapshots and their comparison
//! - Heuristic prompt and question detection
//! - Waiting for output to settle before reading
//! - A dedicated worker thread that owns the backend session
//! - Backends: tmux, and a scripted one for tests

mod backend;
pub mod classifier;
mod scripted;
mod snapshot;
mod stabilizer;
mod tmux;
mod worker;

pub use backend::TerminalBackend;
pub use classifier::{PromptKind, classify};
pub use scripted::ScriptedBackend;
pub use snapshot::Snapshot;
pub use stabilizer::{ReadOutcome, Stabilizer, lines_since_last_prompt};
pub use tmux::{TmuxBackend, tmux_available};
pub use worker::{TerminalHandle, TerminalMessage, format_read_output};

/// Reported instead of screen output once the session has gone away.
pub const SESSION_ENDED: &str = "E: exit";
