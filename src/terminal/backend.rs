//! Terminal backend trait.

use async_trait::async_trait;

use crate::error::TerminalError;
use crate::terminal::Snapshot;

/// A scriptable connection to a terminal session.
///
/// Backends are owned by the terminal worker thread and are only ever driven
/// one operation at a time, so implementations need no internal locking.
#[async_trait]
pub trait TerminalBackend: Send {
    /// Human-readable name for this backend (e.g., "tmux").
    fn name(&self) -> &str;

    /// Create or attach the window the agent will work in.
    async fn open(&mut self) -> Result<(), TerminalError>;

    /// Type text into the active session. No newline is appended.
    async fn send_text(&mut self, text: &str) -> Result<(), TerminalError>;

    /// Capture the currently visible screen.
    async fn capture(&mut self) -> Result<Snapshot, TerminalError>;

    /// Open a fresh tab and make it the active session.
    async fn new_tab(&mut self) -> Result<(), TerminalError>;

    /// Release backend resources. The default does nothing.
    async fn close(&mut self) -> Result<(), TerminalError> {
        Ok(())
    }
}
