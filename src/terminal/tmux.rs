//! tmux terminal backend.
//!
//! The agent works in a window of a tmux session, so an operator can watch or
//! take over with `tmux attach-session -t <session>`. Text goes in through
//! `tmux send-keys` and the screen comes back through `tmux capture-pane`.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::TerminalError;
use crate::terminal::{Snapshot, TerminalBackend};

const PANE_WIDTH: &str = "200";
const PANE_HEIGHT: &str = "50";

/// Check whether tmux is available on the system.
pub async fn tmux_available() -> bool {
    Command::new("tmux")
        .arg("-V")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

/// A window in a tmux session.
#[derive(Debug)]
pub struct TmuxBackend {
    session_name: String,
    /// Window id (e.g. `@3`) of the active window, once opened.
    target: Option<String>,
}

impl TmuxBackend {
    /// Create a backend for the named session. Nothing is started until
    /// [`TerminalBackend::open`].
    pub fn new(session_name: impl Into<String>) -> Self {
        Self {
            session_name: session_name.into(),
            target: None,
        }
    }

    /// The tmux session name.
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    fn target(&self) -> Result<&str, TerminalError> {
        self.target.as_deref().ok_or(TerminalError::Unavailable)
    }

    async fn tmux(args: &[&str]) -> Result<String, TerminalError> {
        let output = Command::new("tmux")
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(TerminalError::CommandFailed(format!(
                "tmux {} exited with {}: {}",
                args.first().copied().unwrap_or_default(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn session_exists(&self) -> bool {
        Self::tmux(&["has-session", "-t", &self.session_name])
            .await
            .is_ok()
    }

    /// Open a window, creating the session on first use.
    async fn create_window(&mut self) -> Result<(), TerminalError> {
        let window_id = if self.session_exists().await {
            Self::tmux(&[
                "new-window",
                "-P",
                "-F",
                "#{window_id}",
                "-t",
                &self.session_name,
            ])
            .await?
        } else {
            Self::tmux(&[
                "new-session",
                "-d",
                "-P",
                "-F",
                "#{window_id}",
                "-s",
                &self.session_name,
                "-x",
                PANE_WIDTH,
                "-y",
                PANE_HEIGHT,
            ])
            .await?
        };

        let window_id = window_id.trim().to_string();
        if window_id.is_empty() {
            return Err(TerminalError::CommandFailed(
                "tmux did not report a window id".to_string(),
            ));
        }
        tracing::debug!("Using tmux window {} in session {}", window_id, self.session_name);
        self.target = Some(window_id);
        Ok(())
    }
}

#[async_trait]
impl TerminalBackend for TmuxBackend {
    fn name(&self) -> &str {
        "tmux"
    }

    async fn open(&mut self) -> Result<(), TerminalError> {
        if !tmux_available().await {
            return Err(TerminalError::CommandFailed(
                "tmux is not installed".to_string(),
            ));
        }
        self.create_window().await
    }

    async fn send_text(&mut self, text: &str) -> Result<(), TerminalError> {
        let target = self.target()?.to_string();

        // `-l` sends the text literally; newlines become Enter presses.
        let mut segments = text.split('\n').peekable();
        while let Some(segment) = segments.next() {
            if !segment.is_empty() {
                Self::tmux(&["send-keys", "-t", &target, "-l", segment]).await?;
            }
            if segments.peek().is_some() {
                Self::tmux(&["send-keys", "-t", &target, "Enter"]).await?;
            }
        }
        Ok(())
    }

    async fn capture(&mut self) -> Result<Snapshot, TerminalError> {
        let target = self.target()?.to_string();
        let screen = Self::tmux(&["capture-pane", "-p", "-t", &target])
            .await
            .map_err(|e| TerminalError::SessionLost(e.to_string()))?;
        Ok(Snapshot::from_text(&screen))
    }

    async fn new_tab(&mut self) -> Result<(), TerminalError> {
        self.create_window().await
    }
}
