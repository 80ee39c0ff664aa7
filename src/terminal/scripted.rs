//! In-memory terminal backend that replays scripted screens.
//!
//! Used by tests and for offline replays of recorded sessions. Each capture
//! returns the next queued frame; the last frame repeats forever so the
//! screen looks stable once the script runs out.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::TerminalError;
use crate::terminal::{Snapshot, TerminalBackend};

/// A backend that plays back a fixed sequence of screens.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    frames: VecDeque<Snapshot>,
    last: Option<Snapshot>,
    responses: HashMap<String, Vec<Snapshot>>,
    sent: Arc<Mutex<Vec<String>>>,
    captures: Arc<Mutex<usize>>,
    end_when_exhausted: bool,
    refuse_open: bool,
}

impl ScriptedBackend {
    /// Create a backend that shows `frames` in order.
    pub fn new(frames: impl IntoIterator<Item = Snapshot>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Create a backend whose screen never changes.
    pub fn idle(lines: &[&str]) -> Self {
        Self::new([Snapshot::from_lines(lines.iter().copied())])
    }

    /// Replace the queued frames with `frames` whenever `input` is typed.
    pub fn on_input(mut self, input: impl Into<String>, frames: Vec<Snapshot>) -> Self {
        self.responses.insert(input.into(), frames);
        self
    }

    /// Fail captures once the queued frames are used up, as if the session
    /// had been closed.
    pub fn ending_session(mut self) -> Self {
        self.end_when_exhausted = true;
        self
    }

    /// Fail to open, leaving the worker without a session.
    pub fn refusing_open(mut self) -> Self {
        self.refuse_open = true;
        self
    }

    /// Shared log of every text sent to the backend.
    pub fn sent_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.sent)
    }

    /// Shared counter of captures taken.
    pub fn capture_count(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.captures)
    }
}

#[async_trait]
impl TerminalBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn open(&mut self) -> Result<(), TerminalError> {
        if self.refuse_open {
            return Err(TerminalError::Unavailable);
        }
        Ok(())
    }

    async fn send_text(&mut self, text: &str) -> Result<(), TerminalError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(text.to_string());
        }
        let typed = text.trim_end_matches('\n');
        if let Some(frames) = self.responses.get(typed) {
            self.frames = frames.iter().cloned().collect();
        }
        Ok(())
    }

    async fn capture(&mut self) -> Result<Snapshot, TerminalError> {
        if let Ok(mut count) = self.captures.lock() {
            *count += 1;
        }
        match self.frames.pop_front() {
            Some(frame) => {
                self.last = Some(frame.clone());
                Ok(frame)
            }
            None if self.end_when_exhausted => Err(TerminalError::SessionLost(
                "scripted session ended".to_string(),
            )),
            None => Ok(self.last.clone().unwrap_or_default()),
        }
    }

    async fn new_tab(&mut self) -> Result<(), TerminalError> {
        self.frames.clear();
        self.last = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_last_frame_repeats() {
        let mut backend = ScriptedBackend::new([
            Snapshot::from_lines(["building..."]),
            Snapshot::from_lines(["done", "ubuntu@host:~$"]),
        ]);

        assert_eq!(backend.capture().await.unwrap().line(0), Some("building..."));
        assert_eq!(backend.capture().await.unwrap().line(0), Some("done"));
        assert_eq!(backend.capture().await.unwrap().line(0), Some("done"));
        assert_eq!(*backend.capture_count().lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_input_switches_frames() {
        let mut backend = ScriptedBackend::idle(&["ubuntu@host:~$"]).on_input(
            "whoami",
            vec![Snapshot::from_lines(["ubuntu@host:~$ whoami", "ubuntu", "ubuntu@host:~$"])],
        );
        let sent = backend.sent_log();

        backend.send_text("whoami\n").await.unwrap();
        let snap = backend.capture().await.unwrap();

        assert_eq!(snap.line(1), Some("ubuntu"));
        assert_eq!(sent.lock().unwrap().as_slice(), ["whoami\n".to_string()]);
    }

    #[tokio::test]
    async fn test_ending_session_fails_capture() {
        let mut backend = ScriptedBackend::new([Snapshot::from_lines(["bye"])]).ending_session();
        assert!(backend.capture().await.is_ok());
        assert!(matches!(
            backend.capture().await,
            Err(TerminalError::SessionLost(_))
        ));
    }
}
