//! Waiting for terminal output to settle.
//!
//! The terminal never says "the command finished". The stabilizer polls the
//! screen until two consecutive captures match and the bottom line is an
//! idle prompt or a question, then returns everything printed since the
//! previous command.

use std::time::Duration;

use crate::terminal::classifier::{classify, normalize_whitespace};
use crate::terminal::{Snapshot, TerminalBackend};

/// Result of one stabilization wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The screen stopped changing at a prompt or question.
    Settled(Vec<String>),
    /// The poll ceiling was reached first; best-effort lines.
    Unsettled(Vec<String>),
    /// The backend failed while reading; the session is gone.
    Ended,
    /// There is no session to read from.
    Unavailable,
}

/// Polls a backend until its output settles at an actionable boundary.
#[derive(Debug, Clone)]
pub struct Stabilizer {
    settle_delay: Duration,
    retry_delay: Duration,
    max_polls: Option<u32>,
}

impl Stabilizer {
    /// Create a stabilizer. `max_polls` of `None` waits indefinitely.
    pub fn new(settle_delay: Duration, retry_delay: Duration, max_polls: Option<u32>) -> Self {
        Self {
            settle_delay,
            retry_delay,
            max_polls,
        }
    }

    /// Block until the screen is stable and waiting on input.
    pub async fn wait_and_read<B>(&self, backend: &mut B) -> ReadOutcome
    where
        B: TerminalBackend + ?Sized,
    {
        let mut baseline = match backend.capture().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::debug!("Capture failed, treating session as ended: {}", e);
                return ReadOutcome::Ended;
            }
        };
        tokio::time::sleep(self.settle_delay).await;

        let mut polls: u32 = 0;
        loop {
            let current = match backend.capture().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::debug!("Capture failed, treating session as ended: {}", e);
                    return ReadOutcome::Ended;
                }
            };
            polls += 1;

            let lines = lines_since_last_prompt(&current);

            if !baseline.same_as(&current) {
                tracing::trace!("Screen still changing, waiting {:?}", self.retry_delay);
            } else if lines.last().is_some_and(|line| classify(line).is_actionable()) {
                return ReadOutcome::Settled(lines);
            } else {
                tracing::trace!(
                    "Screen stable but last line {:?} is not a prompt, waiting {:?}",
                    lines.last(),
                    self.retry_delay
                );
            }

            if self.max_polls.is_some_and(|max| polls >= max) {
                tracing::warn!("Screen did not settle after {} polls", polls);
                return ReadOutcome::Unsettled(lines);
            }

            tokio::time::sleep(self.retry_delay).await;
            baseline = current;
        }
    }
}

/// Collect the non-blank lines printed since the last completed command.
///
/// Scans upward from the bottom of the screen and stops before the second
/// shell prompt, which belongs to the previous command. Lines are returned
/// top to bottom.
pub fn lines_since_last_prompt(snapshot: &Snapshot) -> Vec<String> {
    let mut collected = Vec::new();
    let mut prompts = 0;

    for line in snapshot.lines().iter().rev() {
        if normalize_whitespace(line).is_empty() {
            continue;
        }
        if classify(line).is_prompt() {
            prompts += 1;
            if prompts == 2 {
                break;
            }
        }
        collected.push(line.clone());
    }

    collected.reverse();
    collected
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::terminal::ScriptedBackend;

    fn fast(max_polls: Option<u32>) -> Stabilizer {
        Stabilizer::new(Duration::ZERO, Duration::ZERO, max_polls)
    }

    #[test]
    fn test_lines_since_last_prompt() {
        let snap = Snapshot::from_lines([
            "ubuntu@host:~$ ls",
            "old.txt",
            "ubuntu@host:~$ vim --version",
            "vim: command not found",
            "",
            "ubuntu@host:~$",
            "   ",
        ]);

        assert_eq!(
            lines_since_last_prompt(&snap),
            vec!["vim: command not found", "ubuntu@host:~$"]
        );
    }

    #[test]
    fn test_lines_reach_top_without_prompts() {
        let snap = Snapshot::from_lines(["Welcome", "", "[sudo] password for ubuntu:"]);
        assert_eq!(
            lines_since_last_prompt(&snap),
            vec!["Welcome", "[sudo] password for ubuntu:"]
        );
    }

    #[tokio::test]
    async fn test_settles_on_idle_prompt() {
        let mut backend = ScriptedBackend::idle(&["ubuntu@host:~$"]);
        let outcome = fast(None).wait_and_read(&mut backend).await;
        assert_eq!(outcome, ReadOutcome::Settled(vec!["ubuntu@host:~$".to_string()]));
    }

    #[tokio::test]
    async fn test_waits_while_screen_changes() {
        let mut backend = ScriptedBackend::new([
            Snapshot::from_lines(["ubuntu@host:~$ make", "compiling a"]),
            Snapshot::from_lines(["ubuntu@host:~$ make", "compiling a", "compiling b"]),
            Snapshot::from_lines(["ubuntu@host:~$ make", "compiling a", "compiling b", "ubuntu@host:~$"]),
        ]);
        let captures = backend.capture_count();

        let outcome = fast(None).wait_and_read(&mut backend).await;

        assert_eq!(
            outcome,
            ReadOutcome::Settled(vec![
                "compiling a".to_string(),
                "compiling b".to_string(),
                "ubuntu@host:~$".to_string(),
            ])
        );
        // Three changing frames plus one confirming capture.
        assert_eq!(*captures.lock().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_static_banner_is_not_settled() {
        let mut backend = ScriptedBackend::idle(&["Installing packages..."]);
        let outcome = fast(Some(3)).wait_and_read(&mut backend).await;
        assert_eq!(
            outcome,
            ReadOutcome::Unsettled(vec!["Installing packages...".to_string()])
        );
    }

    #[tokio::test]
    async fn test_question_settles() {
        let mut backend = ScriptedBackend::idle(&[
            "ubuntu@host:~$ sudo apt-get install vim",
            "[sudo] password for ubuntu:",
        ]);
        let outcome = fast(Some(5)).wait_and_read(&mut backend).await;
        assert!(matches!(outcome, ReadOutcome::Settled(lines) if lines.len() == 2));
    }

    #[tokio::test]
    async fn test_capture_failure_ends_session() {
        let mut backend = ScriptedBackend::new([Snapshot::from_lines(["ubuntu@host:~$"])])
            .ending_session();
        let outcome = fast(None).wait_and_read(&mut backend).await;
        assert_eq!(outcome, ReadOutcome::Ended);
    }
}
