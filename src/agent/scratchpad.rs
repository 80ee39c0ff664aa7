//! The agent's scratchpad: the transcript fed back to the model.
//!
//! The transcript is a sequence of typed records. Every Monitor record opens
//! a new round, and shrinking keeps the most recent rounds so the prompt
//! stays within the model's context window.

use std::fmt::Write;

/// One record in the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEntry {
    /// An observation, labelled by where it came from.
    Monitor { source: String, text: String },
    /// The model's analysis, plan and chosen action, as it wrote them.
    Step {
        analysis: String,
        plan: String,
        execute: String,
    },
}

impl TranscriptEntry {
    /// Create a Monitor record.
    pub fn monitor(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Monitor {
            source: source.into(),
            text: text.into(),
        }
    }

    /// Create a Step record.
    pub fn step(
        analysis: impl Into<String>,
        plan: impl Into<String>,
        execute: impl Into<String>,
    ) -> Self {
        Self::Step {
            analysis: analysis.into(),
            plan: plan.into(),
            execute: execute.into(),
        }
    }

    /// Whether this record starts a new round.
    pub fn is_round_boundary(&self) -> bool {
        matches!(self, Self::Monitor { .. })
    }

    fn render_into(&self, out: &mut String) {
        // Writing to a String cannot fail.
        let _ = match self {
            Self::Monitor { source, text } => writeln!(out, "M: {source}: {text}"),
            Self::Step {
                analysis,
                plan,
                execute,
            } => write!(out, "{analysis}\n{plan}\n{execute}\n\n"),
        };
    }
}

/// Append-only transcript of rounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scratchpad {
    entries: Vec<TranscriptEntry>,
}

impl Scratchpad {
    /// Create an empty scratchpad.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    /// All records in insertion order.
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of rounds in the transcript.
    pub fn round_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_round_boundary()).count()
    }

    /// Keep only the last `rounds` rounds.
    ///
    /// Walks backward from the end and stops right after the `rounds`-th
    /// boundary, so the result starts with a Monitor record whenever any
    /// round is kept. With `rounds == 0` only trailing non-boundary records
    /// survive.
    pub fn shrink(&self, rounds: usize) -> Scratchpad {
        let mut start = self.entries.len();
        let mut seen = 0;

        for (index, entry) in self.entries.iter().enumerate().rev() {
            if entry.is_round_boundary() {
                if seen == rounds {
                    break;
                }
                seen += 1;
            }
            start = index;
            if seen == rounds && entry.is_round_boundary() {
                break;
            }
        }

        Scratchpad {
            entries: self.entries[start..].to_vec(),
        }
    }

    /// Render the transcript as prompt text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            entry.render_into(&mut out);
        }
        out
    }
}
