//! Screen snapshots.
//!
//! A [`Snapshot`] is the set of text lines visible in a terminal at one poll.
//! Snapshots are never mutated; every poll produces a new one.

use std::fmt;

/// A frozen capture of the visible terminal screen.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    lines: Vec<String>,
}

impl Snapshot {
    /// Create a snapshot from individual screen lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a snapshot from newline-separated screen text.
    pub fn from_text(text: &str) -> Self {
        Self::from_lines(text.lines())
    }

    /// Number of lines on the screen.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Text of the line at `index`, if present.
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// All lines, top to bottom.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns `true` if both snapshots show exactly the same text.
    ///
    /// Lines are compared verbatim; whitespace is significant here.
    pub fn same_as(&self, other: &Snapshot) -> bool {
        if self.line_count() != other.line_count() {
            return false;
        }
        self.lines.iter().zip(&other.lines).all(|(a, b)| a == b)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}
