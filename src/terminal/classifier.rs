//! Heuristic classification of terminal lines.
//!
//! A terminal gives no structured signal that a command finished or that a
//! program is waiting for input. The only evidence is what the screen shows,
//! so lines are matched against the conventional shapes of shell prompts and
//! interactive questions:
//!
//! ```text
//! ubuntu@host:~$                     -> ShellPromptEmpty
//! ubuntu@host:~$ apt-get install vim -> ShellPrompt
//! Do you want to continue? [Y/n]     -> Question
//! [sudo] password for ubuntu:        -> Question
//! Reading package lists... Done      -> Plain
//! ```

use std::sync::LazyLock;

use regex::Regex;

/// `<user>@<host>` followed by a `$` (bash) or `%` (zsh) terminator.
static SHELL_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@]*@[^$%@]*[$%]").expect("valid prompt regex"));

/// Same as [`SHELL_PROMPT`] with nothing typed after the terminator.
static SHELL_PROMPT_EMPTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@]*@[^$%@]*[$%]$").expect("valid prompt regex"));

static QUESTIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // apt-get and friends
        r"(?i)(\[y/n\]|\(y/n\))[?:]?$",
        // ssh host key confirmation
        r"(?i)\(yes/no(/\[fingerprint\])?\)[?:]?$",
        r"^Password:",
        r"(?i)^\[?sudo\]? password for \S+:",
        // ssh login, su, and similar
        r"(?i) password:$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid question regex"))
    .collect()
});

/// What a single line of terminal output looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// A shell prompt followed by echoed command text.
    ShellPrompt,
    /// An idle shell prompt waiting for the next command.
    ShellPromptEmpty,
    /// A program asking for confirmation or a password.
    Question,
    /// Anything else.
    Plain,
}

impl PromptKind {
    /// Whether the line is a shell prompt, idle or not.
    ///
    /// Prompts mark the boundaries between command outputs.
    pub fn is_prompt(self) -> bool {
        matches!(self, PromptKind::ShellPrompt | PromptKind::ShellPromptEmpty)
    }

    /// Whether the terminal is waiting on us when this is the last line.
    pub fn is_actionable(self) -> bool {
        matches!(self, PromptKind::ShellPromptEmpty | PromptKind::Question)
    }
}

/// Trim a line and collapse internal runs of whitespace to a single space.
pub fn normalize_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Classify one line of terminal output.
pub fn classify(line: &str) -> PromptKind {
    let line = normalize_whitespace(line);

    if SHELL_PROMPT_EMPTY.is_match(&line) {
        PromptKind::ShellPromptEmpty
    } else if QUESTIONS.iter().any(|re| re.is_match(&line)) {
        PromptKind::Question
    } else if SHELL_PROMPT.is_match(&line) {
        PromptKind::ShellPrompt
    } else {
        PromptKind::Plain
    }
}
