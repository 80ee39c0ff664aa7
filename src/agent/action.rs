//! Actions the model may request.

use std::fmt;
use std::str::FromStr;

use crate::error::AgentError;

/// Every action the agent knows how to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Type a command into the terminal and read what it prints.
    TerminalRun,
    /// Read more of the terminal screen.
    TerminalRead,
    /// Ask the operator a question.
    Ask,
}

impl Action {
    /// All actions, in the order they are described to the model.
    pub const ALL: [Action; 3] = [Action::TerminalRun, Action::TerminalRead, Action::Ask];

    /// Name the model uses to request this action.
    pub fn name(self) -> &'static str {
        match self {
            Action::TerminalRun => "terminal_run",
            Action::TerminalRead => "terminal_read",
            Action::Ask => "ask",
        }
    }

    /// Label for the observation this action produces in the transcript.
    pub fn observation_label(self) -> &'static str {
        match self {
            Action::Ask => "ask reply",
            other => other.name(),
        }
    }

    /// One-line description for the prompt.
    pub fn description(self) -> &'static str {
        match self {
            Action::TerminalRun => {
                "type a command in the terminal and get back the last lines it printed. Usage: terminal_run[command]"
            }
            Action::TerminalRead => {
                "read the terminal output again, useful when you need more lines of the screen. Usage: terminal_read[lines]"
            }
            Action::Ask => {
                "ask your team members or boss when you have a question or need help, e.g. a password. Usage: ask[question]"
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.name() == s)
            .ok_or_else(|| AgentError::UnknownAction(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for action in Action::ALL {
            assert_eq!(action.name().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn test_unknown_action() {
        let err = "rm_rf".parse::<Action>().unwrap_err();
        assert!(matches!(err, AgentError::UnknownAction(ref name) if name == "rm_rf"));
    }

    #[test]
    fn test_observation_labels() {
        assert_eq!(Action::TerminalRun.observation_label(), "terminal_run");
        assert_eq!(Action::Ask.observation_label(), "ask reply");
    }
}
