//! Parsing the model's Analysis / Plan / Execute reply.
//!
//! The model answers in a line-oriented format:
//!
//! ```text
//! A: Vim is not installed on this system.
//! P: install Vim -> verify installation -> end
//! E: terminal_run[sudo apt-get install vim]
//! ```
//!
//! `M:` lines are the model echoing an observation back and are ignored.

use crate::error::AgentError;

/// One parsed model reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedStep {
    /// The `A:` line, prefix included.
    pub analysis: String,
    /// The `P:` line, prefix included.
    pub plan: String,
    /// The `E:` line, prefix included.
    pub execute: String,
    /// Action to dispatch. Empty when done.
    pub action_name: String,
    /// Argument for the action. Empty when done.
    pub action_input: String,
    /// Whether the model considers the goal reached.
    pub is_done: bool,
}

/// Parse a raw model reply.
pub fn parse_response(raw: &str) -> Result<ParsedStep, AgentError> {
    let mut analysis = String::new();
    let mut plan = String::new();
    let mut execute = String::new();

    for line in raw.lines() {
        if line.starts_with("M:") {
            continue;
        } else if line.starts_with("A:") {
            analysis = line.trim().to_string();
        } else if line.starts_with("P:") {
            plan = line.trim().to_string();
        } else if line.starts_with("E:") {
            execute = line.trim().to_string();
        }
    }

    let action_body = execute.strip_prefix("E:").unwrap_or_default();
    let action_token = action_body.split('[').next().unwrap_or_default().trim();
    let plan_text = plan.strip_prefix("P:").unwrap_or_default().trim();

    let no_next_step = plan.is_empty() && execute.is_empty();
    if no_next_step {
        tracing::warn!("Model reply has neither plan nor action, treating the task as done");
    }
    let is_done = matches!(action_token, "end" | "exit") || plan_text == "end" || no_next_step;

    if is_done {
        return Ok(ParsedStep {
            analysis,
            plan,
            execute,
            is_done: true,
            ..ParsedStep::default()
        });
    }

    if execute.is_empty() {
        return Err(AgentError::MalformedResponse {
            raw: raw.to_string(),
        });
    }

    let (action_name, action_input) = match action_body.find('[') {
        Some(open) => {
            let rest = &action_body[open + 1..];
            let input = match rest.rfind(']') {
                Some(close) => &rest[..close],
                None => rest,
            };
            (action_body[..open].trim().to_string(), input.to_string())
        }
        None => (action_body.trim().to_string(), String::new()),
    };

    Ok(ParsedStep {
        analysis,
        plan,
        execute,
        action_name,
        action_input,
        is_done: false,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_action() {
        let step = parse_response("A: x\nP: y\nE: run[cmd arg]").unwrap();
        assert_eq!(
            step,
            ParsedStep {
                analysis: "A: x".to_string(),
                plan: "P: y".to_string(),
                execute: "E: run[cmd arg]".to_string(),
                action_name: "run".to_string(),
                action_input: "cmd arg".to_string(),
                is_done: false,
            }
        );
    }

    #[test]
    fn test_parse_end() {
        let step = parse_response("A: x\nP: end\nE: end").unwrap();
        assert!(step.is_done);
        assert!(step.action_name.is_empty());
        assert!(step.action_input.is_empty());
        assert_eq!(step.analysis, "A: x");
    }

    #[test]
    fn test_parse_exit_action() {
        let step = parse_response("A: nothing left\nP: wrap up\nE: exit").unwrap();
        assert!(step.is_done);
    }

    #[test]
    fn test_plan_end_wins_over_action() {
        let step = parse_response("A: done\nP: end\nE: terminal_run[ls]").unwrap();
        assert!(step.is_done);
        assert!(step.action_name.is_empty());
    }

    #[test]
    fn test_empty_reply_is_done() {
        assert!(parse_response("").unwrap().is_done);
        assert!(parse_response("A: I think we are fine").unwrap().is_done);
    }

    #[test]
    fn test_missing_action_is_malformed() {
        let err = parse_response("A: x\nP: install vim").unwrap_err();
        assert!(matches!(err, AgentError::MalformedResponse { .. }));
    }

    #[test]
    fn test_nested_brackets_are_kept() {
        let step = parse_response("P: test\nE: terminal_run[echo [a] [b]]").unwrap();
        assert_eq!(step.action_name, "terminal_run");
        assert_eq!(step.action_input, "echo [a] [b]");
    }

    #[test]
    fn test_action_without_argument() {
        let step = parse_response("P: look\nE: terminal_read").unwrap();
        assert_eq!(step.action_name, "terminal_read");
        assert_eq!(step.action_input, "");
    }

    #[test]
    fn test_monitor_lines_ignored_and_last_wins() {
        let raw = "M: terminal_run: E: end\nA: first\nA: second\nP: check\nE: ask[hi]  ";
        let step = parse_response(raw).unwrap();
        assert_eq!(step.analysis, "A: second");
        assert_eq!(step.action_name, "ask");
        assert_eq!(step.action_input, "hi");
        assert!(!step.is_done);
    }
}
