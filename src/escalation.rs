//! Escalation to a human operator.
//!
//! The `ask` action hands a question to whoever is supervising the agent
//! and blocks until they answer.

use async_trait::async_trait;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::error::EscalationError;

/// Somewhere the agent can send a question and get a free-text answer.
#[async_trait]
pub trait Escalation: Send + Sync {
    /// Ask `question` and wait for the reply.
    async fn ask(&self, question: &str) -> Result<String, EscalationError>;
}

/// Asks on the controlling terminal.
#[derive(Debug, Default)]
pub struct ConsoleEscalation;

impl ConsoleEscalation {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Escalation for ConsoleEscalation {
    async fn ask(&self, question: &str) -> Result<String, EscalationError> {
        let question = question.to_string();

        tokio::task::spawn_blocking(move || {
            let mut editor =
                DefaultEditor::new().map_err(|e| EscalationError::Channel(e.to_string()))?;

            println!("\n[agent asks] {}", question);
            match editor.readline("reply> ") {
                Ok(line) => Ok(line.trim().to_string()),
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    Err(EscalationError::NoReply(question))
                }
                Err(e) => Err(EscalationError::Channel(e.to_string())),
            }
        })
        .await
        .map_err(|e| EscalationError::Channel(format!("console task failed: {}", e)))?
    }
}
