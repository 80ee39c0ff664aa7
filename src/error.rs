//! Error types for cmdpilot.

use std::time::Duration;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },

    #[error("Failed to read env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
}

/// Language model errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Request to {provider} failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Authentication failed for {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by {provider}, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Terminal backend errors.
#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    /// The backend has no session to operate on.
    #[error("Terminal session is not available")]
    Unavailable,

    /// The session went away underneath us (closed window, killed server).
    #[error("Terminal session lost: {0}")]
    SessionLost(String),

    #[error("Terminal command failed: {0}")]
    CommandFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Human escalation errors.
#[derive(Debug, thiserror::Error)]
pub enum EscalationError {
    #[error("No reply from operator: {0}")]
    NoReply(String),

    #[error("Escalation channel failed: {0}")]
    Channel(String),
}

/// Errors that abort an agent run.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Malformed model response, no action line: {raw:?}")]
    MalformedResponse { raw: String },

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Escalation error: {0}")]
    Escalation(#[from] EscalationError),
}
