//! Configuration for cmdpilot.
//!
//! Settings come from environment variables, optionally seeded from a `.env`
//! file. Everything except the model API key has a default.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Main configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub terminal: TerminalConfig,
}

/// Model provider configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API, without the endpoint path.
    pub base_url: String,
    /// Model name passed to the API.
    pub model: String,
    pub api_key: SecretString,
    pub temperature: f32,
    pub request_timeout: Duration,
}

/// Agent loop configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum number of MAPE cycles before giving up.
    pub max_steps: usize,
    /// Rounds of transcript kept in the prompt.
    pub max_scratchpad_rounds: usize,
    /// Number of initial cycles whose prompt includes the worked example.
    pub example_cycles: usize,
    /// Pause before every dispatched action.
    pub dispatch_delay: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 100,
            max_scratchpad_rounds: 3,
            example_cycles: 2,
            dispatch_delay: Duration::from_secs(3),
        }
    }
}

/// Terminal backend and stabilizer configuration.
#[derive(Debug, Clone)]
pub struct TerminalConfig {
    /// Pause between the first two captures of a read.
    pub settle_delay: Duration,
    /// Pause before re-polling an unsettled screen.
    pub retry_delay: Duration,
    /// Poll ceiling for one read (`None` = wait forever).
    pub max_polls: Option<u32>,
    /// Lines returned by `terminal_run` and by default `terminal_read`.
    pub read_max_lines: usize,
    /// Pause between sending a command and reading its output.
    pub run_read_delay: Duration,
    /// How long the worker waits for the backend to open.
    pub open_timeout: Duration,
    /// tmux session the agent works in.
    pub tmux_session: String,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(1),
            retry_delay: Duration::from_secs(3),
            max_polls: None,
            read_max_lines: 10,
            run_read_delay: Duration::from_secs(2),
            open_timeout: Duration::from_secs(5),
            tmux_session: "cmdpilot".to_string(),
        }
    }
}

impl TerminalConfig {
    /// A configuration with no delays, for tests and replays.
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
            max_polls: Some(50),
            run_read_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from a dotenv file without touching the process
    /// environment.
    pub fn from_env_file(path: &Path) -> Result<Self, ConfigError> {
        let mut vars = HashMap::new();
        for item in dotenvy::from_path_iter(path)? {
            let (key, value) = item?;
            vars.insert(key, value);
        }
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;

        let llm = LlmConfig {
            base_url: lookup("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: lookup("OPENAI_API_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: SecretString::from(api_key),
            temperature: parse_or(&lookup, "OPENAI_TEMPERATURE", 0.0)?,
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "OPENAI_TIMEOUT_SECS",
                120,
            )?),
        };

        let agent_defaults = AgentConfig::default();
        let agent = AgentConfig {
            max_steps: parse_or(&lookup, "CMDPILOT_MAX_STEPS", agent_defaults.max_steps)?,
            max_scratchpad_rounds: parse_or(
                &lookup,
                "CMDPILOT_SCRATCHPAD_ROUNDS",
                agent_defaults.max_scratchpad_rounds,
            )?,
            example_cycles: parse_or(
                &lookup,
                "CMDPILOT_EXAMPLE_CYCLES",
                agent_defaults.example_cycles,
            )?,
            dispatch_delay: millis_or(
                &lookup,
                "CMDPILOT_DISPATCH_DELAY_MS",
                agent_defaults.dispatch_delay,
            )?,
        };

        let terminal_defaults = TerminalConfig::default();
        let terminal = TerminalConfig {
            settle_delay: millis_or(&lookup, "CMDPILOT_SETTLE_MS", terminal_defaults.settle_delay)?,
            retry_delay: millis_or(&lookup, "CMDPILOT_RETRY_MS", terminal_defaults.retry_delay)?,
            max_polls: match lookup("CMDPILOT_MAX_POLLS") {
                Some(raw) => Some(parse_value("CMDPILOT_MAX_POLLS", &raw)?),
                None => terminal_defaults.max_polls,
            },
            read_max_lines: parse_or(
                &lookup,
                "CMDPILOT_READ_LINES",
                terminal_defaults.read_max_lines,
            )?,
            run_read_delay: millis_or(
                &lookup,
                "CMDPILOT_RUN_READ_DELAY_MS",
                terminal_defaults.run_read_delay,
            )?,
            open_timeout: millis_or(
                &lookup,
                "CMDPILOT_OPEN_TIMEOUT_MS",
                terminal_defaults.open_timeout,
            )?,
            tmux_session: lookup("CMDPILOT_TMUX_SESSION").unwrap_or(terminal_defaults.tmux_session),
        };

        Ok(Self {
            llm,
            agent,
            terminal,
        })
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        message: format!("{raw:?}: {e}"),
    })
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn millis_or<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse_value::<u64>(key, &raw).map(Duration::from_millis),
        None => Ok(default),
    }
}
