//! Command-line interface and logging setup.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Drive a terminal toward a goal with a language model.
#[derive(Parser, Debug, Clone)]
#[command(name = "cmdpilot", version, about)]
pub struct Cli {
    /// What the agent should accomplish, in plain language
    pub goal: String,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR). RUST_LOG overrides it.
    #[arg(long, default_value = "INFO")]
    pub log_level: String,

    /// Also write JSON logs to this file
    #[arg(long, env = "CMDPILOT_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Read settings from this dotenv file instead of `.env`
    #[arg(long)]
    pub env_file: Option<PathBuf>,
}

/// Build the filter from `RUST_LOG`, falling back to `log_level`.
pub fn log_filter(log_level: &str) -> anyhow::Result<EnvFilter> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.to_ascii_lowercase()))?;
    Ok(filter)
}

/// Install the global subscriber: human-readable on stderr, plus JSON lines
/// appended to `log_file` when given.
pub fn init_logging(log_level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = log_filter(log_level)?;

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(fmt::layer().json().with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init()?;

    Ok(())
}
