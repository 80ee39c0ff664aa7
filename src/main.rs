//! cmdpilot binary entry point.

use std::sync::Arc;

use clap::Parser;

use cmdpilot::agent::{Agent, AgentDeps, AgentState};
use cmdpilot::cli::{Cli, init_logging};
use cmdpilot::config::Config;
use cmdpilot::escalation::ConsoleEscalation;
use cmdpilot::llm::create_llm_provider;
use cmdpilot::terminal::{TerminalHandle, TmuxBackend, tmux_available};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_file.as_deref())?;

    let config = match &cli.env_file {
        Some(path) => Config::from_env_file(path)?,
        None => Config::from_env()?,
    };

    if !tmux_available().await {
        anyhow::bail!("tmux is not installed or not on PATH");
    }

    let llm = create_llm_provider(&config.llm)?;
    let backend = TmuxBackend::new(config.terminal.tmux_session.clone());
    tracing::info!(
        "Working in tmux session '{}' (attach with: tmux attach-session -t {})",
        config.terminal.tmux_session,
        config.terminal.tmux_session
    );
    let mut terminal = TerminalHandle::spawn(backend, &config.terminal)?;

    let deps = AgentDeps {
        llm,
        escalation: Arc::new(ConsoleEscalation::new()),
    };
    let result = Agent::new(config.agent.clone(), deps, &terminal)
        .run(&cli.goal)
        .await;
    terminal.close();

    let summary = result?;
    match summary.final_state {
        AgentState::Budgeted => {
            tracing::warn!("Gave up after {} steps without reaching the goal", summary.cycles)
        }
        _ => tracing::info!("Finished in {} steps", summary.cycles),
    }

    Ok(())
}
