//! Core agent logic.
//!
//! The agent runs a Monitor / Analyze / Plan / Execute cycle:
//! - Monitor: read the terminal and record the observation
//! - Analyze and Plan: ask the model, given the recent transcript
//! - Execute: dispatch the one action the model chose

mod action;
mod agent_loop;
mod prompt;
mod response;
mod scratchpad;

pub use action::Action;
pub use agent_loop::{Agent, AgentDeps, AgentState, RunSummary};
pub use prompt::build_prompt;
pub use response::{ParsedStep, parse_response};
pub use scratchpad::{Scratchpad, TranscriptEntry};
