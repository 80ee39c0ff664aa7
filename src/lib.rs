//! cmdpilot: a language-model agent that operates a terminal session.
//!
//! The agent reads the screen, asks a model what to do next, types the
//! chosen command, and repeats until the model reports the goal reached.

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod escalation;
pub mod llm;
pub mod terminal;
