//! LLM integration for the agent.
//!
//! The agent only needs text completion: one prompt in, one reply out.
//! Any OpenAI-compatible Chat Completions server can back it.

mod openai;
mod provider;

pub use openai::OpenAiCompatProvider;
pub use provider::LlmProvider;

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::LlmError;

/// Create an LLM provider based on configuration.
pub fn create_llm_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    tracing::info!(
        "Using Chat Completions API at {} with model {}",
        config.base_url,
        config.model
    );
    Ok(Arc::new(OpenAiCompatProvider::new(config.clone())?))
}
