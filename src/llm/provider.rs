//! LLM provider trait.

use async_trait::async_trait;

use crate::error::LlmError;

/// A language model that completes a prompt.
///
/// Calls are not retried here; a failure ends the agent run.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the model name.
    fn model_name(&self) -> &str;

    /// Complete `prompt` and return the model's text.
    async fn predict(&self, prompt: &str) -> Result<String, LlmError>;
}
