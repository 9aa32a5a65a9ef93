mod open_ai;
mod prompt;

pub use open_ai::OpenAIProvider;
pub use prompt::{cleanup_prompt, page_message, structure_prompt, CLEANUP_PROMPT, STRUCTURE_PROMPT};

use async_trait::async_trait;

use crate::error::ProviderError;

/// A language model seen as "prompt in, text out".
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai")
    fn provider_name(&self) -> &str;

    /// Runs one chat completion and returns the raw message content.
    ///
    /// `json` asks the provider to constrain the answer to a JSON object.
    async fn complete(&self, system: &str, user: &str, json: bool) -> Result<String, ProviderError>;
}
