//! Remote generation: technique selection, category suggestion, prompt
//! enhancement and streamed execution against an OpenRouter-compatible API.

mod client;
mod error;
pub mod parse;
pub mod prompts;
pub mod stream;

pub use client::{ClientSettings, OpenRouterClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::GenerationError;

use crate::catalog::Category;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// One enhanced variant of the user's prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedPrompt {
    pub technique: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub explanation: String,
}

/// Receives streamed text fragments in arrival order
pub type ChunkSink = Box<dyn FnMut(String) + Send>;
/// Receives the single terminal error of a stream
pub type ErrorSink = Box<dyn FnOnce(GenerationError) + Send>;

#[async_trait]
pub trait GenerationService: Send + Sync {
    /// 3 to 5 catalog technique names suited to the prompt
    async fn select_techniques(
        &self,
        prompt: &str,
        category: Category,
        context: Option<&str>,
    ) -> Result<Vec<String>, GenerationError>;

    /// Best-effort category guess; failures yield `None`
    async fn suggest_category(&self, prompt: &str) -> Option<Category>;

    async fn enhance_prompt(
        &self,
        prompt: &str,
        category: Category,
        techniques: &[String],
    ) -> Result<Vec<EnhancedPrompt>, GenerationError>;

    /// Stream a completion of `prompt`.
    ///
    /// `on_error` fires at most once and ends the stream. Once `cancel` is
    /// triggered neither callback fires again.
    async fn execute_prompt_stream(
        &self,
        prompt: &str,
        on_chunk: ChunkSink,
        on_error: ErrorSink,
        cancel: CancellationToken,
    );
}

#[cfg(test)]
pub(crate) mod fake;
