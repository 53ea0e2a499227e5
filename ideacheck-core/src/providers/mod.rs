//! LLM provider implementations.
//!
//! Provides concrete implementations of the `LlmProvider` trait for:
//! - Google Gemini API (default)
//! - OpenAI-compatible APIs (OpenAI, Azure, Ollama, vLLM, LM Studio)
//!
//! Use `create_provider()` to instantiate the appropriate provider based on config.

pub mod gemini;
pub mod openai_compat;

use crate::brain::LlmProvider;
use crate::config::LlmConfig;
use crate::error::LlmError;
use std::sync::Arc;

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatibleProvider;

/// Create an LLM provider based on the configuration.
///
/// `"gemini"` selects the native Gemini transport; any other name is treated
/// as an endpoint that speaks the OpenAI chat completions format.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    if config.model.trim().is_empty() {
        return Err(LlmError::UnsupportedModel {
            model: config.model.clone(),
        });
    }
    let provider: Arc<dyn LlmProvider> = match config.provider.as_str() {
        "gemini" => Arc::new(GeminiProvider::new(config)?),
        _ => Arc::new(OpenAiCompatibleProvider::new(config)?),
    };
    tracing::debug!(
        provider = provider.provider_name(),
        model = provider.model_name(),
        "Created LLM provider"
    );
    Ok(provider)
}
