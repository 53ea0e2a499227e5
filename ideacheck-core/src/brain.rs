//! Brain module: LLM provider abstraction.
//!
//! Defines the `LlmProvider` trait for model-agnostic completions and a
//! `MockLlmProvider` that replays canned replies for tests and offline runs.

use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, Message, TokenUsage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Trait for LLM providers.
///
/// Implementations perform exactly one outbound call per `complete` and
/// return the single complete reply. They never retry on their own.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Perform a full completion and return the response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Return the model name.
    fn model_name(&self) -> &str;

    /// Short provider identifier ("gemini", "openai", "mock").
    fn provider_name(&self) -> &str;

    /// Whether this provider enforces the response schema server-side.
    ///
    /// Replies are validated locally either way.
    fn supports_structured_output(&self) -> bool {
        false
    }
}

/// A canned reply queued on the mock provider.
#[derive(Debug)]
enum MockReply {
    Text(String),
    Error(LlmError),
}

/// A provider that returns queued replies in FIFO order and records every
/// request it receives.
pub struct MockLlmProvider {
    model: String,
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Create a MockLlmProvider that answers the next call with the given text.
    pub fn with_response(text: &str) -> Self {
        let provider = Self::new();
        provider.queue_text(text);
        provider
    }

    /// Create a MockLlmProvider that answers the next call with the given JSON value.
    pub fn with_json(value: serde_json::Value) -> Self {
        let provider = Self::new();
        provider.queue_json(value);
        provider
    }

    /// Sleep this long before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_text(&self, text: &str) {
        self.lock_replies().push_back(MockReply::Text(text.to_string()));
    }

    pub fn queue_json(&self, value: serde_json::Value) {
        self.queue_text(&value.to_string());
    }

    pub fn queue_error(&self, error: LlmError) {
        self.lock_replies().push_back(MockReply::Error(error));
    }

    /// Number of `complete` calls made so far.
    pub fn call_count(&self) -> usize {
        self.lock_requests().len()
    }

    /// Snapshot of every request received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.lock_requests().clone()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.lock_requests().last().cloned()
    }

    /// Create a simple text response for testing.
    pub fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            usage: TokenUsage {
                input_tokens: 100,
                output_tokens: 50,
            },
            model: "mock-model".to_string(),
            finish_reason: Some("stop".to_string()),
        }
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<MockReply>> {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<CompletionRequest>> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.lock_requests().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self.lock_replies().pop_front();
        match reply {
            Some(MockReply::Text(text)) => Ok(MockLlmProvider::text_response(&text)),
            Some(MockReply::Error(err)) => Err(err),
            None => Ok(MockLlmProvider::text_response(
                "I'm a mock LLM. No queued responses available.",
            )),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn supports_structured_output(&self) -> bool {
        true
    }
}
