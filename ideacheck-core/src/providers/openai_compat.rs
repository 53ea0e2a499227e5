//! OpenAI-compatible LLM provider.
//!
//! Supports OpenAI, Azure OpenAI, Ollama, vLLM, LM Studio, and any
//! endpoint that follows the OpenAI chat completions API format.
//! Structured replies are requested through `response_format` with a
//! `json_schema` payload.

use crate::brain::LlmProvider;
use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, Message, Role, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible LLM provider.
pub struct OpenAiCompatibleProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatibleProvider {
    /// Create a new provider from configuration.
    ///
    /// Reads the API key from `config.api_key` or the environment variable
    /// named by `config.api_key_env`. Local endpoints need no key.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let is_local = config
            .base_url
            .as_ref()
            .map(|u| u.contains("localhost") || u.contains("127.0.0.1"))
            .unwrap_or(false);

        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(&config.api_key_env).ok())
            .or_else(|| {
                if is_local {
                    // Local servers (Ollama, vLLM, LM Studio) don't require an API key
                    debug!("No API key set for local provider; using dummy bearer token");
                    Some("ollama".to_string())
                } else {
                    None
                }
            })
            .ok_or_else(|| LlmError::AuthFailed {
                provider: format!(
                    "OpenAI-compatible: env var '{}' not set",
                    config.api_key_env
                ),
            })?;
        Self::new_with_key(config, api_key)
    }

    /// Create a new provider with an explicitly provided API key.
    pub fn new_with_key(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| LlmError::Connection {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    /// Convert internal messages to OpenAI JSON format.
    fn messages_to_json(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => "system",
                };
                json!({
                    "role": role,
                    "content": msg.text,
                })
            })
            .collect()
    }

    fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": request.model.as_deref().unwrap_or(&self.model),
            "messages": Self::messages_to_json(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(schema) = &request.response_schema {
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema_name.as_deref().unwrap_or("response"),
                    "schema": schema,
                }
            });
        }
        body
    }

    /// Parse an OpenAI-format response body into a CompletionResponse.
    fn parse_response(body: &Value, model: &str) -> Result<CompletionResponse, LlmError> {
        let choice =
            body.get("choices")
                .and_then(|c| c.get(0))
                .ok_or_else(|| LlmError::ResponseParse {
                    message: "No choices in response".to_string(),
                })?;

        let message = choice
            .get("message")
            .ok_or_else(|| LlmError::ResponseParse {
                message: "No message in choice".to_string(),
            })?;

        let finish_reason = choice
            .get("finish_reason")
            .and_then(|f| f.as_str())
            .map(|s| s.to_string());

        let text = message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or("");

        let usage_obj = body.get("usage");
        let usage = TokenUsage {
            input_tokens: usage_obj
                .and_then(|u| u.get("prompt_tokens"))
                .and_then(|t| t.as_u64())
                .unwrap_or(0) as usize,
            output_tokens: usage_obj
                .and_then(|u| u.get("completion_tokens"))
                .and_then(|t| t.as_u64())
                .unwrap_or(0) as usize,
        };

        let resp_model = body
            .get("model")
            .and_then(|m| m.as_str())
            .unwrap_or(model)
            .to_string();

        Ok(CompletionResponse {
            message: Message::assistant(text),
            usage,
            model: resp_model,
            finish_reason,
        })
    }

    /// Map an HTTP status code to the appropriate LlmError.
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        match status.as_u16() {
            401 => {
                debug!(body = %body, "Authentication failed (401)");
                LlmError::AuthFailed {
                    provider: "OpenAI-compatible".to_string(),
                }
            }
            429 => {
                // "Rate limit reached ... try again in 20s"
                let retry_secs = serde_json::from_str::<Value>(body)
                    .ok()
                    .and_then(|v| {
                        v.get("error")?
                            .get("message")?
                            .as_str()
                            .map(|s| s.to_string())
                    })
                    .and_then(|msg| {
                        msg.split("in ")
                            .last()
                            .and_then(|s| s.trim_end_matches('s').parse::<u64>().ok())
                    })
                    .unwrap_or(5);
                LlmError::RateLimited {
                    retry_after_secs: retry_secs,
                }
            }
            status if status >= 500 => LlmError::ApiRequest {
                message: format!("Server error ({}): {}", status, body),
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {}: {}", status, body),
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_request_body(&request);

        debug!(url = %url, model = %self.model, "Sending OpenAI completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    LlmError::Connection {
                        message: format!("Endpoint unreachable: {}", e),
                    }
                } else {
                    LlmError::ApiRequest {
                        message: format!("Request failed: {}", e),
                    }
                }
            })?;

        let status = response.status();
        let response_body = response.text().await.map_err(|e| LlmError::ApiRequest {
            message: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &response_body));
        }

        let json: Value =
            serde_json::from_str(&response_body).map_err(|e| LlmError::ResponseParse {
                message: format!("Invalid JSON: {}", e),
            })?;

        Self::parse_response(&json, &self.model)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn supports_structured_output(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LlmConfig {
        LlmConfig {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "IDEACHECK_TEST_OPENAI_KEY".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_messages_to_json_text() {
        let messages = vec![
            Message::system("You are a patent attorney"),
            Message::user("Hello"),
            Message::assistant("Hi there"),
        ];
        let json = OpenAiCompatibleProvider::messages_to_json(&messages);
        assert_eq!(json.len(), 3);
        assert_eq!(json[0]["role"], "system");
        assert_eq!(json[0]["content"], "You are a patent attorney");
        assert_eq!(json[1]["role"], "user");
        assert_eq!(json[2]["role"], "assistant");
    }

    #[test]
    fn test_build_request_body_with_schema() {
        let provider =
            OpenAiCompatibleProvider::new_with_key(&test_config(), "sk-test".into()).unwrap();
        let request = CompletionRequest {
            messages: vec![Message::user("Extract keywords")],
            max_tokens: Some(512),
            schema_name: Some("generateKeywords".to_string()),
            response_schema: Some(json!({"type": "object"})),
            ..Default::default()
        };
        let body = provider.build_request_body(&request);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(
            body["response_format"]["json_schema"]["name"],
            "generateKeywords"
        );
        assert_eq!(
            body["response_format"]["json_schema"]["schema"]["type"],
            "object"
        );
    }

    #[test]
    fn test_build_request_body_without_schema() {
        let provider =
            OpenAiCompatibleProvider::new_with_key(&test_config(), "sk-test".into()).unwrap();
        let request = CompletionRequest {
            messages: vec![Message::user("Hi")],
            model: Some("gpt-4o".to_string()),
            ..Default::default()
        };
        let body = provider.build_request_body(&request);
        assert_eq!(body["model"], "gpt-4o");
        assert!(body.get("response_format").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_parse_text_response() {
        let body = json!({
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [{
                "message": {"role": "assistant", "content": "{\"suggestions\": \"Narrow the claims.\"}"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 40, "completion_tokens": 12}
        });
        let result = OpenAiCompatibleProvider::parse_response(&body, "gpt-4o-mini").unwrap();
        assert_eq!(result.message.text, "{\"suggestions\": \"Narrow the claims.\"}");
        assert_eq!(result.model, "gpt-4o-mini-2024-07-18");
        assert_eq!(result.usage.total(), 52);
        assert_eq!(result.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn test_parse_response_no_choices() {
        let body = json!({"choices": []});
        let result = OpenAiCompatibleProvider::parse_response(&body, "gpt-4o");
        assert!(result.is_err());
    }

    #[test]
    fn test_http_error_mapping_401() {
        let err = OpenAiCompatibleProvider::map_http_error(
            reqwest::StatusCode::UNAUTHORIZED,
            "Unauthorized",
        );
        assert!(matches!(err, LlmError::AuthFailed { .. }));
    }

    #[test]
    fn test_http_error_mapping_429_reads_retry_hint() {
        let err = OpenAiCompatibleProvider::map_http_error(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"Rate limit reached, try again in 20s"}}"#,
        );
        match err {
            LlmError::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, 20),
            other => panic!("Expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_http_error_mapping_500() {
        let err = OpenAiCompatibleProvider::map_http_error(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
        );
        match err {
            LlmError::ApiRequest { message } => assert!(message.contains("500")),
            other => panic!("Expected ApiRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_new_missing_key() {
        // SAFETY: test-only env var manipulation
        unsafe { std::env::remove_var("IDEACHECK_TEST_OPENAI_KEY_MISSING") };
        let mut config = test_config();
        config.api_key_env = "IDEACHECK_TEST_OPENAI_KEY_MISSING".to_string();
        assert!(OpenAiCompatibleProvider::new(&config).is_err());
    }

    #[test]
    fn test_local_endpoint_needs_no_key() {
        // SAFETY: test-only env var manipulation
        unsafe { std::env::remove_var("IDEACHECK_TEST_OLLAMA_KEY_NONEXISTENT") };
        let mut config = test_config();
        config.api_key_env = "IDEACHECK_TEST_OLLAMA_KEY_NONEXISTENT".to_string();
        config.base_url = Some("http://localhost:11434/v1/".to_string());
        config.model = "qwen2.5:14b".to_string();
        let provider = OpenAiCompatibleProvider::new(&config).unwrap();
        assert_eq!(provider.model_name(), "qwen2.5:14b");
        assert_eq!(provider.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn test_provider_properties() {
        let provider =
            OpenAiCompatibleProvider::new_with_key(&test_config(), "sk-test".into()).unwrap();
        assert_eq!(provider.provider_name(), "openai");
        assert!(provider.supports_structured_output());
    }
}
