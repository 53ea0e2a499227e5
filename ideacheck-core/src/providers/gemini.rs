//! Google Gemini API provider implementation.
//!
//! Implements the `LlmProvider` trait for the native Google Gemini API.
//!
//! Key differences from OpenAI-compatible APIs:
//! - Auth via `?key=API_KEY` query parameter (not header-based)
//! - System instruction is a top-level `system_instruction` field
//! - Roles are `"user"` / `"model"` (not `"assistant"`)
//! - Structured output via `generationConfig.responseSchema`, which accepts
//!   only a subset of JSON Schema

use crate::brain::LlmProvider;
use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, Message, Role, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// The default Google Gemini API base URL.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// How authentication is performed against the Gemini API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GeminiAuthMode {
    /// Traditional API key via `?key=` query parameter.
    ApiKey,
    /// OAuth Bearer token via `Authorization` header.
    Bearer,
}

/// Google Gemini API provider.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    auth_mode: GeminiAuthMode,
}

impl GeminiProvider {
    /// Create a new Gemini provider from configuration.
    ///
    /// Uses `config.api_key` when set, otherwise reads the environment variable
    /// named by `config.api_key_env`. Returns `LlmError::AuthFailed` if neither is available.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(&config.api_key_env).ok())
            .ok_or_else(|| LlmError::AuthFailed {
                provider: format!("Gemini (env var '{}' not set)", config.api_key_env),
            })?;
        Self::new_with_key(config, api_key)
    }

    /// Create a new Gemini provider with an explicitly provided API key.
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

        let auth_mode = if config.auth_method == "oauth" {
            GeminiAuthMode::Bearer
        } else {
            GeminiAuthMode::ApiKey
        };

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            auth_mode,
        })
    }

    /// Build the JSON request body for the Gemini API.
    ///
    /// System messages become the top-level `system_instruction`. When the
    /// request carries a response schema, JSON output is requested with the
    /// sanitized schema attached.
    fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let max_tokens = request.max_tokens.unwrap_or(4096);

        let (system_text, non_system_messages) =
            Self::extract_system_instruction(&request.messages);

        let contents: Vec<Value> = non_system_messages
            .iter()
            .map(|msg| Self::message_to_gemini_json(msg))
            .collect();

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": max_tokens,
                "temperature": request.temperature,
            },
        });

        if let Some(system) = &system_text {
            body["system_instruction"] = serde_json::json!({
                "parts": [{"text": system}]
            });
        }

        if let Some(schema) = &request.response_schema {
            body["generationConfig"]["responseMimeType"] =
                Value::String("application/json".to_string());
            body["generationConfig"]["responseSchema"] = Self::sanitize_schema(schema);
        }

        body
    }

    /// Extract system messages from the messages list.
    ///
    /// Returns a tuple of (optional concatenated system text, non-system messages).
    fn extract_system_instruction(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut non_system: Vec<&Message> = Vec::new();

        for msg in messages {
            if msg.role == Role::System {
                system_parts.push(&msg.text);
            } else {
                non_system.push(msg);
            }
        }

        let system_text = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        (system_text, non_system)
    }

    fn message_to_gemini_json(msg: &Message) -> Value {
        let role = match msg.role {
            Role::Assistant => "model",
            Role::User | Role::System => "user",
        };
        serde_json::json!({
            "role": role,
            "parts": [{"text": msg.text}],
        })
    }

    /// Recursively strip JSON Schema fields that the Gemini API does not support.
    ///
    /// Gemini response schemas support: `type`, `description`, `properties`,
    /// `required`, `enum`, `items`, `format`, `nullable`.
    /// Everything else (e.g., `additionalProperties`, `default`, `$schema`,
    /// `title`, `examples`, `pattern`, `minimum`, `maximum`, etc.) is removed.
    fn sanitize_schema(schema: &Value) -> Value {
        const ALLOWED_KEYS: &[&str] = &[
            "type",
            "description",
            "properties",
            "required",
            "enum",
            "items",
            "format",
            "nullable",
        ];

        match schema {
            Value::Object(map) => {
                let mut clean = serde_json::Map::new();
                for (key, value) in map {
                    if !ALLOWED_KEYS.contains(&key.as_str()) {
                        continue;
                    }
                    let cleaned_value = match key.as_str() {
                        "properties" => {
                            if let Value::Object(props) = value {
                                let cleaned_props: serde_json::Map<String, Value> = props
                                    .iter()
                                    .map(|(k, v)| (k.clone(), Self::sanitize_schema(v)))
                                    .collect();
                                Value::Object(cleaned_props)
                            } else {
                                value.clone()
                            }
                        }
                        "items" => Self::sanitize_schema(value),
                        _ => value.clone(),
                    };
                    clean.insert(key.clone(), cleaned_value);
                }
                Value::Object(clean)
            }
            other => other.clone(),
        }
    }

    /// Parse a Gemini API response JSON into a `CompletionResponse`.
    fn parse_response(body: &Value) -> Result<CompletionResponse, LlmError> {
        let candidates = body["candidates"]
            .as_array()
            .ok_or_else(|| LlmError::ResponseParse {
                message: "Missing 'candidates' array in response".to_string(),
            })?;

        let Some(candidate) = candidates.first() else {
            return Err(LlmError::ResponseParse {
                message: "Empty 'candidates' array in response".to_string(),
            });
        };

        let parts = candidate["content"]["parts"]
            .as_array()
            .ok_or_else(|| LlmError::ResponseParse {
                message: "Missing 'parts' array in candidate content".to_string(),
            })?;

        let text: String = parts
            .iter()
            .filter_map(|part| {
                let text = part.get("text").and_then(|t| t.as_str());
                if text.is_none() {
                    debug!(?part, "Ignoring non-text Gemini part");
                }
                text
            })
            .collect();

        let finish_reason = candidate["finishReason"].as_str().map(|s| s.to_string());

        let usage_metadata = &body["usageMetadata"];
        let usage = TokenUsage {
            input_tokens: usage_metadata["promptTokenCount"].as_u64().unwrap_or(0) as usize,
            output_tokens: usage_metadata["candidatesTokenCount"].as_u64().unwrap_or(0) as usize,
        };

        let model = body["modelVersion"]
            .as_str()
            .unwrap_or("gemini")
            .to_string();

        Ok(CompletionResponse {
            message: Message::assistant(text),
            usage,
            model,
            finish_reason,
        })
    }

    /// Map an HTTP status code to the appropriate `LlmError`.
    fn map_http_error(status: reqwest::StatusCode, body_text: &str) -> LlmError {
        match status.as_u16() {
            401 | 403 => LlmError::AuthFailed {
                provider: "Gemini".to_string(),
            },
            429 => LlmError::RateLimited {
                retry_after_secs: 30,
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {} from Gemini API: {}", status, body_text),
            },
        }
    }

    /// Build the endpoint URL for a Gemini API call.
    ///
    /// In `ApiKey` mode, the key is appended as a `?key=` query parameter.
    /// In `Bearer` mode, the URL contains no key (auth is via header).
    fn endpoint_url(&self, model: &str, method: &str) -> String {
        match self.auth_mode {
            GeminiAuthMode::ApiKey => {
                format!(
                    "{}/models/{}:{}?key={}",
                    self.base_url, model, method, self.api_key
                )
            }
            GeminiAuthMode::Bearer => {
                format!("{}/models/{}:{}", self.base_url, model, method)
            }
        }
    }

    /// Build a request with the appropriate auth header/params.
    fn build_authed_request(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .post(url)
            .header("content-type", "application/json");
        match self.auth_mode {
            GeminiAuthMode::ApiKey => builder,
            GeminiAuthMode::Bearer => {
                builder.header("Authorization", format!("Bearer {}", self.api_key))
            }
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let model = request.model.as_deref().unwrap_or(&self.model);
        let body = self.build_request_body(&request);
        let url = self.endpoint_url(model, "generateContent");

        debug!(
            model = model,
            structured = request.response_schema.is_some(),
            "Sending Gemini completion request"
        );

        let response = self
            .build_authed_request(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    LlmError::Connection {
                        message: format!("Gemini API unreachable: {}", e.without_url()),
                    }
                } else {
                    LlmError::ApiRequest {
                        message: format!("Request to Gemini API failed: {}", e.without_url()),
                    }
                }
            })?;

        let status = response.status();
        let body_text = response.text().await.map_err(|e| LlmError::ResponseParse {
            message: format!("Failed to read response body: {}", e.without_url()),
        })?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &body_text));
        }

        let response_json: Value =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ResponseParse {
                message: format!("Invalid JSON in response: {}", e),
            })?;

        Self::parse_response(&response_json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn supports_structured_output(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to build a test config with a given env var name.
    fn test_config(api_key_env: &str) -> LlmConfig {
        LlmConfig {
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key_env: api_key_env.to_string(),
            ..Default::default()
        }
    }

    fn make_provider() -> GeminiProvider {
        GeminiProvider::new_with_key(&test_config("UNUSED_ENV_VAR"), "test-gemini-key-12345".into())
            .expect("Provider creation should succeed")
    }

    #[test]
    fn test_new_reads_env() {
        let env_var = "IDEACHECK_GEMINI_TEST_KEY_NEW_READS";
        // SAFETY: test-only env var manipulation
        unsafe { std::env::set_var(env_var, "my-gemini-api-key") };
        let config = test_config(env_var);
        let provider = GeminiProvider::new(&config).unwrap();
        assert_eq!(provider.api_key, "my-gemini-api-key");
        assert_eq!(provider.model, "gemini-2.0-flash");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
        // SAFETY: test-only env var manipulation
        unsafe { std::env::remove_var(env_var) };
    }

    #[test]
    fn test_new_missing_env_returns_auth_failed() {
        // SAFETY: test-only env var manipulation
        unsafe { std::env::remove_var("GEMINI_MISSING_KEY_XYZ") };
        let config = test_config("GEMINI_MISSING_KEY_XYZ");
        match GeminiProvider::new(&config) {
            Err(LlmError::AuthFailed { provider }) => {
                assert!(provider.contains("GEMINI_MISSING_KEY_XYZ"));
            }
            Err(other) => panic!("Expected AuthFailed, got {:?}", other),
            Ok(_) => panic!("Expected AuthFailed, got a provider"),
        }
    }

    #[test]
    fn test_inline_key_takes_precedence() {
        let mut config = test_config("GEMINI_MISSING_KEY_INLINE");
        config.api_key = Some("inline-key".to_string());
        let provider = GeminiProvider::new(&config).unwrap();
        assert_eq!(provider.api_key, "inline-key");
    }

    #[test]
    fn test_new_custom_base_url() {
        let mut config = test_config("UNUSED_ENV_VAR");
        config.base_url = Some("https://my-proxy.example.com/v1/".to_string());
        let provider = GeminiProvider::new_with_key(&config, "k".into()).unwrap();
        assert_eq!(provider.base_url, "https://my-proxy.example.com/v1");
    }

    #[test]
    fn test_system_instruction_extraction() {
        let messages = vec![
            Message::system("You are a patent attorney."),
            Message::user("Assess this idea."),
        ];
        let (system_text, non_system) = GeminiProvider::extract_system_instruction(&messages);
        assert_eq!(system_text.as_deref(), Some("You are a patent attorney."));
        assert_eq!(non_system.len(), 1);
        assert_eq!(non_system[0].role, Role::User);
    }

    #[test]
    fn test_system_instruction_extraction_none() {
        let messages = vec![Message::user("Hi")];
        let (system_text, non_system) = GeminiProvider::extract_system_instruction(&messages);
        assert!(system_text.is_none());
        assert_eq!(non_system.len(), 1);
    }

    #[test]
    fn test_message_to_gemini_json_assistant() {
        let json = GeminiProvider::message_to_gemini_json(&Message::assistant("Done."));
        assert_eq!(json["role"], "model");
        assert_eq!(json["parts"][0]["text"], "Done.");
    }

    #[test]
    fn test_parse_text_response() {
        let response_json = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{"text": "{\"keywords\": \"mug\"}"}],
                    "role": "model"
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 25,
                "candidatesTokenCount": 10,
                "totalTokenCount": 35
            },
            "modelVersion": "gemini-2.0-flash"
        });

        let result = GeminiProvider::parse_response(&response_json).unwrap();
        assert_eq!(result.message.text, "{\"keywords\": \"mug\"}");
        assert_eq!(result.model, "gemini-2.0-flash");
        assert_eq!(result.usage.input_tokens, 25);
        assert_eq!(result.usage.output_tokens, 10);
        assert_eq!(result.finish_reason, Some("STOP".to_string()));
        assert_eq!(result.message.role, Role::Assistant);
    }

    #[test]
    fn test_parse_multipart_text_is_joined() {
        let response_json = serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "{\"keywords\":"}, {"text": " \"mug\"}"}]}
            }]
        });
        let result = GeminiProvider::parse_response(&response_json).unwrap();
        assert_eq!(result.message.text, "{\"keywords\": \"mug\"}");
        assert_eq!(result.model, "gemini");
    }

    #[test]
    fn test_parse_empty_candidates() {
        let response_json = serde_json::json!({"candidates": []});
        let err = GeminiProvider::parse_response(&response_json).unwrap_err();
        assert!(matches!(err, LlmError::ResponseParse { .. }));
    }

    #[test]
    fn test_parse_missing_candidates() {
        let response_json = serde_json::json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = GeminiProvider::parse_response(&response_json).unwrap_err();
        match err {
            LlmError::ResponseParse { message } => assert!(message.contains("candidates")),
            other => panic!("Expected ResponseParse, got {:?}", other),
        }
    }

    #[test]
    fn test_http_error_mapping() {
        let err = GeminiProvider::map_http_error(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"Invalid API key"}}"#,
        );
        match err {
            LlmError::AuthFailed { provider } => assert_eq!(provider, "Gemini"),
            _ => panic!("Expected AuthFailed, got {:?}", err),
        }

        let err = GeminiProvider::map_http_error(reqwest::StatusCode::FORBIDDEN, "Forbidden");
        assert!(matches!(err, LlmError::AuthFailed { .. }));

        let err =
            GeminiProvider::map_http_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(
            err,
            LlmError::RateLimited {
                retry_after_secs: 30
            }
        ));

        let err = GeminiProvider::map_http_error(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
        );
        match err {
            LlmError::ApiRequest { message } => assert!(message.contains("500")),
            _ => panic!("Expected ApiRequest, got {:?}", err),
        }
    }

    #[test]
    fn test_build_request_body_plain_text() {
        let provider = make_provider();
        let request = CompletionRequest {
            messages: vec![
                Message::system("You are a patent attorney."),
                Message::user("Assess this."),
            ],
            temperature: 0.5,
            max_tokens: Some(1024),
            ..Default::default()
        };

        let body = provider.build_request_body(&request);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
        assert_eq!(body["generationConfig"]["temperature"], 0.5);
        assert!(body["generationConfig"].get("responseSchema").is_none());
        assert_eq!(
            body["system_instruction"]["parts"][0]["text"],
            "You are a patent attorney."
        );
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
    }

    #[test]
    fn test_build_request_body_structured() {
        let provider = make_provider();
        let request = CompletionRequest {
            messages: vec![Message::user("Extract keywords.")],
            schema_name: Some("generateKeywords".to_string()),
            response_schema: Some(serde_json::json!({
                "$schema": "http://json-schema.org/draft-07/schema#",
                "type": "object",
                "properties": {"keywords": {"type": "string", "description": "Keywords"}},
                "required": ["keywords"],
                "additionalProperties": false
            })),
            ..Default::default()
        };

        let body = provider.build_request_body(&request);
        let config = &body["generationConfig"];
        assert_eq!(config["maxOutputTokens"], 4096);
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["responseSchema"]["type"], "object");
        assert_eq!(config["responseSchema"]["required"][0], "keywords");
        assert!(config["responseSchema"].get("$schema").is_none());
        assert!(config["responseSchema"].get("additionalProperties").is_none());
    }

    #[test]
    fn test_sanitize_schema_strips_unsupported_fields() {
        let schema = serde_json::json!({
            "type": "object",
            "title": "AnalysisResult",
            "properties": {
                "citedResources": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "title": "CitedResource",
                        "properties": {"url": {"type": "string", "format": "uri", "default": ""}}
                    }
                }
            },
            "required": ["citedResources"],
            "additionalProperties": false
        });

        let sanitized = GeminiProvider::sanitize_schema(&schema);
        assert_eq!(sanitized["type"], "object");
        assert!(sanitized.get("title").is_none());
        assert!(sanitized.get("additionalProperties").is_none());
        let items = &sanitized["properties"]["citedResources"]["items"];
        assert!(items.get("title").is_none());
        assert_eq!(items["properties"]["url"]["format"], "uri");
        assert!(items["properties"]["url"].get("default").is_none());
    }

    #[test]
    fn test_endpoint_url() {
        let provider = make_provider();
        let url = provider.endpoint_url("gemini-2.0-flash", "generateContent");
        assert_eq!(
            url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent?key=test-gemini-key-12345"
        );
    }

    #[test]
    fn test_endpoint_url_bearer_has_no_key() {
        let mut config = test_config("UNUSED_ENV_VAR");
        config.auth_method = "oauth".to_string();
        let provider = GeminiProvider::new_with_key(&config, "token".into()).unwrap();
        let url = provider.endpoint_url("gemini-2.0-flash", "generateContent");
        assert!(!url.contains("key="));
    }

    #[test]
    fn test_provider_properties() {
        let provider = make_provider();
        assert_eq!(provider.model_name(), "gemini-2.0-flash");
        assert_eq!(provider.provider_name(), "gemini");
        assert!(provider.supports_structured_output());
    }
}
