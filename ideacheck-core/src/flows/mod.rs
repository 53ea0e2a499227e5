//! Prompt flows: one template, one input contract and one output contract each.
//!
//! Every flow goes through [`invoke`], which validates the input, renders the
//! prompt, performs exactly one provider call with the output schema attached,
//! and accepts the reply only if it parses, matches the schema and passes the
//! output type's semantic checks. Nothing is retried and nothing partial is
//! ever returned.

pub mod analysis;
pub mod keywords;
pub mod suggestions;

use crate::brain::LlmProvider;
use crate::config::LlmConfig;
use crate::error::{FlowError, InvocationError};
use crate::schema::{StructuredOutput, Validate, check_instance, output_schema};
use crate::types::{CompletionRequest, Message};
use serde_json::Value;
use tracing::{debug, info, warn};

pub use analysis::{AnalyzePatentIdea, analyze_patent_idea};
pub use keywords::{GenerateKeywords, generate_keywords};
pub use suggestions::{GeneratePatentabilitySuggestions, generate_patentability_suggestions};

/// A declarative prompt flow.
pub trait Flow {
    /// Flow name, used for logging, errors and schema labels.
    const NAME: &'static str;

    type Input: Validate + Send + Sync;
    type Output: StructuredOutput + Send;

    /// Render the prompt for a validated input. Pure.
    fn build_prompt(input: &Self::Input) -> String;
}

/// Sampling parameters attached to every flow request.
#[derive(Debug, Clone)]
pub struct InvokeOptions {
    pub temperature: f32,
    pub max_tokens: Option<usize>,
    /// Per-request model override; `None` uses the provider's model.
    pub model: Option<String>,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: None,
            model: None,
        }
    }
}

impl From<&LlmConfig> for InvokeOptions {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: Some(config.max_tokens),
            model: None,
        }
    }
}

/// Build the completion request a flow sends for `input`.
pub fn build_request<F: Flow>(options: &InvokeOptions, input: &F::Input) -> CompletionRequest {
    CompletionRequest {
        messages: vec![Message::user(F::build_prompt(input))],
        temperature: options.temperature,
        max_tokens: options.max_tokens,
        model: options.model.clone(),
        schema_name: Some(F::NAME.to_string()),
        response_schema: Some(output_schema::<F::Output>()),
    }
}

/// Run flow `F` once against `provider`.
pub async fn invoke<F: Flow>(
    provider: &dyn LlmProvider,
    options: &InvokeOptions,
    input: &F::Input,
) -> Result<F::Output, FlowError> {
    input.validate()?;

    let request = build_request::<F>(options, input);
    let schema = request.response_schema.clone().unwrap_or(Value::Null);

    debug!(
        flow = F::NAME,
        model = provider.model_name(),
        prompt_chars = request.prompt_text().len(),
        "Invoking flow"
    );

    let response = provider.complete(request).await.map_err(|source| {
        warn!(flow = F::NAME, error = %source, "Provider call failed");
        InvocationError::Provider {
            flow: F::NAME,
            source,
        }
    })?;

    let output = decode_reply::<F::Output>(F::NAME, &schema, &response.message.text)
        .inspect_err(|e| warn!(flow = F::NAME, error = %e, "Rejected model reply"))?;

    info!(
        flow = F::NAME,
        model = response.model.as_str(),
        input_tokens = response.usage.input_tokens,
        output_tokens = response.usage.output_tokens,
        "Flow settled"
    );
    Ok(output)
}

/// Parse, schema-check and decode a raw model reply.
pub fn decode_reply<T: StructuredOutput>(
    flow: &'static str,
    schema: &Value,
    text: &str,
) -> Result<T, InvocationError> {
    let json_text = extract_json(text);
    let value: Value =
        serde_json::from_str(json_text).map_err(|e| InvocationError::MalformedOutput {
            flow,
            message: e.to_string(),
        })?;

    if !schema.is_null() {
        check_instance(schema, &value)
            .map_err(|errors| InvocationError::SchemaViolation { flow, errors })?;
    }

    let output: T =
        serde_json::from_value(value).map_err(|e| InvocationError::SchemaViolation {
            flow,
            errors: vec![e.to_string()],
        })?;

    let issues = output.check();
    if !issues.is_empty() {
        return Err(InvocationError::SchemaViolation {
            flow,
            errors: issues,
        });
    }
    Ok(output)
}

/// Strip a Markdown code fence around a JSON reply, if present.
pub fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::schema::KeywordsOutput;

    #[test]
    fn test_extract_json_plain() {
        assert_eq!(extract_json("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_json_fenced() {
        let text = "```json\n{\"keywords\": \"mug\"}\n```";
        assert_eq!(extract_json(text), "{\"keywords\": \"mug\"}");

        let text = "```\n{\"keywords\": \"mug\"}\n```\n";
        assert_eq!(extract_json(text), "{\"keywords\": \"mug\"}");
    }

    #[test]
    fn test_decode_reply_malformed() {
        let schema = output_schema::<KeywordsOutput>();
        let err = decode_reply::<KeywordsOutput>("generateKeywords", &schema, "not json")
            .unwrap_err();
        assert!(matches!(err, InvocationError::MalformedOutput { .. }));
    }

    #[test]
    fn test_decode_reply_schema_violation() {
        let schema = output_schema::<KeywordsOutput>();
        let err = decode_reply::<KeywordsOutput>("generateKeywords", &schema, r#"{"keywords": 7}"#)
            .unwrap_err();
        assert!(matches!(err, InvocationError::SchemaViolation { .. }));
    }

    #[test]
    fn test_decode_reply_semantic_violation() {
        let schema = output_schema::<KeywordsOutput>();
        let err = decode_reply::<KeywordsOutput>("generateKeywords", &schema, r#"{"keywords": ""}"#)
            .unwrap_err();
        match err {
            InvocationError::SchemaViolation { errors, .. } => {
                assert_eq!(errors, vec!["keywords must not be empty".to_string()]);
            }
            other => panic!("Expected SchemaViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_reply_ok() {
        let schema = output_schema::<KeywordsOutput>();
        let out = decode_reply::<KeywordsOutput>(
            "generateKeywords",
            &schema,
            "```json\n{\"keywords\": \"mug, heater\"}\n```",
        )
        .unwrap();
        assert_eq!(out.keywords, "mug, heater");
    }

    #[test]
    fn test_invoke_options_from_config() {
        let config = LlmConfig {
            temperature: 0.2,
            max_tokens: 2048,
            ..Default::default()
        };
        let options = InvokeOptions::from(&config);
        assert!((options.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(options.max_tokens, Some(2048));
        assert!(options.model.is_none());
    }

    #[tokio::test]
    async fn test_invoke_validates_before_calling() {
        let provider = crate::brain::MockLlmProvider::new();
        let input = crate::schema::KeywordsInput {
            idea_description: String::new(),
        };
        let err = invoke::<GenerateKeywords>(&provider, &InvokeOptions::default(), &input)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::Validation(ValidationError::Empty { .. })
        ));
        assert_eq!(provider.call_count(), 0);
    }
}
