//! Input and output contracts of the three prompt flows.
//!
//! These types stay pure: they describe what goes into each model call and
//! what must come back, generate the JSON schema handed to the provider, and
//! expose validation so malformed data is refused at the boundary instead of
//! flowing downstream.

use schemars::JsonSchema;
use schemars::generate::SchemaSettings;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Input-side validation beyond plain JSON typing.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// A model reply type: schema-described, decodable, with semantic checks.
pub trait StructuredOutput: DeserializeOwned + Serialize + JsonSchema {
    /// Constraints the JSON schema cannot express. Empty means valid.
    fn check(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Reject empty or whitespace-only required text.
pub fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Turn a raw JSON value into a typed, validated input.
pub fn parse_input<T>(raw: &Value) -> Result<T, ValidationError>
where
    T: DeserializeOwned + Validate,
{
    if !raw.is_object() {
        return Err(ValidationError::InvalidType {
            field: "$".to_string(),
            reason: "expected a JSON object".to_string(),
        });
    }
    let typed: T = serde_json::from_value(raw.clone()).map_err(map_decode_error)?;
    typed.validate()?;
    Ok(typed)
}

fn map_decode_error(err: serde_json::Error) -> ValidationError {
    let message = err.to_string();
    if let Some(rest) = message.strip_prefix("missing field `")
        && let Some(end) = rest.find('`')
    {
        return ValidationError::MissingField {
            field: rest[..end].to_string(),
        };
    }
    ValidationError::InvalidType {
        field: "$".to_string(),
        reason: message,
    }
}

/// Generate the JSON schema of `T`, with every subschema inlined.
///
/// Providers such as Gemini reject `$ref`, so nested types are expanded in place.
pub fn output_schema<T: JsonSchema>() -> Value {
    let mut schema = SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        })
        .into_generator()
        .into_root_schema_for::<T>()
        .to_value();
    if let Value::Object(map) = &mut schema {
        map.remove("title");
    }
    schema
}

/// Validate a JSON value against a schema, collecting every violation.
pub fn check_instance(schema: &Value, instance: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::validator_for(schema).map_err(|e| vec![format!("{e}")])?;
    let errors: Vec<String> = validator
        .iter_errors(instance)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                format!("{e}")
            } else {
                format!("{path}: {e}")
            }
        })
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// --- Keyword extraction ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordsInput {
    pub idea_description: String,
}

impl Validate for KeywordsInput {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("ideaDescription", &self.idea_description)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct KeywordsOutput {
    /// A comma-separated list of keywords relevant to the patent idea.
    pub keywords: String,
}

impl StructuredOutput for KeywordsOutput {
    fn check(&self) -> Vec<String> {
        if self.keywords.trim().is_empty() {
            vec!["keywords must not be empty".to_string()]
        } else {
            Vec::new()
        }
    }
}

impl KeywordsOutput {
    /// Individual keywords, trimmed, blanks dropped, in reply order.
    pub fn split(&self) -> Vec<&str> {
        self.keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }
}

// --- Patentability analysis ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisInput {
    pub idea_description: String,
    /// `None` when the caller supplied no keywords; `Some("")` stays distinct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
}

impl Validate for AnalysisInput {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("ideaDescription", &self.idea_description)
    }
}

impl AnalysisInput {
    /// Keywords worth putting in front of the model, if any.
    pub fn effective_keywords(&self) -> Option<&str> {
        self.keywords
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// A prior-art reference cited by the analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CitedResource {
    /// The title or identifier of the resource (e.g., patent number, publication name).
    pub title: String,
    /// A valid URL to access the resource online.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatentabilityAnalysis {
    /// Whether the patent idea is likely to be patentable.
    pub is_patentable: bool,
    /// A summary of the patentability analysis.
    pub analysis_summary: String,
    /// A list of cited resources, each with a title and a URL.
    pub cited_resources: Vec<CitedResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub patentability_analysis: PatentabilityAnalysis,
    /// Suggestions for improving the patentability of the idea.
    pub improvement_suggestions: String,
}

impl StructuredOutput for AnalysisResult {
    fn check(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for (idx, resource) in self
            .patentability_analysis
            .cited_resources
            .iter()
            .enumerate()
        {
            if resource.title.trim().is_empty() {
                issues.push(format!(
                    "patentabilityAnalysis.citedResources[{idx}].title must not be empty"
                ));
            }
            if resource.url.trim().is_empty() {
                issues.push(format!(
                    "patentabilityAnalysis.citedResources[{idx}].url must not be empty"
                ));
            }
        }
        issues
    }
}

// --- Suggestion refinement ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsInput {
    pub idea_description: String,
    /// Free-text rendering of a prior analysis.
    pub analysis_results: String,
    pub keywords: String,
}

impl Validate for SuggestionsInput {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("ideaDescription", &self.idea_description)?;
        require_text("analysisResults", &self.analysis_results)?;
        require_text("keywords", &self.keywords)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SuggestionsOutput {
    /// Concise suggestions for improving the patentability of the idea.
    pub suggestions: String,
}

impl StructuredOutput for SuggestionsOutput {
    fn check(&self) -> Vec<String> {
        if self.suggestions.trim().is_empty() {
            vec!["suggestions must not be empty".to_string()]
        } else {
            Vec::new()
        }
    }
}
