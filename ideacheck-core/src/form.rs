//! Form-layer validation for idea submissions.
//!
//! Length bounds on the idea description live here, at the submission
//! boundary, not inside the model-invocation schemas. Two form variants
//! exist: the keyword form (idea plus a required keyword field) and the quick
//! check (idea only, analyzed without keywords).

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const IDEA_FIELD: &str = "ideaDescription";
pub const KEYWORDS_FIELD: &str = "keywords";

/// Bounds enforced on submitted forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormConfig {
    /// Minimum idea description length, in characters.
    pub min_idea_chars: usize,
    /// Maximum idea description length, in characters.
    pub max_idea_chars: usize,
    /// Minimum keyword field length on the keyword form.
    pub min_keyword_chars: usize,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            min_idea_chars: 50,
            max_idea_chars: 5000,
            min_keyword_chars: 3,
        }
    }
}

/// Which submission form the user filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormVariant {
    /// Idea plus keywords; the keyword field is required.
    KeywordForm,
    /// Idea only; analysis runs without keywords.
    #[default]
    QuickCheck,
}

/// A submitted idea form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaForm {
    pub idea_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
}

impl IdeaForm {
    pub fn new(idea_description: impl Into<String>) -> Self {
        Self {
            idea_description: idea_description.into(),
            keywords: None,
        }
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }
}

/// Validates submissions against a [`FormConfig`].
#[derive(Debug, Clone, Default)]
pub struct FormValidator {
    config: FormConfig,
}

impl FormValidator {
    pub fn new(config: FormConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    /// Check the idea description against the configured length bounds.
    pub fn validate_idea(&self, idea: &str) -> Result<(), ValidationError> {
        let actual = idea.chars().count();
        if actual < self.config.min_idea_chars {
            return Err(ValidationError::TooShort {
                field: IDEA_FIELD.to_string(),
                min: self.config.min_idea_chars,
                actual,
                message: format!(
                    "Your idea description must be at least {} characters long.",
                    self.config.min_idea_chars
                ),
            });
        }
        if actual > self.config.max_idea_chars {
            return Err(ValidationError::TooLong {
                field: IDEA_FIELD.to_string(),
                max: self.config.max_idea_chars,
                actual,
                message: format!(
                    "Your idea description cannot exceed {} characters.",
                    self.config.max_idea_chars
                ),
            });
        }
        Ok(())
    }

    /// Precondition of the "Generate Keywords" action.
    ///
    /// Only the lower bound applies: the button is usable on any idea long
    /// enough to extract keywords from.
    pub fn validate_keyword_request(&self, idea: &str) -> Result<(), ValidationError> {
        let actual = idea.chars().count();
        if actual < self.config.min_idea_chars {
            return Err(ValidationError::TooShort {
                field: IDEA_FIELD.to_string(),
                min: self.config.min_idea_chars,
                actual,
                message: format!(
                    "Please enter an idea description of at least {} characters to generate keywords.",
                    self.config.min_idea_chars
                ),
            });
        }
        Ok(())
    }

    /// Check the keyword field of the keyword form.
    pub fn validate_keywords(&self, keywords: Option<&str>) -> Result<(), ValidationError> {
        let actual = keywords.map(|k| k.chars().count()).unwrap_or(0);
        if actual < self.config.min_keyword_chars {
            return Err(ValidationError::TooShort {
                field: KEYWORDS_FIELD.to_string(),
                min: self.config.min_keyword_chars,
                actual,
                message: "Please provide at least one relevant keyword.".to_string(),
            });
        }
        Ok(())
    }

    /// Validate a whole submission for the given form variant.
    pub fn validate_submission(
        &self,
        variant: FormVariant,
        form: &IdeaForm,
    ) -> Result<(), ValidationError> {
        self.validate_idea(&form.idea_description)?;
        if variant == FormVariant::KeywordForm {
            self.validate_keywords(form.keywords.as_deref())?;
        }
        Ok(())
    }
}
