//! Keyword extraction flow.

use super::{Flow, InvokeOptions, invoke};
use crate::brain::LlmProvider;
use crate::error::FlowError;
use crate::schema::{KeywordsInput, KeywordsOutput};

pub struct GenerateKeywords;

impl Flow for GenerateKeywords {
    const NAME: &'static str = "generateKeywords";

    type Input = KeywordsInput;
    type Output = KeywordsOutput;

    fn build_prompt(input: &KeywordsInput) -> String {
        format!(
            "You are an expert in patent analysis and keyword extraction.\n\
             Given the following description of a patent idea, extract the most relevant keywords.\n\
             \n\
             Return the keywords as a single comma-separated string.\n\
             \n\
             Idea Description: {idea}\n",
            idea = input.idea_description,
        )
    }
}

/// Extract a comma-separated keyword string from an idea description.
pub async fn generate_keywords(
    provider: &dyn LlmProvider,
    options: &InvokeOptions,
    idea_description: &str,
) -> Result<KeywordsOutput, FlowError> {
    let input = KeywordsInput {
        idea_description: idea_description.to_string(),
    };
    invoke::<GenerateKeywords>(provider, options, &input).await
}
