//! Suggestion refinement flow.
//!
//! Independent of the analysis flow: callers pass a free-text rendering of a
//! previous analysis (see [`crate::report::analysis_to_text`]).

use super::{Flow, InvokeOptions, invoke};
use crate::brain::LlmProvider;
use crate::error::FlowError;
use crate::schema::{SuggestionsInput, SuggestionsOutput};

pub struct GeneratePatentabilitySuggestions;

impl Flow for GeneratePatentabilitySuggestions {
    const NAME: &'static str = "generatePatentabilitySuggestions";

    type Input = SuggestionsInput;
    type Output = SuggestionsOutput;

    fn build_prompt(input: &SuggestionsInput) -> String {
        format!(
            "You are an expert patent attorney. Given the following description of a patent idea, \
             the results of a real-time patentability analysis, and a list of keywords, provide concise \
             suggestions for improving the patentability of the idea.\n\
             \n\
             Idea Description: {idea}\n\
             Analysis Results: {analysis}\n\
             Keywords: {keywords}\n\
             \n\
             Provide suggestions that are actionable and directly address any weaknesses identified in \
             the analysis results. Be specific and provide alternative approaches or modifications to \
             the invention to enhance its novelty and non-obviousness.\n\
             \n\
             Suggestions:\n",
            idea = input.idea_description,
            analysis = input.analysis_results,
            keywords = input.keywords,
        )
    }
}

/// Produce refined suggestions that address weaknesses named in `analysis_results`.
pub async fn generate_patentability_suggestions(
    provider: &dyn LlmProvider,
    options: &InvokeOptions,
    idea_description: &str,
    analysis_results: &str,
    keywords: &str,
) -> Result<SuggestionsOutput, FlowError> {
    let input = SuggestionsInput {
        idea_description: idea_description.to_string(),
        analysis_results: analysis_results.to_string(),
        keywords: keywords.to_string(),
    };
    invoke::<GeneratePatentabilitySuggestions>(provider, options, &input).await
}
