//! Patentability analysis flow.
//!
//! A single round trip produces the verdict, the summary, the cited prior art
//! and the improvement suggestions together. Title/URL correspondence of the
//! citations is requested in the prompt but not verified here; see
//! [`crate::citations`] for the opt-in out-of-band check.

use super::{Flow, InvokeOptions, invoke};
use crate::brain::LlmProvider;
use crate::error::FlowError;
use crate::schema::{AnalysisInput, AnalysisResult};

pub struct AnalyzePatentIdea;

impl Flow for AnalyzePatentIdea {
    const NAME: &'static str = "analyzePatentIdea";

    type Input = AnalysisInput;
    type Output = AnalysisResult;

    fn build_prompt(input: &AnalysisInput) -> String {
        let keywords_line = match input.effective_keywords() {
            Some(keywords) => format!("Keywords: {keywords}\n"),
            None => String::new(),
        };
        format!(
            "You are an expert patent attorney specializing in analyzing the patentability of inventions.\n\
             \n\
             You will use the provided information to assess the novelty and patentability of the idea. \
             Provide a patentability analysis, including whether the idea is likely to be patentable, \
             a summary of your analysis, and a list of cited resources.\n\
             \n\
             IMPORTANT: For each cited resource, you MUST provide an accurate title and a valid, matching, \
             and publicly accessible URL (e.g., a Google Patents link). Double-check that the title and URL \
             correspond to the same patent or publication. Do not invent URLs or mismatch titles.\n\
             \n\
             Also, provide concise suggestions for improving the patentability of the idea.\n\
             \n\
             Idea Description: {idea}\n\
             {keywords_line}\
             \n\
             Consider the following:\n\
             - Prior art: Search for existing patents and publications that are similar to the idea.\n\
             - Novelty: Determine if the idea is new and not already known.\n\
             - Non-obviousness: Determine if the idea would be obvious to a person skilled in the art.\n\
             - Enablement: Determine if the idea is described in sufficient detail to enable a person \
             skilled in the art to make and use it.\n\
             \n\
             Respond in the format specified by the AnalyzePatentIdeaOutputSchema.\n",
            idea = input.idea_description,
        )
    }
}

/// Assess an idea's patentability. `keywords` refine the prior-art search when present.
pub async fn analyze_patent_idea(
    provider: &dyn LlmProvider,
    options: &InvokeOptions,
    idea_description: &str,
    keywords: Option<&str>,
) -> Result<AnalysisResult, FlowError> {
    let input = AnalysisInput {
        idea_description: idea_description.to_string(),
        keywords: keywords.map(str::to_string),
    };
    invoke::<AnalyzePatentIdea>(provider, options, &input).await
}
