//! # IdeaCheck Core
//!
//! Core library for IdeaCheck, a patentability pre-check service.
//! Provides the three structured prompt flows (keyword extraction,
//! patentability analysis, suggestion refinement), their input/output
//! contracts, the LLM interface (brain) and providers, the calling layer
//! that sequences and bounds the flows, and the HTTP gateway.

pub mod brain;
pub mod citations;
pub mod config;
pub mod error;
pub mod flows;
pub mod form;
pub mod gateway;
pub mod orchestrator;
pub mod providers;
pub mod report;
pub mod schema;
pub mod types;

// Re-export commonly used types at the crate root.
pub use brain::{LlmProvider, MockLlmProvider};
pub use citations::{CitationConfig, CitationReport, LinkStatus, verify_citations};
pub use config::{AppConfig, LlmConfig};
pub use error::{
    CitationError, ConfigError, FlowError, IdeaCheckError, InvocationError, LlmError, Result,
    ValidationError,
};
pub use flows::{
    InvokeOptions, analyze_patent_idea, generate_keywords, generate_patentability_suggestions,
};
pub use form::{FormConfig, FormValidator, FormVariant, IdeaForm};
pub use orchestrator::{CheckOutcome, FailureNotice, Orchestrator, Session, SessionState};
pub use schema::{
    AnalysisInput, AnalysisResult, CitedResource, KeywordsInput, KeywordsOutput,
    PatentabilityAnalysis, SuggestionsInput, SuggestionsOutput,
};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, TokenUsage};
