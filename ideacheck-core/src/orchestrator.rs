//! The calling layer around the flows.
//!
//! [`Orchestrator`] enforces form preconditions, sequences optional keyword
//! generation before analysis and bounds each model call with the configured
//! timeout. It holds no per-request state and is shared by concurrent HTTP
//! handlers. [`Session`] adds the single-user interaction state on top:
//! one pending action at a time, observable through a `watch` channel.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::brain::LlmProvider;
use crate::config::AppConfig;
use crate::error::{FlowError, InvocationError, LlmError};
use crate::flows::{
    AnalyzePatentIdea, Flow, GenerateKeywords, GeneratePatentabilitySuggestions, InvokeOptions,
    analyze_patent_idea, generate_keywords, generate_patentability_suggestions,
};
use crate::form::{FormValidator, FormVariant, IdeaForm};
use crate::providers::create_provider;
use crate::report::analysis_to_text;
use crate::schema::{AnalysisResult, KeywordsOutput, SuggestionsOutput};

/// Result of the full check: the keywords the analysis used, if any, and the analysis.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub keywords: Option<String>,
    pub result: AnalysisResult,
}

#[derive(Clone)]
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    validator: FormValidator,
    options: InvokeOptions,
    timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &AppConfig) -> Self {
        Self {
            provider,
            validator: FormValidator::new(config.form.clone()),
            options: InvokeOptions::from(&config.llm),
            timeout: config.flows.timeout(),
        }
    }

    /// Build the provider named in `config.llm` and wrap it.
    pub fn from_config(config: &AppConfig) -> Result<Self, LlmError> {
        let provider = create_provider(&config.llm)?;
        Ok(Self::new(provider, config))
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn validator(&self) -> &FormValidator {
        &self.validator
    }

    /// The "Generate Keywords" action. Requires an idea of at least the minimum length.
    pub async fn generate_keywords(&self, idea: &str) -> Result<KeywordsOutput, FlowError> {
        self.validator.validate_keyword_request(idea)?;
        self.timed(
            GenerateKeywords::NAME,
            generate_keywords(self.provider.as_ref(), &self.options, idea),
        )
        .await
    }

    /// Submit a form. The quick check analyzes without keywords.
    pub async fn analyze(
        &self,
        variant: FormVariant,
        form: &IdeaForm,
    ) -> Result<AnalysisResult, FlowError> {
        self.validator.validate_submission(variant, form)?;
        let keywords = match variant {
            FormVariant::KeywordForm => form.keywords.as_deref(),
            FormVariant::QuickCheck => None,
        };
        self.timed(
            AnalyzePatentIdea::NAME,
            analyze_patent_idea(
                self.provider.as_ref(),
                &self.options,
                &form.idea_description,
                keywords,
            ),
        )
        .await
    }

    /// Analyze an idea, generating keywords first when none were supplied and
    /// `auto_keywords` is set. The analysis starts only after the keywords are in hand.
    pub async fn check(
        &self,
        form: &IdeaForm,
        auto_keywords: bool,
    ) -> Result<CheckOutcome, FlowError> {
        self.validator.validate_idea(&form.idea_description)?;
        let supplied = form
            .keywords
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());
        if supplied.is_some() {
            self.validator.validate_keywords(supplied)?;
        }

        let keywords = match supplied {
            Some(k) => Some(k.to_string()),
            None if auto_keywords => {
                let generated = self
                    .timed(
                        GenerateKeywords::NAME,
                        generate_keywords(
                            self.provider.as_ref(),
                            &self.options,
                            &form.idea_description,
                        ),
                    )
                    .await?;
                Some(generated.keywords)
            }
            None => None,
        };

        let result = self
            .timed(
                AnalyzePatentIdea::NAME,
                analyze_patent_idea(
                    self.provider.as_ref(),
                    &self.options,
                    &form.idea_description,
                    keywords.as_deref(),
                ),
            )
            .await?;
        Ok(CheckOutcome { keywords, result })
    }

    /// Run the suggestion flow on free-text analysis results.
    pub async fn suggest(
        &self,
        idea: &str,
        analysis_results: &str,
        keywords: &str,
    ) -> Result<SuggestionsOutput, FlowError> {
        self.timed(
            GeneratePatentabilitySuggestions::NAME,
            generate_patentability_suggestions(
                self.provider.as_ref(),
                &self.options,
                idea,
                analysis_results,
                keywords,
            ),
        )
        .await
    }

    /// Refine the suggestions of a finished analysis.
    pub async fn refine(
        &self,
        idea: &str,
        result: &AnalysisResult,
        keywords: &str,
    ) -> Result<SuggestionsOutput, FlowError> {
        self.suggest(idea, &analysis_to_text(result), keywords).await
    }

    async fn timed<T, Fut>(&self, flow: &'static str, fut: Fut) -> Result<T, FlowError>
    where
        Fut: Future<Output = Result<T, FlowError>>,
    {
        let Some(limit) = self.timeout else {
            return fut.await;
        };
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(flow, timeout_secs = limit.as_secs(), "Flow timed out");
                Err(InvocationError::Timeout {
                    flow,
                    timeout_secs: limit.as_secs(),
                }
                .into())
            }
        }
    }
}

/// Where the interaction stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    GeneratingKeywords,
    Analyzing,
    Ready,
    Failed,
}

impl SessionState {
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            SessionState::GeneratingKeywords | SessionState::Analyzing
        )
    }
}

/// User-facing notice for a failed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FailureNotice {
    pub title: &'static str,
    pub description: &'static str,
}

impl FailureNotice {
    pub const KEYWORDS: FailureNotice = FailureNotice {
        title: "Keyword Generation Failed",
        description: "There was an error generating keywords. Please try again.",
    };

    pub const ANALYSIS: FailureNotice = FailureNotice {
        title: "Analysis Failed",
        description: "There was an error analyzing your idea. Please try again.",
    };
}

impl std::fmt::Display for FailureNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

/// A single user's interaction with the form.
///
/// Form validation failures leave the state untouched. Invocation failures
/// move it to `Failed` and record a notice; they never leave a pending state behind.
pub struct Session {
    id: Uuid,
    orchestrator: Orchestrator,
    state_tx: watch::Sender<SessionState>,
    keywords: Option<String>,
    result: Option<AnalysisResult>,
    notice: Option<FailureNotice>,
}

impl Session {
    pub fn new(orchestrator: Orchestrator) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            id: Uuid::new_v4(),
            orchestrator,
            state_tx,
            keywords: None,
            result: None,
            notice: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Observe state transitions, including the pending ones.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn keywords(&self) -> Option<&str> {
        self.keywords.as_deref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn notice(&self) -> Option<FailureNotice> {
        self.notice
    }

    /// Generate keywords and fill them into the session. A prior result is kept.
    pub async fn generate_keywords(&mut self, idea: &str) -> Result<&str, FlowError> {
        self.orchestrator.validator().validate_keyword_request(idea)?;
        self.set_state(SessionState::GeneratingKeywords);
        self.notice = None;

        match self.orchestrator.generate_keywords(idea).await {
            Ok(out) => {
                let settled = if self.result.is_some() {
                    SessionState::Ready
                } else {
                    SessionState::Idle
                };
                self.set_state(settled);
                Ok(self.keywords.insert(out.keywords).as_str())
            }
            Err(e) => {
                self.fail(FailureNotice::KEYWORDS);
                Err(e)
            }
        }
    }

    /// Submit the form. The previous result is discarded as soon as the analysis starts.
    pub async fn submit(
        &mut self,
        variant: FormVariant,
        form: &IdeaForm,
    ) -> Result<&AnalysisResult, FlowError> {
        self.orchestrator.validator().validate_submission(variant, form)?;
        self.set_state(SessionState::Analyzing);
        self.result = None;
        self.notice = None;

        match self.orchestrator.analyze(variant, form).await {
            Ok(result) => {
                info!(
                    session = %self.id,
                    patentable = result.patentability_analysis.is_patentable,
                    "Analysis ready"
                );
                self.set_state(SessionState::Ready);
                Ok(self.result.insert(result))
            }
            Err(e) => {
                self.fail(FailureNotice::ANALYSIS);
                Err(e)
            }
        }
    }

    /// Discard keywords, result and notice.
    pub fn clear(&mut self) {
        self.keywords = None;
        self.result = None;
        self.notice = None;
        self.set_state(SessionState::Idle);
    }

    fn fail(&mut self, notice: FailureNotice) {
        warn!(session = %self.id, title = notice.title, "Action failed");
        self.notice = Some(notice);
        self.set_state(SessionState::Failed);
    }

    fn set_state(&self, state: SessionState) {
        self.state_tx.send_replace(state);
    }
}
