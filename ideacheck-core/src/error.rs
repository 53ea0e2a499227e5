//! Error types for the IdeaCheck core.
//!
//! Uses `thiserror` for public API error types. The two errors a flow can
//! settle with are [`ValidationError`] (raised before any model call) and
//! [`InvocationError`] (the model call failed or its reply broke the output
//! contract). [`FlowError`] is the union returned by every operation.

use std::path::PathBuf;

/// Top-level error type for the IdeaCheck core library.
#[derive(Debug, thiserror::Error)]
pub enum IdeaCheckError {
    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Citation check error: {0}")]
    Citation(#[from] CitationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from LLM provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Model not supported: {model}")]
    UnsupportedModel { model: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Input rejected at a schema or form boundary, before any model call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidType { field: String, reason: String },

    #[error("Field '{field}' must not be empty")]
    Empty { field: String },

    #[error("{message}")]
    TooShort {
        field: String,
        min: usize,
        actual: usize,
        message: String,
    },

    #[error("{message}")]
    TooLong {
        field: String,
        max: usize,
        actual: usize,
        message: String,
    },
}

impl ValidationError {
    /// The wire name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::InvalidType { field, .. }
            | ValidationError::Empty { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. } => field,
        }
    }
}

/// The model invocation failed or its reply did not honor the output contract.
///
/// Callers treat every variant the same way: surface it, reset any pending
/// indicator, never fall back to a partial result.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("{flow}: provider call failed: {source}")]
    Provider {
        flow: &'static str,
        #[source]
        source: LlmError,
    },

    #[error("{flow}: model reply is not valid JSON: {message}")]
    MalformedOutput { flow: &'static str, message: String },

    #[error("{flow}: model reply violates the output schema: {}", .errors.join("; "))]
    SchemaViolation {
        flow: &'static str,
        errors: Vec<String>,
    },

    #[error("{flow}: no reply within {timeout_secs}s")]
    Timeout { flow: &'static str, timeout_secs: u64 },
}

impl InvocationError {
    /// Name of the flow whose invocation failed.
    pub fn flow(&self) -> &'static str {
        match self {
            InvocationError::Provider { flow, .. }
            | InvocationError::MalformedOutput { flow, .. }
            | InvocationError::SchemaViolation { flow, .. }
            | InvocationError::Timeout { flow, .. } => flow,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, InvocationError::Timeout { .. })
    }
}

/// Error returned by every flow operation.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Model invocation error: {0}")]
    Invocation(#[from] InvocationError),
}

impl FlowError {
    pub fn is_validation(&self) -> bool {
        matches!(self, FlowError::Validation(_))
    }

    pub fn is_invocation(&self) -> bool {
        matches!(self, FlowError::Invocation(_))
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Environment variable not set: {var}")]
    EnvVarMissing { var: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Errors from the opt-in citation link check.
#[derive(Debug, thiserror::Error)]
pub enum CitationError {
    #[error("Citation verification is disabled")]
    Disabled,

    #[error("Failed to build HTTP client: {message}")]
    Client { message: String },
}

/// A type alias for results using the top-level `IdeaCheckError`.
pub type Result<T> = std::result::Result<T, IdeaCheckError>;
