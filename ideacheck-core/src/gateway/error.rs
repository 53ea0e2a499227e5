//! Mapping of library errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::error::{CitationError, FlowError, InvocationError, ValidationError};

const KIND_VALIDATION: &str = "validation";
const KIND_INVOCATION: &str = "model_invocation";
const KIND_TIMEOUT: &str = "timeout";
const KIND_DISABLED: &str = "disabled";
const KIND_INTERNAL: &str = "internal";

#[derive(Debug, Clone, Serialize)]
struct ApiErrorBody {
    error: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flow: Option<&'static str>,
}

/// An error response: a status code and a `{ error, kind, field?, flow? }` body.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorBody {
                error: error.into(),
                kind,
                field: None,
                flow: None,
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn kind(&self) -> &'static str {
        self.body.kind
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let mut api = ApiError::new(StatusCode::BAD_REQUEST, KIND_VALIDATION, err.to_string());
        api.body.field = Some(err.field().to_string());
        api
    }
}

impl From<InvocationError> for ApiError {
    fn from(err: InvocationError) -> Self {
        let (status, kind) = if err.is_timeout() {
            (StatusCode::GATEWAY_TIMEOUT, KIND_TIMEOUT)
        } else {
            (StatusCode::BAD_GATEWAY, KIND_INVOCATION)
        };
        tracing::warn!(flow = err.flow(), error = %err, "Flow invocation failed");
        let mut api = ApiError::new(status, kind, err.to_string());
        api.body.flow = Some(err.flow());
        api
    }
}

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::Validation(e) => e.into(),
            FlowError::Invocation(e) => e.into(),
        }
    }
}

impl From<CitationError> for ApiError {
    fn from(err: CitationError) -> Self {
        match err {
            CitationError::Disabled => {
                ApiError::new(StatusCode::FORBIDDEN, KIND_DISABLED, err.to_string())
            }
            CitationError::Client { .. } => {
                tracing::error!(error = %err, "Citation check unavailable");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    KIND_INTERNAL,
                    err.to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}
