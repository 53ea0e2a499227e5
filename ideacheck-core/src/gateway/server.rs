//! HTTP gateway server built on axum.

use super::GatewayConfig;
use super::error::ApiError;
use crate::citations::{CitationConfig, CitationReport, verify_citations};
use crate::error::ValidationError;
use crate::form::IdeaForm;
use crate::orchestrator::{CheckOutcome, Orchestrator};
use crate::schema::{
    AnalysisInput, AnalysisResult, CitedResource, KeywordsInput, KeywordsOutput,
    SuggestionsInput, SuggestionsOutput, Validate, parse_input, require_text,
};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Thread-safe shared gateway reference for axum handlers.
pub type SharedGateway = Arc<GatewayServer>;

/// State behind every route. Immutable once built.
pub struct GatewayServer {
    config: GatewayConfig,
    orchestrator: Orchestrator,
    citations: CitationConfig,
    started_at: chrono::DateTime<Utc>,
}

impl std::fmt::Debug for GatewayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayServer")
            .field("config", &self.config)
            .field("provider", &self.orchestrator.provider().provider_name())
            .field("model", &self.orchestrator.provider().model_name())
            .finish()
    }
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, orchestrator: Orchestrator, citations: CitationConfig) -> Self {
        Self {
            config,
            orchestrator,
            citations,
            started_at: Utc::now(),
        }
    }

    pub fn shared(self) -> SharedGateway {
        Arc::new(self)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Seconds since the server was created.
    pub fn uptime_secs(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckRequest {
    idea_description: String,
    #[serde(default)]
    keywords: Option<String>,
    #[serde(default)]
    auto_keywords: bool,
}

impl Validate for CheckRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("ideaDescription", &self.idea_description)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest {
    cited_resources: Vec<CitedResource>,
}

impl Validate for VerifyRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Build the axum Router with the health and flow routes.
pub fn router(shared: SharedGateway) -> Router {
    let cors = if shared.config.cors_permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/keywords", post(keywords_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/api/suggestions", post(suggestions_handler))
        .route("/api/check", post(check_handler))
        .route("/api/citations/verify", post(verify_handler))
        .with_state(shared)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Decode a request body into a validated input, with uniform 400 responses.
fn decode<T>(payload: Result<Json<Value>, JsonRejection>) -> Result<T, ApiError>
where
    T: DeserializeOwned + Validate,
{
    let Json(raw) = payload.map_err(|rejection| ValidationError::InvalidType {
        field: "$".to_string(),
        reason: rejection.body_text(),
    })?;
    Ok(parse_input(&raw)?)
}

/// Health check endpoint.
async fn health_handler(State(gw): State<SharedGateway>) -> impl IntoResponse {
    let provider = gw.orchestrator.provider();
    Json(serde_json::json!({
        "status": "ok",
        "uptime_secs": gw.uptime_secs(),
        "model": provider.model_name(),
        "provider": provider.provider_name(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn keywords_handler(
    State(gw): State<SharedGateway>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<KeywordsOutput>, ApiError> {
    let input: KeywordsInput = decode(payload)?;
    let output = gw
        .orchestrator
        .generate_keywords(&input.idea_description)
        .await?;
    Ok(Json(output))
}

async fn analyze_handler(
    State(gw): State<SharedGateway>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let input: AnalysisInput = decode(payload)?;
    let form = IdeaForm {
        idea_description: input.idea_description,
        keywords: input.keywords,
    };
    let outcome = gw.orchestrator.check(&form, false).await?;
    Ok(Json(outcome.result))
}

async fn suggestions_handler(
    State(gw): State<SharedGateway>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SuggestionsOutput>, ApiError> {
    let input: SuggestionsInput = decode(payload)?;
    let output = gw
        .orchestrator
        .suggest(
            &input.idea_description,
            &input.analysis_results,
            &input.keywords,
        )
        .await?;
    Ok(Json(output))
}

async fn check_handler(
    State(gw): State<SharedGateway>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CheckOutcome>, ApiError> {
    let request: CheckRequest = decode(payload)?;
    let form = IdeaForm {
        idea_description: request.idea_description,
        keywords: request.keywords,
    };
    let outcome = gw.orchestrator.check(&form, request.auto_keywords).await?;
    Ok(Json(outcome))
}

async fn verify_handler(
    State(gw): State<SharedGateway>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CitationReport>, ApiError> {
    if !gw.citations.enabled {
        return Err(crate::error::CitationError::Disabled.into());
    }
    let request: VerifyRequest = decode(payload)?;
    let report = verify_citations(&gw.citations, &request.cited_resources).await?;
    Ok(Json(report))
}

/// Start the gateway server on the configured address.
///
/// Runs until Ctrl-C.
pub async fn run(gw: SharedGateway) -> Result<(), std::io::Error> {
    let addr = gw.config().bind_addr();
    let app = router(gw);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down gateway");
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use crate::config::AppConfig;
    use axum::body::Body;
    use tower::ServiceExt;

    fn make_shared_gateway(provider: Arc<MockLlmProvider>) -> SharedGateway {
        let config = AppConfig::default();
        GatewayServer::new(
            config.server.clone(),
            Orchestrator::new(provider, &config),
            config.citations.clone(),
        )
        .shared()
    }

    #[test]
    fn test_router_builds() {
        let gw = make_shared_gateway(Arc::new(MockLlmProvider::new()));
        let _app = router(gw);
    }

    #[test]
    fn test_uptime_starts_at_zero() {
        let gw = make_shared_gateway(Arc::new(MockLlmProvider::new()));
        assert!(gw.uptime_secs() < 5);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let gw = make_shared_gateway(Arc::new(MockLlmProvider::new()));
        let app = router(gw);

        let req = axum::http::Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let resp = ServiceExt::<axum::http::Request<Body>>::oneshot(app, req)
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let body = axum::body::to_bytes(resp.into_body(), 10_000)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["provider"], "mock");
        assert_eq!(json["model"], "mock-model");
    }

    #[tokio::test]
    async fn test_malformed_body_is_validation_error() {
        let gw = make_shared_gateway(Arc::new(MockLlmProvider::new()));
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/api/keywords")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = ServiceExt::<axum::http::Request<Body>>::oneshot(router(gw), req)
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body = axum::body::to_bytes(resp.into_body(), 10_000)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["kind"], "validation");
        assert_eq!(json["field"], "$");
    }
}
