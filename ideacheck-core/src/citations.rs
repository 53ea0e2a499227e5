//! Opt-in link check for cited resources.
//!
//! The analysis flow only asks the model for matching titles and working
//! URLs. This module checks that each URL resolves and produces a separate
//! report; it never edits, filters or reorders an analysis result.

use crate::error::CitationError;
use crate::schema::CitedResource;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Configuration for citation link checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationConfig {
    /// Off unless explicitly enabled.
    pub enabled: bool,
    /// Per-link request timeout.
    pub timeout_secs: u64,
    /// Links beyond this count are reported as skipped.
    pub max_links: usize,
}

impl Default for CitationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_secs: 10,
            max_links: 20,
        }
    }
}

/// Outcome of checking a single URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LinkStatus {
    Reachable { http_status: u16 },
    Broken { http_status: u16 },
    Unreachable { reason: String },
    InvalidUrl { reason: String },
    Skipped,
}

impl LinkStatus {
    pub fn is_reachable(&self) -> bool {
        matches!(self, LinkStatus::Reachable { .. })
    }

    /// Short label for terminal output.
    pub fn label(&self) -> String {
        match self {
            LinkStatus::Reachable { http_status } => format!("ok ({http_status})"),
            LinkStatus::Broken { http_status } => format!("broken ({http_status})"),
            LinkStatus::Unreachable { reason } => format!("unreachable: {reason}"),
            LinkStatus::InvalidUrl { reason } => format!("invalid url: {reason}"),
            LinkStatus::Skipped => "skipped".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationCheck {
    pub title: String,
    pub url: String,
    #[serde(flatten)]
    pub status: LinkStatus,
}

/// Link check results, in the same order as the cited resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationReport {
    pub checks: Vec<CitationCheck>,
    pub reachable: usize,
    pub total: usize,
}

impl CitationReport {
    pub fn all_reachable(&self) -> bool {
        self.reachable == self.total
    }
}

/// Checks cited URLs with HEAD, falling back to GET for servers that reject HEAD.
pub struct CitationVerifier {
    client: Client,
    max_links: usize,
}

impl CitationVerifier {
    pub fn new(config: &CitationConfig) -> Result<Self, CitationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
            .user_agent(concat!("ideacheck/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| CitationError::Client {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            max_links: config.max_links,
        })
    }

    /// Check every resource and report in input order.
    pub async fn verify(&self, resources: &[CitedResource]) -> CitationReport {
        let checks = join_all(resources.iter().enumerate().map(|(i, resource)| async move {
            let status = if i < self.max_links {
                self.check_url(&resource.url).await
            } else {
                LinkStatus::Skipped
            };
            CitationCheck {
                title: resource.title.clone(),
                url: resource.url.clone(),
                status,
            }
        }))
        .await;

        let reachable = checks.iter().filter(|c| c.status.is_reachable()).count();
        CitationReport {
            total: checks.len(),
            reachable,
            checks,
        }
    }

    async fn check_url(&self, raw: &str) -> LinkStatus {
        let url = match parse_http_url(raw) {
            Ok(url) => url,
            Err(reason) => return LinkStatus::InvalidUrl { reason },
        };

        match self.client.head(url.clone()).send().await {
            Ok(resp) if resp.status().is_success() => {
                return LinkStatus::Reachable {
                    http_status: resp.status().as_u16(),
                };
            }
            Ok(resp) if is_definitely_missing(resp.status()) => {
                return LinkStatus::Broken {
                    http_status: resp.status().as_u16(),
                };
            }
            Ok(resp) => debug!(url = %url, status = %resp.status(), "HEAD rejected, retrying with GET"),
            Err(e) => debug!(url = %url, error = %e, "HEAD failed, retrying with GET"),
        }

        match self.client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => LinkStatus::Reachable {
                http_status: resp.status().as_u16(),
            },
            Ok(resp) => LinkStatus::Broken {
                http_status: resp.status().as_u16(),
            },
            Err(e) => LinkStatus::Unreachable {
                reason: e.without_url().to_string(),
            },
        }
    }
}

/// Check the cited resources of an analysis, if enabled in `config`.
pub async fn verify_citations(
    config: &CitationConfig,
    resources: &[CitedResource],
) -> Result<CitationReport, CitationError> {
    if !config.enabled {
        return Err(CitationError::Disabled);
    }
    let verifier = CitationVerifier::new(config)?;
    Ok(verifier.verify(resources).await)
}

fn is_definitely_missing(status: StatusCode) -> bool {
    status == StatusCode::NOT_FOUND || status == StatusCode::GONE
}

fn parse_http_url(raw: &str) -> Result<url::Url, String> {
    let url = url::Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}
