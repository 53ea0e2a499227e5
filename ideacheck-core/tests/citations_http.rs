//! Link checks for cited resources against a local mock server.

use ideacheck_core::citations::{CitationConfig, CitationVerifier, LinkStatus};
use ideacheck_core::{CitationError, CitedResource, verify_citations};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn enabled() -> CitationConfig {
    CitationConfig {
        enabled: true,
        timeout_secs: 5,
        max_links: 20,
    }
}

fn resource(title: &str, url: String) -> CitedResource {
    CitedResource {
        title: title.to_string(),
        url,
    }
}

#[tokio::test]
async fn test_head_success_is_reachable() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/patent/US1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let report = verify_citations(
        &enabled(),
        &[resource("US1", format!("{}/patent/US1", server.uri()))],
    )
    .await
    .unwrap();
    assert_eq!(report.total, 1);
    assert!(report.all_reachable());
    assert_eq!(
        report.checks[0].status,
        LinkStatus::Reachable { http_status: 200 }
    );
}

#[tokio::test]
async fn test_head_rejected_falls_back_to_get() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/paper"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/paper"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let verifier = CitationVerifier::new(&enabled()).unwrap();
    let report = verifier
        .verify(&[resource("Paper", format!("{}/paper", server.uri()))])
        .await;
    assert!(report.checks[0].status.is_reachable());
}

#[tokio::test]
async fn test_not_found_is_broken_without_get() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let verifier = CitationVerifier::new(&enabled()).unwrap();
    let report = verifier
        .verify(&[resource("Gone", format!("{}/gone", server.uri()))])
        .await;
    assert_eq!(
        report.checks[0].status,
        LinkStatus::Broken { http_status: 404 }
    );
    assert_eq!(report.reachable, 0);
}

#[tokio::test]
async fn test_links_beyond_limit_are_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = CitationConfig {
        max_links: 1,
        ..enabled()
    };
    let verifier = CitationVerifier::new(&config).unwrap();
    let report = verifier
        .verify(&[
            resource("First", format!("{}/a", server.uri())),
            resource("Second", format!("{}/b", server.uri())),
        ])
        .await;
    assert_eq!(report.total, 2);
    assert_eq!(report.reachable, 1);
    assert_eq!(report.checks[0].title, "First");
    assert_eq!(report.checks[1].status, LinkStatus::Skipped);
}

#[tokio::test]
async fn test_disabled_makes_no_requests() {
    let err = verify_citations(
        &CitationConfig::default(),
        &[resource("x", "https://example.com".to_string())],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CitationError::Disabled));
}
