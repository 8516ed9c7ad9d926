//! Integration tests for the HTTP fetcher
//!
//! Verifies retry counts and identity quarantine against a real server.

use crate::common::{closed_port, test_config};
use resume_trawler::crawler::{FailureCategory, FetchError, Fetcher, HttpFetcher, ProxyManager};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn direct_fetcher(dir: &TempDir, max_attempts: u32) -> HttpFetcher {
    let mut config = test_config(&dir.path().join("out.jsonl"));
    config.retry.max_attempts = max_attempts;
    HttpFetcher::from_config(&config, Arc::new(ProxyManager::direct())).unwrap()
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

#[tokio::test]
async fn test_transient_statuses_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = direct_fetcher(&dir, 3);

    let response = fetcher.fetch(&format!("{}/page", server.uri())).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "<html>ok</html>");
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_transient_exhaustion_returns_last_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = direct_fetcher(&dir, 3);

    let err = fetcher.fetch(&format!("{}/page", server.uri())).await.unwrap_err();
    match err {
        FetchError::Request(failure) => {
            assert_eq!(failure.category, FailureCategory::Transient);
            assert_eq!(failure.status, Some(502));
            assert_eq!(failure.attempts, 3);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_forbidden_is_never_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = direct_fetcher(&dir, 5);

    let err = fetcher.fetch(&format!("{}/page", server.uri())).await.unwrap_err();
    assert_eq!(err.category(), Some(FailureCategory::ProxyBan));
    assert_eq!(err.status(), Some(403));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_not_found_status_is_domain_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = direct_fetcher(&dir, 3);

    let err = fetcher.fetch(&format!("{}/resumes/1/", server.uri())).await.unwrap_err();
    assert_eq!(err.category(), Some(FailureCategory::Domain));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_block_page_with_ok_status_is_a_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(crate::common::BAN_PAGE))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = direct_fetcher(&dir, 3);

    // Status 200 is a usable response; spotting the block is the parser's job
    let response = fetcher.fetch(&server.uri()).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_connection_refused_fails_fast() {
    let dir = TempDir::new().unwrap();
    let fetcher = direct_fetcher(&dir, 5);

    let err = fetcher
        .fetch(&format!("http://127.0.0.1:{}/", closed_port()))
        .await
        .unwrap_err();

    match err {
        FetchError::Request(failure) => {
            assert_eq!(failure.category, FailureCategory::PermanentTransport);
            assert_eq!(failure.attempts, 1);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_dead_proxy_is_quarantined() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("out.jsonl"));

    let dead = format!("http://127.0.0.1:{}", closed_port());
    let proxies = Arc::new(ProxyManager::new(vec![dead]));
    let fetcher = HttpFetcher::from_config(&config, Arc::clone(&proxies)).unwrap();

    let err = fetcher.fetch("http://example.invalid/").await.unwrap_err();
    assert_eq!(err.category(), Some(FailureCategory::PermanentTransport));
    assert_eq!(proxies.quarantined_count(), 1);
}

#[tokio::test]
async fn test_admission_slots_are_released() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = direct_fetcher(&dir, 1);

    for _ in 0..4 {
        assert!(fetcher.fetch(&server.uri()).await.is_err());
    }
    assert_eq!(fetcher.admission().available_slots(), 2);
}
