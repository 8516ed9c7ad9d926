//! Integration tests for the crawler
//!
//! These tests use wiremock to serve result and detail pages and run the
//! full crawl cycle end-to-end, persisting to a temporary JSONL store.

use crate::common::{resume_page, serp_page, test_config, BAN_PAGE, NOT_FOUND_PAGE};
use resume_trawler::config::Config;
use resume_trawler::crawler::{Coordinator, HttpFetcher, ProxyManager};
use resume_trawler::state::CrawlPhase;
use resume_trawler::storage::{open_store, CandidateStore, JsonlStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_page(server: &MockServer, at: &str, body: impl Into<String>) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.into()))
        .mount(server)
        .await;
}

fn coordinator(config: &Config) -> Coordinator<HttpFetcher, JsonlStore> {
    let fetcher = HttpFetcher::from_config(config, Arc::new(ProxyManager::direct())).unwrap();
    let store = open_store(Path::new(&config.output.path)).unwrap();
    Coordinator::new(config.crawler.clone(), fetcher, store).unwrap()
}

fn store_path(dir: &TempDir) -> PathBuf {
    dir.path().join("candidates.jsonl")
}

fn stored_lines(path: &Path) -> Vec<serde_json::Value> {
    if !path.exists() {
        return Vec::new();
    }
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn test_full_crawl_persists_candidates() {
    let server = MockServer::start().await;

    mount_page(&server, "/resumes-rust/", serp_page(&["101", "102"], Some("/resumes-rust/page-2/"))).await;
    mount_page(&server, "/resumes-rust/page-2/", serp_page(&["103"], None)).await;
    mount_page(&server, "/resumes/101/", resume_page("101")).await;
    mount_page(&server, "/resumes/102/", resume_page("102")).await;
    mount_page(&server, "/resumes/103/", resume_page("103")).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&store_path(&dir));
    let mut coordinator = coordinator(&config);

    let stats = coordinator
        .run(&format!("{}/resumes-rust/", server.uri()))
        .await
        .unwrap();

    assert_eq!(stats.pages_processed, 2);
    assert_eq!(stats.candidates_found, 3);
    assert_eq!(stats.candidates_saved, 3);
    assert!(!stats.critical_stop);
    assert_eq!(coordinator.phase(), CrawlPhase::Idle);

    let lines = stored_lines(&store_path(&dir));
    assert_eq!(lines.len(), 3);
    for line in &lines {
        assert_eq!(line["page_type"], "resume");
        assert_eq!(line["payload"]["title"], "Rust Developer");
        assert_eq!(line["payload"]["skills"][0], "Rust");
    }
}

#[tokio::test]
async fn test_second_run_skips_stored_candidates() {
    let server = MockServer::start().await;

    mount_page(&server, "/resumes-rust/", serp_page(&["201", "202"], None)).await;
    mount_page(&server, "/resumes/201/", resume_page("201")).await;
    mount_page(&server, "/resumes/202/", resume_page("202")).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&store_path(&dir));
    let start = format!("{}/resumes-rust/", server.uri());

    let first = coordinator(&config).run(&start).await.unwrap();
    assert_eq!(first.candidates_saved, 2);

    // A second server that only knows the result page
    let second_server = MockServer::start().await;
    mount_page(&second_server, "/resumes-rust/", serp_page(&["201", "202"], None)).await;

    // A fresh store replays the file and deduplicates before fetching
    let mut coordinator = coordinator(&config);
    assert_eq!(coordinator.store().len(), 2);
    let second = coordinator
        .run(&format!("{}/resumes-rust/", second_server.uri()))
        .await
        .unwrap();

    assert_eq!(second.candidates_found, 2);
    assert_eq!(second.candidates_new, 0);
    assert_eq!(second.candidates_saved, 0);
    assert_eq!(second_server.received_requests().await.unwrap().len(), 1);
    assert_eq!(stored_lines(&store_path(&dir)).len(), 2);
}

#[tokio::test]
async fn test_ban_on_result_page_stops_crawl() {
    let server = MockServer::start().await;
    mount_page(&server, "/resumes-rust/", BAN_PAGE).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&store_path(&dir));
    let mut coordinator = coordinator(&config);

    let stats = coordinator
        .run(&format!("{}/resumes-rust/", server.uri()))
        .await
        .unwrap();

    assert!(stats.critical_stop);
    assert!(stats.stop_reason.as_deref().unwrap().contains("Blocked: ban"));
    assert_eq!(stats.candidates_saved, 0);
    assert_eq!(coordinator.phase(), CrawlPhase::Stopped);
    assert!(stored_lines(&store_path(&dir)).is_empty());
}

#[tokio::test]
async fn test_not_found_detail_is_skipped() {
    let server = MockServer::start().await;

    mount_page(&server, "/resumes-rust/", serp_page(&["301", "302"], None)).await;
    mount_page(&server, "/resumes/301/", NOT_FOUND_PAGE).await;
    mount_page(&server, "/resumes/302/", resume_page("302")).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&store_path(&dir));
    let mut coordinator = coordinator(&config);

    let stats = coordinator
        .run(&format!("{}/resumes-rust/", server.uri()))
        .await
        .unwrap();

    assert_eq!(stats.errors_detail, 0);
    assert!(!stats.critical_stop);
    assert_eq!(stats.candidates_saved, 1);

    let lines = stored_lines(&store_path(&dir));
    let not_found: Vec<_> = lines.iter().filter(|l| l["page_type"] == "not_found").collect();
    assert_eq!(not_found.len(), 1);
    assert!(not_found[0]["payload"].is_null());
}

#[tokio::test]
async fn test_detail_server_errors_are_counted() {
    let server = MockServer::start().await;

    mount_page(&server, "/resumes-rust/", serp_page(&["401", "402"], None)).await;
    Mock::given(method("GET"))
        .and(path("/resumes/401/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_page(&server, "/resumes/402/", resume_page("402")).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&store_path(&dir));
    let mut coordinator = coordinator(&config);

    let stats = coordinator
        .run(&format!("{}/resumes-rust/", server.uri()))
        .await
        .unwrap();

    assert_eq!(stats.errors_detail, 1);
    assert_eq!(stats.candidates_saved, 1);
    assert!(!stats.critical_stop);

    // Three attempts at the failing detail, one at everything else
    assert_eq!(server.received_requests().await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_preview_walks_result_pages_only() {
    let server = MockServer::start().await;

    mount_page(&server, "/resumes-rust/", serp_page(&["501", "502"], Some("/resumes-rust/page-2/"))).await;
    mount_page(&server, "/resumes-rust/page-2/", serp_page(&["503"], None)).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&store_path(&dir));
    let mut coordinator = coordinator(&config);

    let preview = coordinator
        .preview(&format!("{}/resumes-rust/", server.uri()))
        .await
        .unwrap();

    assert_eq!(preview.total_found, 50);
    assert_eq!(
        preview.urls,
        vec![
            format!("{}/resumes/501/", server.uri()),
            format!("{}/resumes/502/", server.uri()),
            format!("{}/resumes/503/", server.uri()),
        ]
    );
    assert_eq!(coordinator.stats().pages_processed, 2);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
    assert!(stored_lines(&store_path(&dir)).is_empty());
}

#[tokio::test]
async fn test_pagination_cycle_guard() {
    let server = MockServer::start().await;
    mount_page(&server, "/resumes-rust/", serp_page(&["601"], Some("/resumes-rust/"))).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&store_path(&dir));
    let mut coordinator = coordinator(&config);

    let preview = coordinator
        .preview(&format!("{}/resumes-rust/", server.uri()))
        .await
        .unwrap();

    assert_eq!(preview.urls.len(), 1);
    assert_eq!(coordinator.stats().pages_processed, 0);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
