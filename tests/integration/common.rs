//! Shared fixtures for the integration tests

use resume_trawler::config::{
    Config, CrawlerConfig, HttpConfig, OutputConfig, ProxyConfig, RetryConfig,
};
use resume_trawler::crawler::DEFAULT_TRANSIENT_CODES;
use std::path::Path;

/// Creates a test configuration with no pacing and zero backoff
pub fn test_config(out: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_pages: 5,
            serp_delay_ms: 0,
            detail_delay_ms: 0,
            detail_concurrency: 1,
        },
        http: HttpConfig {
            max_concurrent_requests: 2,
            jitter_min_ms: 0,
            jitter_max_ms: 0,
            connect_timeout_secs: 2,
            request_timeout_secs: 5,
        },
        retry: RetryConfig {
            max_attempts: 3,
            min_wait_ms: 0,
            max_wait_ms: 0,
            transient_status_codes: DEFAULT_TRANSIENT_CODES.to_vec(),
        },
        proxy: ProxyConfig::default(),
        output: OutputConfig {
            path: out.display().to_string(),
        },
    }
}

/// A result page listing `ids`, optionally linking to `next`
pub fn serp_page(ids: &[&str], next: Option<&str>) -> String {
    let cards: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="card"><h2><a href="/resumes/{}/">Candidate {}</a></h2></div>"#,
                id, id
            )
        })
        .collect();

    let pagination = next
        .map(|href| {
            format!(
                r#"<ul class="pagination"><li><a rel="next" href="{}">Наступна</a></li></ul>"#,
                href
            )
        })
        .unwrap_or_default();

    format!(
        r#"<html><body>
            <h1>Знайдено {} резюме</h1>
            <div id="pjax-resume-list">{}</div>
            {}
        </body></html>"#,
        ids.len() * 25,
        cards,
        pagination
    )
}

/// A résumé detail page
pub fn resume_page(id: &str) -> String {
    format!(
        r#"<html><body>
            <h1>Candidate {}</h1>
            <h2 class="title-print">Rust Developer</h2>
            <div id="resume_{}">
                <ul class="list-unstyled my-0 flex flex-wrap">
                    <li><span class="ellipsis">Rust</span></li>
                </ul>
            </div>
        </body></html>"#,
        id, id
    )
}

pub const BAN_PAGE: &str =
    r#"<html><body><div class="cf-error-details"><h1>Access denied</h1></div></body></html>"#;

pub const NOT_FOUND_PAGE: &str =
    r#"<html><body><h1 class="text-center">Резюме не знайдено</h1></body></html>"#;

/// Returns a localhost port with nothing listening on it
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
