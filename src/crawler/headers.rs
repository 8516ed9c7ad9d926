//! Browser-like request header profiles
//!
//! `Accept-Encoding` is left to the HTTP client so compressed bodies are
//! decoded transparently.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};

const BASE_HEADERS: &[(&str, &str)] = &[
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    ),
    ("accept-language", "uk-UA,uk;q=0.9,ru;q=0.8,en-US;q=0.7,en;q=0.6"),
    ("cache-control", "max-age=0"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
];

/// User agents rotated across request slots
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:123.0) Gecko/20100101 Firefox/123.0",
];

const CHROME_CLIENT_HINT: &str =
    "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\"";

/// Builds a header set around a randomly chosen user agent
pub fn random_headers() -> HeaderMap {
    let agent = USER_AGENTS[fastrand::usize(..USER_AGENTS.len())];
    headers_for_agent(agent)
}

/// Builds the header set for a specific user agent
///
/// Client hints are only sent for Chrome agents, matching what a real
/// Chrome browser does.
pub fn headers_for_agent(agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for &(name, value) in BASE_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    if let Ok(value) = HeaderValue::from_str(agent) {
        headers.insert(USER_AGENT, value);
    }

    if agent.contains("Chrome") {
        headers.insert(
            HeaderName::from_static("sec-ch-ua"),
            HeaderValue::from_static(CHROME_CLIENT_HINT),
        );
        headers.insert(
            HeaderName::from_static("sec-ch-ua-mobile"),
            HeaderValue::from_static("?0"),
        );

        let platform = if agent.contains("Macintosh") {
            Some("\"macOS\"")
        } else if agent.contains("Windows") {
            Some("\"Windows\"")
        } else {
            None
        };

        if let Some(platform) = platform {
            headers.insert(
                HeaderName::from_static("sec-ch-ua-platform"),
                HeaderValue::from_static(platform),
            );
        }
    }

    headers
}
