use crate::crawler::DEFAULT_TRANSIENT_CODES;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Resume-Trawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    pub output: OutputConfig,
}

/// Crawl loop pacing and limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of search-result pages to walk
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Politeness delay between search-result page fetches (milliseconds)
    #[serde(rename = "serp-delay-ms")]
    pub serp_delay_ms: u64,

    /// Politeness delay before each detail fetch (milliseconds)
    #[serde(rename = "detail-delay-ms")]
    pub detail_delay_ms: u64,

    /// Number of detail pages fetched concurrently for one result page
    #[serde(rename = "detail-concurrency")]
    pub detail_concurrency: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 5,
            serp_delay_ms: 3000,
            detail_delay_ms: 1500,
            detail_concurrency: 1,
        }
    }
}

impl CrawlerConfig {
    pub fn serp_delay(&self) -> Duration {
        Duration::from_millis(self.serp_delay_ms)
    }

    pub fn detail_delay(&self) -> Duration {
        Duration::from_millis(self.detail_delay_ms)
    }
}

/// Admission control and transport timeouts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Maximum number of request slots held at once
    #[serde(rename = "max-concurrent-requests")]
    pub max_concurrent_requests: u32,

    /// Lower bound of the pre-flight jitter (milliseconds)
    #[serde(rename = "jitter-min-ms")]
    pub jitter_min_ms: u64,

    /// Upper bound of the pre-flight jitter (milliseconds)
    #[serde(rename = "jitter-max-ms")]
    pub jitter_max_ms: u64,

    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 5,
            jitter_min_ms: 500,
            jitter_max_ms: 1500,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

/// Retry policy for transient transport failures
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempt budget, including the first attempt
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    #[serde(rename = "min-wait-ms")]
    pub min_wait_ms: u64,

    #[serde(rename = "max-wait-ms")]
    pub max_wait_ms: u64,

    /// HTTP status codes treated as transient
    #[serde(rename = "transient-status-codes")]
    pub transient_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_wait_ms: 1000,
            max_wait_ms: 10_000,
            transient_status_codes: DEFAULT_TRANSIENT_CODES.to_vec(),
        }
    }
}

/// Outbound identities
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy URLs; empty means direct connections
    pub proxies: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the newline-delimited JSON candidate store
    pub path: String,
}
