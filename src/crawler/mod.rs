//! Crawler module for fetching, classifying and orchestrating pages
//!
//! This module contains the core crawling logic, including:
//! - Transport error classification and bounded retry
//! - Proxy identity selection and quarantine
//! - Request admission control with pacing and header profiles
//! - HTML page classification and field extraction
//! - Overall crawl coordination

mod admission;
mod classifier;
mod coordinator;
mod fetcher;
mod headers;
mod parser;
mod proxy;
mod retry;

pub use admission::{AdmissionConfig, AdmissionController, RequestLease};
pub use classifier::{
    classify, classify_failure, classify_status, failure_kind, FailureCategory, HttpResponse,
    RequestFailure, RequestOutcome, TransportFailureKind, DEFAULT_TRANSIENT_CODES,
};
pub use coordinator::{Coordinator, CrawlMode, PreviewResult, INTERRUPTED};
pub use fetcher::{build_http_client, send_once, FetchError, Fetcher, HttpFetcher};
pub use headers::{headers_for_agent, random_headers, USER_AGENTS};
pub use parser::{CandidateLink, ParserError, ResumeDetail, SerpPage, SiteParser};
pub use proxy::{mask_proxy_url, ProxyManager};
pub use retry::{RetryExecutor, RetryPolicy};
