//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients for one identity and header profile
//! - Single-attempt GET requests with structural error classification
//! - Composing admission control, retry and quarantine into one fetch
//!
//! # Request Flow
//!
//! 1. Acquire a lease from the admission controller (permit, jitter, identity)
//! 2. Send GET through the lease's client, retrying transient failures on the
//!    same identity
//! 3. On a permanent transport failure or proxy ban, quarantine the identity
//! 4. Return the response body, or the classified failure
//!
//! The orchestrator never sees a raw transport error: everything that leaves
//! this module is either a response or a [`RequestFailure`].

use crate::config::Config;
use crate::crawler::admission::{AdmissionConfig, AdmissionController};
use crate::crawler::classifier::{
    classify_failure, classify_status, failure_kind, FailureCategory, HttpResponse,
    RequestFailure,
};
use crate::crawler::proxy::ProxyManager;
use crate::crawler::retry::{RetryExecutor, RetryPolicy};
use reqwest::header::HeaderMap;
use reqwest::{redirect::Policy, Client};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by a fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request slot pool closed")]
    AdmissionClosed,

    #[error("Invalid proxy {identity}: {source}")]
    InvalidProxy {
        identity: String,
        source: reqwest::Error,
    },

    #[error("Failed to build HTTP client via {identity}: {source}")]
    ClientBuild {
        identity: String,
        source: reqwest::Error,
    },

    #[error(transparent)]
    Request(#[from] RequestFailure),
}

impl FetchError {
    /// The classified category, if the failure came from the network
    pub fn category(&self) -> Option<FailureCategory> {
        match self {
            Self::Request(failure) => Some(failure.category),
            _ => None,
        }
    }

    /// HTTP status of the last response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request(failure) => failure.status,
            _ => None,
        }
    }
}

/// Anything that can turn a URL into page content
///
/// The crawl coordinator only depends on this trait.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<HttpResponse, FetchError>>;
}

/// Builds an HTTP client for one identity and header profile
///
/// # Arguments
///
/// * `config` - Timeouts to apply
/// * `identity` - Proxy URL, or `None` for a direct connection
/// * `headers` - Default headers, including the user agent
pub fn build_http_client(
    config: &AdmissionConfig,
    identity: Option<&str>,
    headers: HeaderMap,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .default_headers(headers)
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = identity {
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }

    builder.build()
}

/// Performs exactly one GET attempt and classifies the result
///
/// Status codes below 400 are returned as responses whatever the body says;
/// deciding whether a 200 is really a ban page is the page classifier's job.
pub async fn send_once(
    client: &Client,
    url: &str,
    transient_codes: &[u16],
) -> Result<HttpResponse, RequestFailure> {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            let kind = failure_kind(&e);
            return Err(RequestFailure::new(
                classify_failure(kind),
                None,
                format!("{:?} fetching {}: {}", kind, url, e),
            ));
        }
    };

    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let headers = response.headers().clone();

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            let kind = failure_kind(&e);
            return Err(RequestFailure::new(
                classify_failure(kind),
                Some(status),
                format!("{:?} reading body of {}: {}", kind, url, e),
            ));
        }
    };

    if let Some(category) = classify_status(status, transient_codes) {
        return Err(RequestFailure::new(
            category,
            Some(status),
            format!("HTTP {} from {}", status, final_url),
        ));
    }

    Ok(HttpResponse {
        url: final_url,
        status,
        headers,
        body,
    })
}

/// Fetcher backed by reqwest, with admission control, retry and quarantine
pub struct HttpFetcher {
    admission: AdmissionController,
    retry: RetryExecutor,
    proxies: Arc<ProxyManager>,
}

impl HttpFetcher {
    pub fn new(
        admission: AdmissionController,
        retry: RetryExecutor,
        proxies: Arc<ProxyManager>,
    ) -> Self {
        Self {
            admission,
            retry,
            proxies,
        }
    }

    /// Builds a fetcher from configuration around a shared proxy manager
    pub fn from_config(config: &Config, proxies: Arc<ProxyManager>) -> Result<Self, FetchError> {
        let admission =
            AdmissionController::new(AdmissionConfig::from(&config.http), Arc::clone(&proxies))?;
        let retry = RetryExecutor::new(RetryPolicy::from(&config.retry));
        Ok(Self::new(admission, retry, proxies))
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    pub fn proxies(&self) -> &ProxyManager {
        &self.proxies
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<HttpResponse, FetchError> {
        // One lease, and so one identity, for every attempt of this fetch
        let lease = self.admission.acquire().await?;
        let transient_codes = &self.retry.policy().transient_codes;

        let result = self
            .retry
            .execute(|| send_once(lease.client(), url, transient_codes))
            .await;

        match result {
            Ok(response) => {
                tracing::debug!("Fetched {} ({})", url, response.status);
                Ok(response)
            }
            Err(failure) => {
                if failure.category.is_permanent_transport() {
                    if let Some(identity) = lease.identity() {
                        self.proxies.quarantine(identity);
                    }
                }
                Err(failure.into())
            }
        }
    }
}
