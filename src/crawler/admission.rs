//! Request admission control
//!
//! This module handles:
//! - Bounding the number of in-flight requests via a semaphore
//! - Randomized pre-flight pacing (jitter)
//! - Assembling the identity and headers each request goes out with
//!
//! The bound is process-local; it is the crawler's only backpressure.

use crate::config::HttpConfig;
use crate::crawler::fetcher::{build_http_client, FetchError};
use crate::crawler::headers::random_headers;
use crate::crawler::proxy::{mask_proxy_url, ProxyManager};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Pool size, pacing and timeouts for admitted requests
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    pub max_concurrent: usize,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl AdmissionConfig {
    /// Draws a pre-flight delay uniformly from the jitter range
    pub fn jitter(&self) -> Duration {
        let min = self.jitter_min.as_millis() as u64;
        let max = self.jitter_max.as_millis() as u64;
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(fastrand::u64(min..=max))
    }
}

impl From<&HttpConfig> for AdmissionConfig {
    fn from(config: &HttpConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent_requests.max(1) as usize,
            jitter_min: Duration::from_millis(config.jitter_min_ms),
            jitter_max: Duration::from_millis(config.jitter_max_ms),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// A held request slot
///
/// Carries the concurrency permit, the chosen identity and a client built for
/// that identity with freshly drawn headers. Dropping the lease returns the
/// permit, whatever path the holder exits by.
pub struct RequestLease {
    client: Client,
    identity: Option<String>,
    _permit: OwnedSemaphorePermit,
}

impl RequestLease {
    /// The client configured with this lease's identity and headers
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The proxy URL in use, or `None` for a direct connection
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }
}

/// Hands out request leases, at most `max_concurrent` at a time
pub struct AdmissionController {
    semaphore: Arc<Semaphore>,
    proxies: Arc<ProxyManager>,
    config: AdmissionConfig,
}

impl AdmissionController {
    /// Creates a controller
    ///
    /// Every configured proxy is checked against the transport up front, so a
    /// proxy that cannot be routed through fails here rather than mid-crawl.
    pub fn new(config: AdmissionConfig, proxies: Arc<ProxyManager>) -> Result<Self, FetchError> {
        for identity in proxies.identities() {
            reqwest::Proxy::all(identity.as_str()).map_err(|source| FetchError::InvalidProxy {
                identity: mask_proxy_url(Some(identity)),
                source,
            })?;
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            proxies,
            config,
        })
    }

    /// Waits for a free slot, then prepares a lease
    ///
    /// Jitter is slept only after the permit is held, so queued callers do
    /// not pay for other callers' pacing. If anything after acquisition
    /// fails, the permit is released with the partially built lease.
    pub async fn acquire(&self) -> Result<RequestLease, FetchError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| FetchError::AdmissionClosed)?;

        let jitter = self.config.jitter();
        if !jitter.is_zero() {
            tracing::trace!("Pre-flight jitter {:?}", jitter);
            tokio::time::sleep(jitter).await;
        }

        let identity = self.proxies.next_identity();
        let headers = random_headers();

        let client = build_http_client(&self.config, identity.as_deref(), headers).map_err(
            |source| {
                let masked = mask_proxy_url(identity.as_deref());
                tracing::error!("HTTP client init failed for identity {}", masked);
                FetchError::ClientBuild {
                    identity: masked,
                    source,
                }
            },
        )?;

        tracing::trace!(
            "Lease acquired via {} ({} slots free)",
            mask_proxy_url(identity.as_deref()),
            self.semaphore.available_permits()
        );

        Ok(RequestLease {
            client,
            identity,
            _permit: permit,
        })
    }

    /// Number of slots not currently leased
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }
}
