//! Transport error classification
//!
//! Maps the raw outcome of one network attempt to a [`FailureCategory`]. Only
//! structural signals are used (status code, failure kind); error message
//! text is never inspected.
//!
//! | Outcome | Category |
//! |---------|----------|
//! | HTTP 403 | `ProxyBan` |
//! | HTTP 401 | `Auth` |
//! | HTTP 400 | `Domain` |
//! | HTTP status in the transient set | `Transient` |
//! | Any other HTTP error status | `Domain` |
//! | Timeout | `Transient` |
//! | Connection refused / proxy unreachable | `PermanentTransport` |
//! | Other transport error | `Transient` |

use reqwest::header::HeaderMap;
use std::fmt;
use thiserror::Error;

/// Status codes treated as transient when none are configured
pub const DEFAULT_TRANSIENT_CODES: &[u16] = &[429, 500, 502, 503, 504];

/// How a network attempt failed before producing a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailureKind {
    /// The attempt ran out of time
    Timeout,
    /// The connection (or the proxy) could not be established
    Connect,
    /// Anything else below HTTP: resets, malformed frames, body read errors
    Protocol,
}

/// A response received from the server
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Final URL after redirects
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Decoded response body
    pub body: String,
}

/// Result of one network attempt; never persisted
#[derive(Debug, Clone)]
pub enum RequestOutcome {
    Response(HttpResponse),
    Failure(TransportFailureKind),
}

/// Why an attempt did not yield a usable page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    /// Worth retrying with the same identity
    Transient,
    /// The identity is dead; the caller must rotate it
    PermanentTransport,
    /// Strong sign the identity's address is blocked
    ProxyBan,
    /// A well-formed negative answer such as not-found or bad-request
    Domain,
    /// Login required
    Auth,
}

impl FailureCategory {
    /// Returns true if the executor should try again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Returns true if the identity used for the attempt should be rotated
    pub fn is_permanent_transport(&self) -> bool {
        matches!(self, Self::PermanentTransport | Self::ProxyBan)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::PermanentTransport => "permanent_transport",
            Self::ProxyBan => "proxy_ban",
            Self::Domain => "domain",
            Self::Auth => "auth",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified failure of one or more attempts
#[derive(Debug, Clone, Error)]
#[error("{category} failure after {attempts} attempt(s): {message}")]
pub struct RequestFailure {
    pub category: FailureCategory,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    pub message: String,
    /// Attempts made before giving up; set by the retry executor
    pub attempts: u32,
}

impl RequestFailure {
    pub fn new(category: FailureCategory, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            category,
            status,
            message: message.into(),
            attempts: 1,
        }
    }
}

/// Classifies the outcome of one network attempt
///
/// Returns `None` for a usable response (status below 400). Every other
/// outcome maps to exactly one category.
pub fn classify(outcome: &RequestOutcome, transient_codes: &[u16]) -> Option<FailureCategory> {
    match outcome {
        RequestOutcome::Response(response) => classify_status(response.status, transient_codes),
        RequestOutcome::Failure(kind) => Some(classify_failure(*kind)),
    }
}

/// Classifies an HTTP status code
pub fn classify_status(status: u16, transient_codes: &[u16]) -> Option<FailureCategory> {
    if status < 400 {
        return None;
    }

    let category = match status {
        403 => FailureCategory::ProxyBan,
        401 => FailureCategory::Auth,
        400 => FailureCategory::Domain,
        s if transient_codes.contains(&s) => FailureCategory::Transient,
        _ => FailureCategory::Domain,
    };

    Some(category)
}

/// Classifies a transport-level failure
///
/// A slow proxy may still be alive, so timeouts are transient; a refused
/// connection will not recover within the retry window.
pub fn classify_failure(kind: TransportFailureKind) -> FailureCategory {
    match kind {
        TransportFailureKind::Timeout => FailureCategory::Transient,
        TransportFailureKind::Connect => FailureCategory::PermanentTransport,
        TransportFailureKind::Protocol => FailureCategory::Transient,
    }
}

/// Maps a reqwest error to a failure kind using its structural flags
pub fn failure_kind(error: &reqwest::Error) -> TransportFailureKind {
    if error.is_timeout() {
        TransportFailureKind::Timeout
    } else if error.is_connect() {
        TransportFailureKind::Connect
    } else {
        TransportFailureKind::Protocol
    }
}
