//! Storage traits and error types
//!
//! This module defines the trait interface the crawl coordinator persists
//! through, and the associated error types.

use crate::state::PageType;
use crate::storage::StoredRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("A {page_type} record cannot be stored without a payload")]
    MissingPayload { page_type: PageType },

    #[error("A {page_type} record is not a terminal outcome")]
    NotTerminal { page_type: PageType },
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Append-only, deduplicated persistence of crawl results
///
/// The in-memory index is owned by a single crawl run; implementations are
/// not expected to be shared between concurrent writers.
pub trait CandidateStore {
    /// Returns true if a record with this dedup key was already persisted
    fn exists(&self, key: &str) -> bool;

    /// Persists a record unless its dedup key is already present
    ///
    /// Returns `Ok(true)` if the record was written, `Ok(false)` if it was a
    /// duplicate and silently dropped. A record is durable before this
    /// returns `Ok(true)`.
    fn append(&mut self, record: &StoredRecord) -> StoreResult<bool>;

    /// Number of distinct keys currently indexed
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
