//! Storage module for persisting crawl results
//!
//! This module handles the durable candidate store, including:
//! - The record type written for every persisted outcome
//! - Dedup key derivation
//! - The append-only JSONL backend and its crash recovery

mod jsonl;
mod traits;

pub use jsonl::{JsonlStore, LoadReport};
pub use traits::{CandidateStore, StoreError, StoreResult};

use crate::crawler::ResumeDetail;
use crate::state::PageType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of the fallback dedup key used when no résumé id is known
pub const URL_KEY_PREFIX: &str = "url:";

/// Opens (or creates) the store file, replaying any existing records
pub fn open_store(path: &Path) -> StoreResult<JsonlStore> {
    JsonlStore::open(path)
}

/// Builds the fallback dedup key for a URL
pub fn url_key(url: &str) -> String {
    format!("{}{}", URL_KEY_PREFIX, url)
}

/// One persisted crawl result, written as a single JSON line
///
/// Only two shapes can be constructed: a résumé with its payload, or a
/// terminal outcome (not found, blocked, unknown) with no payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    url: String,
    page_type: PageType,
    parsed_at: DateTime<Utc>,
    payload: Option<ResumeDetail>,
}

impl StoredRecord {
    /// A successfully parsed résumé
    ///
    /// The record's URL is the résumé's canonical URL.
    pub fn resume(detail: ResumeDetail) -> Self {
        Self {
            url: detail.url.clone(),
            page_type: PageType::Resume,
            parsed_at: Utc::now(),
            payload: Some(detail),
        }
    }

    /// A terminal outcome for `url` that carries no content
    pub fn terminal(url: impl Into<String>, page_type: PageType) -> StoreResult<Self> {
        if page_type.is_content() {
            return Err(match page_type {
                PageType::Resume => StoreError::MissingPayload { page_type },
                _ => StoreError::NotTerminal { page_type },
            });
        }

        Ok(Self {
            url: url.into(),
            page_type,
            parsed_at: Utc::now(),
            payload: None,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn page_type(&self) -> PageType {
        self.page_type
    }

    pub fn parsed_at(&self) -> DateTime<Utc> {
        self.parsed_at
    }

    pub fn payload(&self) -> Option<&ResumeDetail> {
        self.payload.as_ref()
    }

    /// The key this record is deduplicated under
    ///
    /// The résumé id when there is one, otherwise `url:<url>`.
    pub fn dedup_key(&self) -> String {
        match &self.payload {
            Some(detail) if !detail.resume_id.is_empty() => detail.resume_id.clone(),
            _ => url_key(&self.url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(id: &str) -> ResumeDetail {
        ResumeDetail {
            resume_id: id.to_string(),
            url: format!("https://www.work.ua/resumes/{}/", id),
            name: Some("Name".to_string()),
            title: None,
            skills: vec![],
            has_hidden_contacts: false,
        }
    }

    #[test]
    fn test_resume_record_keyed_by_id() {
        let record = StoredRecord::resume(detail("42"));
        assert_eq!(record.dedup_key(), "42");
        assert_eq!(record.page_type(), PageType::Resume);
        assert_eq!(record.url(), "https://www.work.ua/resumes/42/");
    }

    #[test]
    fn test_terminal_record_keyed_by_url() {
        let record = StoredRecord::terminal("https://x/resumes/1/", PageType::NotFound).unwrap();
        assert_eq!(record.dedup_key(), "url:https://x/resumes/1/");
        assert!(record.payload().is_none());
    }

    #[test]
    fn test_content_types_cannot_be_terminal() {
        assert!(matches!(
            StoredRecord::terminal("u", PageType::Resume),
            Err(StoreError::MissingPayload { .. })
        ));
        assert!(matches!(
            StoredRecord::terminal("u", PageType::Serp),
            Err(StoreError::NotTerminal { .. })
        ));
        for page_type in [PageType::Ban, PageType::Captcha, PageType::Login, PageType::Unknown] {
            assert!(StoredRecord::terminal("u", page_type).is_ok());
        }
    }

    #[test]
    fn test_record_line_shape() {
        let record = StoredRecord::terminal("https://x/", PageType::Ban).unwrap();
        let value: serde_json::Value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["url"], "https://x/");
        assert_eq!(value["page_type"], "ban");
        assert!(value["payload"].is_null());
        assert!(value["parsed_at"].as_str().unwrap().contains('T'));
    }
}
