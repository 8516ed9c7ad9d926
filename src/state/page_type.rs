/// Page type definitions for classified content
///
/// The target site may answer 200 for blocked or missing pages, so the type of
/// a page is decided from its content alone, never from the status code.
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a fetched page turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    // ===== Content =====
    /// A single résumé detail page
    Resume,

    /// A search-results list of candidate links
    Serp,

    // ===== Blocking =====
    /// A login wall
    Login,

    /// A captcha challenge
    Captcha,

    /// A WAF or access-denied page
    Ban,

    // ===== Other =====
    /// The site's own "not found" page
    NotFound,

    /// Nothing matched
    Unknown,
}

impl PageType {
    /// Returns true if this page means the crawler has been blocked
    ///
    /// Seeing any of these ends the current run.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Ban | Self::Captcha | Self::Login)
    }

    /// Returns true if this page carries extractable content
    pub fn is_content(&self) -> bool {
        matches!(self, Self::Resume | Self::Serp)
    }

    /// Converts the page type to the tag written to the store
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resume => "resume",
            Self::Serp => "serp",
            Self::Login => "login",
            Self::Captcha => "captcha",
            Self::Ban => "ban",
            Self::NotFound => "not_found",
            Self::Unknown => "unknown",
        }
    }

    /// Parses a page type from its store tag
    ///
    /// Returns None if the string doesn't match any known type.
    pub fn from_tag(s: &str) -> Option<Self> {
        match s {
            "resume" => Some(Self::Resume),
            "serp" => Some(Self::Serp),
            "login" => Some(Self::Login),
            "captcha" => Some(Self::Captcha),
            "ban" => Some(Self::Ban),
            "not_found" => Some(Self::NotFound),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Returns all page types
    pub fn all() -> Vec<Self> {
        vec![
            Self::Resume,
            Self::Serp,
            Self::Login,
            Self::Captcha,
            Self::Ban,
            Self::NotFound,
            Self::Unknown,
        ]
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
