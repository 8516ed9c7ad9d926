//! HTML parser for page classification and field extraction
//!
//! This module handles parsing fetched HTML to extract:
//! - The page type, from structural signatures only
//! - Candidate links, the next-page link and the total count from result lists
//! - The minimal set of résumé fields persisted by the crawler
//!
//! # Classification Order
//!
//! First match wins:
//!
//! 1. Ban (WAF container, or a "ray id" next to "access denied" or Cloudflare)
//! 2. Captcha
//! 3. Not found (heading selector *and* localized text must both match)
//! 4. Login form
//! 5. Résumé container
//! 6. Result list container
//! 7. Unknown
//!
//! Block and challenge pages come first because they can embed markup that
//! resembles a content page.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::state::PageType;

const WAF: &str = "div.cf-error-details";
const CAPTCHA: &str = "#g-recaptcha-response, iframe[src*='captcha']";
const NOT_FOUND_HEADING: &str = "h1.text-center";
const LOGIN: &str = "form[action*='login'], input[name='login']";
const RESUME_CONTAINER: &str = "div[id^='resume_']";
const SERP_CONTAINER: &str = "#pjax-resume-list";

const SERP_ITEM: &str = "#pjax-resume-list div.card, #pjax-resume-list div.card-visited";
const SERP_LINK: &str = "h2 a";
const SERP_NEXT_PAGE: &str = "ul.pagination a[rel='next']";
const SERP_TOTAL_FOUND: &str = "h1, h2, .text-default-7, .text-muted";

const RESUME_NAME: &str = "h1";
const RESUME_TITLE: &str = "h2.title-print";
const RESUME_SKILLS: &str = "ul.list-unstyled.my-0.flex.flex-wrap span.ellipsis";
const RESUME_HIDDEN_CONTACTS: &str = "div.alert-warning, div.modal-silence-alert";

const NOT_FOUND_TEXT: &str = "не знайдено";

/// Errors raised while building the parser
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// A candidate discovered on a result list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    /// Numeric résumé identifier taken from the link
    pub resume_id: String,
    /// Absolute URL of the detail page
    pub url: String,
}

/// Extracted information from a result list page
#[derive(Debug, Clone, Default)]
pub struct SerpPage {
    pub candidates: Vec<CandidateLink>,
    /// Absolute URL of the next page, if any
    pub next_page_url: Option<String>,
    /// Total number of matches announced by the page
    pub total_found: Option<u64>,
}

/// The résumé fields the crawler persists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeDetail {
    pub resume_id: String,
    /// Canonical URL: `/resumes/<id>/` on the page's origin
    pub url: String,
    pub name: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub has_hidden_contacts: bool,
}

/// Compiled signatures and extraction rules for the target site
#[derive(Debug)]
pub struct SiteParser {
    waf: Selector,
    captcha: Selector,
    not_found_heading: Selector,
    login: Selector,
    resume_container: Selector,
    serp_container: Selector,
    serp_item: Selector,
    serp_link: Selector,
    serp_next_page: Selector,
    serp_total_found: Selector,
    resume_name: Selector,
    resume_title: Selector,
    resume_skills: Selector,
    resume_hidden_contacts: Selector,
    serp_id: Regex,
    url_id: Regex,
    total_found: Regex,
}

fn selector(css: &str) -> Result<Selector, ParserError> {
    Selector::parse(css).map_err(|e| ParserError::InvalidSelector {
        selector: css.to_string(),
        reason: format!("{:?}", e),
    })
}

impl SiteParser {
    /// Compiles every selector and pattern up front
    pub fn new() -> Result<Self, ParserError> {
        Ok(Self {
            waf: selector(WAF)?,
            captcha: selector(CAPTCHA)?,
            not_found_heading: selector(NOT_FOUND_HEADING)?,
            login: selector(LOGIN)?,
            resume_container: selector(RESUME_CONTAINER)?,
            serp_container: selector(SERP_CONTAINER)?,
            serp_item: selector(SERP_ITEM)?,
            serp_link: selector(SERP_LINK)?,
            serp_next_page: selector(SERP_NEXT_PAGE)?,
            serp_total_found: selector(SERP_TOTAL_FOUND)?,
            resume_name: selector(RESUME_NAME)?,
            resume_title: selector(RESUME_TITLE)?,
            resume_skills: selector(RESUME_SKILLS)?,
            resume_hidden_contacts: selector(RESUME_HIDDEN_CONTACTS)?,
            serp_id: Regex::new(r"/resumes/(\d+)")?,
            url_id: Regex::new(r"/resumes/([a-zA-Z0-9]+)")?,
            total_found: Regex::new(r"(?i)(\d[\d\s]*)\s*резюме")?,
        })
    }

    /// Classifies a page from its content
    ///
    /// Total and deterministic: every input maps to exactly one type, and
    /// the HTTP status plays no part.
    pub fn classify_page(&self, html: &str, url: &str) -> PageType {
        let document = Html::parse_document(html);
        let page_type = self.classify_document(&document);
        tracing::trace!("Classified {} as {}", url, page_type);
        page_type
    }

    fn classify_document(&self, document: &Html) -> PageType {
        if document.select(&self.waf).next().is_some() {
            return PageType::Ban;
        }

        let text = document.root_element().text().collect::<String>().to_lowercase();
        if text.contains("ray id") && (text.contains("access denied") || text.contains("cloudflare")) {
            return PageType::Ban;
        }

        if document.select(&self.captcha).next().is_some() {
            return PageType::Captcha;
        }

        // A bare centered heading is common; only the localized text makes it a 404
        if let Some(heading) = document.select(&self.not_found_heading).next() {
            let heading_text = heading.text().collect::<String>().to_lowercase();
            if heading_text.contains(NOT_FOUND_TEXT) {
                return PageType::NotFound;
            }
        }

        if document.select(&self.login).next().is_some() {
            return PageType::Login;
        }

        if document.select(&self.resume_container).next().is_some() {
            return PageType::Resume;
        }

        if document.select(&self.serp_container).next().is_some() {
            return PageType::Serp;
        }

        PageType::Unknown
    }

    /// Extracts candidates, pagination and the announced total from a list page
    ///
    /// Cards without a link or without a numeric id (ads, promos) are
    /// skipped. Relative links are resolved against `page_url`.
    pub fn parse_serp(&self, html: &str, page_url: &Url) -> SerpPage {
        let document = Html::parse_document(html);
        let mut candidates = Vec::new();

        for card in document.select(&self.serp_item) {
            if let Some(candidate) = self.parse_card(card, page_url) {
                candidates.push(candidate);
            }
        }

        if candidates.is_empty() {
            tracing::warn!("Result list without usable cards: {}", page_url);
        }

        let next_page_url = document
            .select(&self.serp_next_page)
            .next()
            .and_then(|link| link.value().attr("href"))
            .and_then(|href| page_url.join(href.trim()).ok())
            .map(|url| url.to_string());

        let total_found = document
            .select(&self.serp_total_found)
            .find_map(|element| self.extract_total(&element.text().collect::<String>()));

        SerpPage {
            candidates,
            next_page_url,
            total_found,
        }
    }

    fn parse_card(&self, card: ElementRef<'_>, page_url: &Url) -> Option<CandidateLink> {
        let href = card.select(&self.serp_link).next()?.value().attr("href")?;
        let url = page_url.join(href.trim()).ok()?;
        let resume_id = self.serp_id.captures(url.path())?.get(1)?.as_str().to_string();

        Some(CandidateLink {
            resume_id,
            url: url.to_string(),
        })
    }

    fn extract_total(&self, text: &str) -> Option<u64> {
        let captures = self.total_found.captures(text)?;
        let digits: String = captures
            .get(1)?
            .as_str()
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }

    /// Extracts the persisted résumé fields
    ///
    /// Returns None when the page carries no résumé container or no
    /// identifier can be derived from the URL or the container.
    pub fn parse_resume(&self, html: &str, page_url: &Url) -> Option<ResumeDetail> {
        let document = Html::parse_document(html);
        let container = document.select(&self.resume_container).next()?;

        let resume_id = self
            .url_id
            .captures(page_url.path())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .or_else(|| {
                container
                    .value()
                    .id()
                    .and_then(|id| id.strip_prefix("resume_"))
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
            })?;

        let mut canonical = page_url.clone();
        canonical.set_path(&format!("/resumes/{}/", resume_id));
        canonical.set_query(None);
        canonical.set_fragment(None);

        let mut skills: Vec<String> = Vec::new();
        for tag in document.select(&self.resume_skills) {
            if let Some(skill) = clean_text(&tag.text().collect::<String>()) {
                if !skills.contains(&skill) {
                    skills.push(skill);
                }
            }
        }

        Some(ResumeDetail {
            resume_id,
            url: canonical.to_string(),
            name: first_text(&document, &self.resume_name),
            title: first_text(&document, &self.resume_title),
            skills,
            has_hidden_contacts: document
                .select(&self.resume_hidden_contacts)
                .next()
                .is_some(),
        })
    }
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|element| clean_text(&element.text().collect::<String>()))
}

/// Collapses all whitespace runs to single spaces
fn clean_text(text: &str) -> Option<String> {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
