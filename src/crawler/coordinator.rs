//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates:
//! - Walking search-result pages strictly one after another
//! - Safety checks on every fetched page
//! - Deduplicated detail fetches and persistence
//! - Politeness pacing, pagination limits and cooperative cancellation
//!
//! The coordinator only sees classified outcomes from its [`Fetcher`]; it
//! never handles raw transport errors.

use crate::config::CrawlerConfig;
use crate::crawler::classifier::{FailureCategory, HttpResponse};
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::parser::{CandidateLink, SiteParser};
use crate::output::CrawlStats;
use crate::state::{CrawlPhase, PageType};
use crate::storage::{url_key, CandidateStore, StoredRecord};
use crate::{Result, TrawlError};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Reason recorded when a run is cancelled from outside
pub const INTERRUPTED: &str = "Interrupted";

/// What a run does with the candidates it finds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlMode {
    /// Walk result pages only; no detail fetches, no persistence
    Preview,
    /// Fetch and persist every candidate not already stored
    Full,
}

/// Scope of a search, gathered without fetching any detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewResult {
    /// Total announced by the first result page, or the number of links seen
    pub total_found: u64,
    pub urls: Vec<String>,
}

/// How a detail page was dealt with
enum DetailFlow {
    Continue,
    Halt,
}

/// Main crawler coordinator structure
pub struct Coordinator<F, S> {
    settings: CrawlerConfig,
    fetcher: F,
    store: S,
    parser: SiteParser,
    cancel: CancellationToken,
    phase: CrawlPhase,
    stats: CrawlStats,
}

impl<F: Fetcher, S: CandidateStore> Coordinator<F, S> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `settings` - Page cap, pacing and detail concurrency
    /// * `fetcher` - Source of classified page fetches
    /// * `store` - Durable store used for dedup and persistence
    pub fn new(settings: CrawlerConfig, fetcher: F, store: S) -> Result<Self> {
        Ok(Self {
            settings,
            fetcher,
            store,
            parser: SiteParser::new()?,
            cancel: CancellationToken::new(),
            phase: CrawlPhase::Idle,
            stats: CrawlStats::default(),
        })
    }

    /// Uses an externally owned token to stop the run
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Counters of the current (or last) run
    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs a full crawl from `start_url`
    ///
    /// Blocking pages and dead identities end the run with `critical_stop`
    /// set; that is reported through the returned stats, not as an error.
    pub async fn run(&mut self, start_url: &str) -> Result<CrawlStats> {
        self.crawl(CrawlMode::Full, start_url).await?;
        Ok(self.stats.clone())
    }

    /// Walks result pages only, collecting candidate URLs
    ///
    /// Nothing is fetched beyond the result pages and nothing is persisted.
    /// The run's counters remain available through [`Coordinator::stats`].
    pub async fn preview(&mut self, start_url: &str) -> Result<PreviewResult> {
        let preview = self.crawl(CrawlMode::Preview, start_url).await?;
        Ok(preview)
    }

    fn transition(&mut self, to: CrawlPhase) -> Result<()> {
        advance(&mut self.phase, to)
    }

    fn stop(&mut self) -> Result<()> {
        if self.phase.is_terminal() {
            return Ok(());
        }
        self.transition(CrawlPhase::Stopped)
    }

    async fn crawl(&mut self, mode: CrawlMode, start_url: &str) -> Result<PreviewResult> {
        self.phase = CrawlPhase::Idle;
        self.stats = CrawlStats::default();

        let mut preview = PreviewResult::default();
        let mut announced_total: Option<u64> = None;
        let mut current = Url::parse(start_url)?.to_string();

        tracing::info!(
            "Starting {} crawl at {} (max {} pages)",
            if mode == CrawlMode::Full { "full" } else { "preview" },
            current,
            self.settings.max_pages
        );

        loop {
            if self.cancel.is_cancelled() {
                self.interrupt()?;
                break;
            }

            tracing::info!(
                "Processing result page {}: {}",
                self.stats.pages_processed + 1,
                current
            );

            self.transition(CrawlPhase::FetchingList)?;
            let fetched = tokio::select! {
                result = self.fetcher.fetch(&current) => result,
                () = self.cancel.cancelled() => {
                    self.interrupt()?;
                    break;
                }
            };

            let response = match fetched {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!("Failed to fetch result page {}: {}", current, e);
                    self.stats.errors_serp += 1;
                    match e.category() {
                        Some(category) if category.is_permanent_transport() => {
                            self.stats.halt(transport_reason(category));
                        }
                        Some(FailureCategory::Auth) => {
                            self.stats.halt(blocked_reason(PageType::Login));
                        }
                        _ => self.stats.stop(format!("Result page unavailable: {}", e)),
                    }
                    self.stop()?;
                    break;
                }
            };

            self.transition(CrawlPhase::SafetyCheck)?;
            let page_type = self.parser.classify_page(&response.body, &current);

            if page_type.is_blocking() {
                tracing::error!(
                    "CRITICAL: {} detected on result page {}, stopping",
                    page_type,
                    current
                );
                self.stats.halt(blocked_reason(page_type));
                self.stop()?;
                break;
            }

            if page_type != PageType::Serp {
                tracing::warn!("Unexpected page type {} for result page {}", page_type, current);
                self.stats.stop(format!("Unexpected page type: {}", page_type));
                self.stop()?;
                break;
            }

            self.transition(CrawlPhase::ExtractingLinks)?;
            let page_url = Url::parse(&current)?;
            let page = self.parser.parse_serp(&response.body, &page_url);

            if announced_total.is_none() {
                announced_total = page.total_found;
            }
            self.stats.candidates_found += page.candidates.len() as u32;
            tracing::info!("Found {} candidates on page", page.candidates.len());

            match mode {
                CrawlMode::Preview => {
                    for candidate in &page.candidates {
                        if !preview.urls.contains(&candidate.url) {
                            preview.urls.push(candidate.url.clone());
                        }
                    }
                }
                CrawlMode::Full => {
                    self.transition(CrawlPhase::FetchingDetail)?;
                    let interrupted = self.process_candidates(page.candidates).await?;

                    if interrupted {
                        self.interrupt()?;
                        break;
                    }
                    if self.stats.critical_stop {
                        self.stop()?;
                        break;
                    }
                }
            }

            self.transition(CrawlPhase::Paginating)?;

            if page.next_page_url.as_deref() == Some(current.as_str()) {
                tracing::warn!("Next page URL matches current page, stopping pagination");
                self.transition(CrawlPhase::Idle)?;
                break;
            }

            self.stats.pages_processed += 1;

            let next = match page.next_page_url {
                Some(next) if self.stats.pages_processed < self.settings.max_pages => next,
                Some(_) => {
                    tracing::info!("Page limit of {} reached", self.settings.max_pages);
                    self.transition(CrawlPhase::Idle)?;
                    break;
                }
                None => {
                    tracing::info!("No next page, pagination complete");
                    self.transition(CrawlPhase::Idle)?;
                    break;
                }
            };

            if !pause(&self.cancel, self.settings.serp_delay()).await {
                self.interrupt()?;
                break;
            }

            current = next;
        }

        preview.total_found = announced_total.unwrap_or(self.stats.candidates_found as u64);

        tracing::info!(
            pages = self.stats.pages_processed,
            found = self.stats.candidates_found,
            saved = self.stats.candidates_saved,
            critical = self.stats.critical_stop,
            "Crawl finished in phase {}",
            self.phase
        );

        Ok(preview)
    }

    fn interrupt(&mut self) -> Result<()> {
        tracing::warn!("Crawl interrupted");
        self.stats.stop(INTERRUPTED);
        self.stop()
    }

    /// Fetches and persists the new candidates of one result page
    ///
    /// Returns true if the run was cancelled while doing so. All in-flight
    /// detail fetches are dropped on a critical stop or cancellation.
    async fn process_candidates(&mut self, candidates: Vec<CandidateLink>) -> Result<bool> {
        let Self {
            settings,
            fetcher,
            store,
            parser,
            cancel,
            phase,
            stats,
        } = self;

        // Dedup before any network call, against the store and this page
        let mut seen = HashSet::new();
        let pending: Vec<CandidateLink> = candidates
            .into_iter()
            .filter(|candidate| {
                if store.exists(&candidate.resume_id) || store.exists(&url_key(&candidate.url)) {
                    tracing::debug!("Skipping existing candidate {}", candidate.resume_id);
                    return false;
                }
                seen.insert(candidate.resume_id.clone())
            })
            .collect();

        stats.candidates_new += pending.len() as u32;

        let fetcher = &*fetcher;
        let delay = settings.detail_delay();
        let details = stream::iter(pending)
            .map(move |candidate| async move {
                tokio::time::sleep(delay).await;
                let result = fetcher.fetch(&candidate.url).await;
                (candidate, result)
            })
            .buffer_unordered(settings.detail_concurrency.max(1) as usize);
        let mut details = std::pin::pin!(details);

        loop {
            let next = tokio::select! {
                next = details.next() => next,
                () = cancel.cancelled() => return Ok(true),
            };

            let Some((candidate, result)) = next else {
                break;
            };

            let flow = match result {
                Ok(response) => {
                    advance(phase, CrawlPhase::SafetyCheck)?;
                    let flow = handle_detail(parser, store, stats, &candidate, &response)?;
                    advance(phase, CrawlPhase::FetchingDetail)?;
                    flow
                }
                Err(e) => handle_detail_failure(store, stats, &candidate, &e),
            };

            if let DetailFlow::Halt = flow {
                break;
            }
        }

        Ok(false)
    }
}

/// Applies a phase transition, rejecting anything outside the table
fn advance(phase: &mut CrawlPhase, to: CrawlPhase) -> Result<()> {
    if !phase.can_transition_to(to) {
        return Err(TrawlError::InvalidTransition { from: *phase, to });
    }
    tracing::trace!("Phase {} -> {}", phase, to);
    *phase = to;
    Ok(())
}

/// Sleeps for `delay` unless cancelled first; returns false on cancellation
async fn pause(cancel: &CancellationToken, delay: Duration) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tracing::debug!("Sleeping {:?} before next page", delay);
    tokio::select! {
        () = tokio::time::sleep(delay) => true,
        () = cancel.cancelled() => false,
    }
}

fn blocked_reason(page_type: PageType) -> String {
    format!("Blocked: {}", page_type)
}

fn transport_reason(category: FailureCategory) -> String {
    format!("Transport failure: {}", category)
}

/// Classifies a fetched detail page and persists what it yields
fn handle_detail<S: CandidateStore>(
    parser: &SiteParser,
    store: &mut S,
    stats: &mut CrawlStats,
    candidate: &CandidateLink,
    response: &HttpResponse,
) -> Result<DetailFlow> {
    let page_type = parser.classify_page(&response.body, &candidate.url);

    match page_type {
        PageType::NotFound => {
            tracing::warn!("Resume not found: {}", candidate.url);
            record_not_found(store, &candidate.url);
            Ok(DetailFlow::Continue)
        }
        t if t.is_blocking() => {
            tracing::error!("CRITICAL: {} detected on detail page {}, stopping", t, candidate.url);
            stats.halt(blocked_reason(t));
            Ok(DetailFlow::Halt)
        }
        PageType::Resume => {
            let page_url = Url::parse(&candidate.url)?;
            let Some(detail) = parser.parse_resume(&response.body, &page_url) else {
                tracing::warn!("Resume page without an identifier: {}", candidate.url);
                return Ok(DetailFlow::Continue);
            };

            let label = format!(
                "{} ({})",
                detail.name.as_deref().unwrap_or("unnamed"),
                detail.title.as_deref().unwrap_or("no title")
            );

            match store.append(&StoredRecord::resume(detail)) {
                Ok(true) => {
                    stats.candidates_saved += 1;
                    tracing::info!("Saved: {}", label);
                }
                Ok(false) => tracing::debug!("Already stored: {}", candidate.url),
                Err(e) => tracing::error!("Failed to persist {}: {}", candidate.url, e),
            }
            Ok(DetailFlow::Continue)
        }
        other => {
            tracing::warn!("Unexpected page type {} for detail page {}", other, candidate.url);
            Ok(DetailFlow::Continue)
        }
    }
}

/// Accounts for a detail fetch that produced no usable response
fn handle_detail_failure<S: CandidateStore>(
    store: &mut S,
    stats: &mut CrawlStats,
    candidate: &CandidateLink,
    error: &FetchError,
) -> DetailFlow {
    match error.category() {
        Some(category) if category.is_permanent_transport() => {
            tracing::error!("CRITICAL: {} fetching {}, stopping", category, candidate.url);
            stats.errors_detail += 1;
            stats.halt(transport_reason(category));
            DetailFlow::Halt
        }
        Some(FailureCategory::Auth) => {
            tracing::error!("CRITICAL: login required for {}, stopping", candidate.url);
            stats.halt(blocked_reason(PageType::Login));
            DetailFlow::Halt
        }
        Some(FailureCategory::Domain) if matches!(error.status(), Some(404 | 410)) => {
            tracing::warn!("Resume not found ({:?}): {}", error.status(), candidate.url);
            record_not_found(store, &candidate.url);
            DetailFlow::Continue
        }
        _ => {
            tracing::error!("Failed to fetch detail {}: {}", candidate.url, error);
            stats.errors_detail += 1;
            DetailFlow::Continue
        }
    }
}

/// Persists a not-found outcome so the URL is not fetched again
fn record_not_found<S: CandidateStore>(store: &mut S, url: &str) {
    let result = StoredRecord::terminal(url, PageType::NotFound)
        .and_then(|record| store.append(&record));
    if let Err(e) = result {
        tracing::error!("Failed to persist not-found record for {}: {}", url, e);
    }
}
