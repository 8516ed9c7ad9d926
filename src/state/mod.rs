//! State module for classified pages and crawl progress
//!
//! # Components
//!
//! - `PageType`: What a fetched page is (résumé, result list, ban, captcha, ...)
//! - `CrawlPhase`: Where a crawl run is, with an explicit transition table

mod crawl_phase;
mod page_type;

// Re-export main types
pub use crawl_phase::CrawlPhase;
pub use page_type::PageType;
