//! Output module for crawl summaries and reports
//!
//! This module handles:
//! - The per-run statistics counters
//! - Console rendering of run summaries, previews and store contents

pub mod stats;

pub use stats::{print_preview, print_store_statistics, print_summary, CrawlStats};
