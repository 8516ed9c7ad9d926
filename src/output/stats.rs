//! Run statistics and their console rendering
//!
//! [`CrawlStats`] is owned by one crawl run and mutated only on the
//! coordinator's sequential path; it is handed back to the caller when the
//! run ends, however it ends.

use crate::crawler::PreviewResult;
use crate::state::PageType;
use crate::storage::LoadReport;
use serde::Serialize;

/// Counters for one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    /// Result pages fully processed
    pub pages_processed: u32,

    /// Candidate links found on result pages
    pub candidates_found: u32,

    /// Candidates not already in the store
    pub candidates_new: u32,

    /// Candidates persisted during this run
    pub candidates_saved: u32,

    /// Result pages that could not be fetched or used
    pub errors_serp: u32,

    /// Detail pages that could not be fetched
    pub errors_detail: u32,

    /// Set when the run was halted by a block or a dead identity
    pub critical_stop: bool,

    /// Human-readable reason the run stopped early, if it did
    pub stop_reason: Option<String>,
}

impl CrawlStats {
    /// Records a critical stop; the first reason wins
    pub fn halt(&mut self, reason: impl Into<String>) {
        self.critical_stop = true;
        if self.stop_reason.is_none() {
            self.stop_reason = Some(reason.into());
        }
    }

    /// Records a non-critical early stop; the first reason wins
    pub fn stop(&mut self, reason: impl Into<String>) {
        if self.stop_reason.is_none() {
            self.stop_reason = Some(reason.into());
        }
    }
}

/// Prints the end-of-run summary to stdout
pub fn print_summary(stats: &CrawlStats) {
    println!("=== Crawl Summary ===\n");

    println!("Pages:");
    println!("  Processed: {}", stats.pages_processed);
    println!("  Errors: {}", stats.errors_serp);
    println!();

    println!("Candidates:");
    println!("  Found: {}", stats.candidates_found);
    println!("  New: {}", stats.candidates_new);
    println!("  Saved: {}", stats.candidates_saved);
    println!("  Detail errors: {}", stats.errors_detail);
    println!();

    match (&stats.stop_reason, stats.critical_stop) {
        (Some(reason), true) => println!("CRITICAL STOP: {}", reason),
        (Some(reason), false) => println!("Stopped: {}", reason),
        (None, _) => println!("Completed"),
    }
}

/// Prints the outcome of a preview run to stdout
pub fn print_preview(preview: &PreviewResult) {
    println!("=== Preview ===\n");
    println!("Total found: {}", preview.total_found);
    println!("Collected URLs: {}", preview.urls.len());
    for url in &preview.urls {
        println!("  {}", url);
    }
}

/// Prints per-page-type record counts from a store replay
pub fn print_store_statistics(report: &LoadReport) {
    println!("=== Store Statistics ===\n");
    println!("Records: {}", report.valid);
    println!("Corrupted lines: {}", report.corrupted);
    println!();

    if report.valid == 0 {
        return;
    }

    println!("By page type:");
    for (tag, count) in page_type_counts(report) {
        let percentage = (count as f64 / report.valid as f64) * 100.0;
        println!("  {}: {} ({:.1}%)", tag, count, percentage);
    }
}

/// Counts for every known page type in a fixed order, then any other tags
/// found in the file
fn page_type_counts(report: &LoadReport) -> Vec<(String, usize)> {
    let known = PageType::all();
    let mut counts: Vec<(String, usize)> = known
        .iter()
        .map(|t| {
            let count = report.by_page_type.get(t.as_str()).copied().unwrap_or(0);
            (t.as_str().to_string(), count)
        })
        .collect();

    counts.extend(
        report
            .by_page_type
            .iter()
            .filter(|(tag, _)| PageType::from_tag(tag).is_none())
            .map(|(tag, count)| (tag.clone(), *count)),
    );
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_stop_reason_wins() {
        let mut stats = CrawlStats::default();
        stats.halt("Blocked: captcha");
        stats.halt("Blocked: ban");

        assert!(stats.critical_stop);
        assert_eq!(stats.stop_reason.as_deref(), Some("Blocked: captcha"));
    }

    #[test]
    fn test_soft_stop_is_not_critical() {
        let mut stats = CrawlStats::default();
        stats.stop("Interrupted");
        assert!(!stats.critical_stop);
        assert_eq!(stats.stop_reason.as_deref(), Some("Interrupted"));
    }

    #[test]
    fn test_page_type_counts_cover_every_type() {
        let mut report = LoadReport {
            valid: 4,
            ..Default::default()
        };
        report.by_page_type.insert("resume".to_string(), 3);
        report.by_page_type.insert("archived".to_string(), 1);

        let counts = page_type_counts(&report);
        assert_eq!(counts.len(), PageType::all().len() + 1);
        assert_eq!(counts[0], ("resume".to_string(), 3));
        assert!(counts.contains(&("captcha".to_string(), 0)));
        assert_eq!(counts.last(), Some(&("archived".to_string(), 1)));
    }

    #[test]
    fn test_stats_serialize() {
        let stats = CrawlStats {
            pages_processed: 2,
            ..Default::default()
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["pages_processed"], 2);
        assert!(value["stop_reason"].is_null());
    }
}
