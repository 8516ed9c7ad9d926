//! Integration tests for Resume-Trawler
//!
//! These tests run the real HTTP stack against local wiremock servers.

mod common;
mod crawl_tests;
mod fetch_tests;
