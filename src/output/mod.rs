//! Output module for crawl reporting
//!
//! This module handles:
//! - Per-session counters and the end-of-crawl summary
//! - Statistics about what the document store holds

pub mod stats;
mod summary;

pub use stats::{load_statistics, print_statistics, StoreStatistics};
pub use summary::{CrawlStats, CrawlSummary};
