//! Per-session crawl counters
//!
//! [`CrawlStats`] is updated by the orchestrator as items are processed and
//! turned into a [`CrawlSummary`] when the crawl loop ends.

use crate::crawler::PageOutcome;
use std::time::{Duration, Instant};

/// Running counters for one crawl session
#[derive(Debug, Clone)]
pub struct CrawlStats {
    started: Instant,
    fetches: u64,
    saved: u64,
    unchanged: u64,
    save_failed: u64,
    skipped: u64,
    failed: u64,
    not_due: u64,
    too_deep: u64,
    links_enqueued: u64,
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            fetches: 0,
            saved: 0,
            unchanged: 0,
            save_failed: 0,
            skipped: 0,
            failed: 0,
            not_due: 0,
            too_deep: 0,
            links_enqueued: 0,
        }
    }

    /// Counts an item handed to the fetcher; this is what the page budget limits
    pub fn record_fetch(&mut self) {
        self.fetches += 1;
    }

    /// Number of items handed to the fetcher so far
    pub fn fetches(&self) -> u64 {
        self.fetches
    }

    pub fn record(&mut self, outcome: &PageOutcome) {
        match outcome {
            PageOutcome::Saved { new_links } => {
                self.saved += 1;
                self.links_enqueued += *new_links as u64;
            }
            PageOutcome::Unchanged { new_links } => {
                self.unchanged += 1;
                self.links_enqueued += *new_links as u64;
            }
            PageOutcome::SaveFailed { new_links } => {
                self.save_failed += 1;
                self.links_enqueued += *new_links as u64;
            }
            PageOutcome::Skipped => self.skipped += 1,
            PageOutcome::Failed(_) => self.failed += 1,
            PageOutcome::NotDue => self.not_due += 1,
            PageOutcome::TooDeep => self.too_deep += 1,
        }
    }

    /// Pages that came back with a body (saved, unchanged or not storable)
    pub fn pages_fetched(&self) -> u64 {
        self.saved + self.unchanged + self.save_failed
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Freezes the counters
    pub fn finish(&self, interrupted: bool, frontier_remaining: usize) -> CrawlSummary {
        CrawlSummary {
            elapsed: self.elapsed(),
            fetches: self.fetches,
            saved: self.saved,
            unchanged: self.unchanged,
            save_failed: self.save_failed,
            skipped: self.skipped,
            failed: self.failed,
            not_due: self.not_due,
            too_deep: self.too_deep,
            links_enqueued: self.links_enqueued,
            frontier_remaining,
            interrupted,
        }
    }
}

/// Final result of a crawl session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    pub elapsed: Duration,

    /// Items handed to the fetcher
    pub fetches: u64,

    /// New or changed documents written to the store
    pub saved: u64,

    /// Documents whose content hash matched; only the crawl date was refreshed
    pub unchanged: u64,

    pub save_failed: u64,

    /// Refused by robots.txt or a site policy
    pub skipped: u64,

    /// Gave up after a terminal status or exhausted retries
    pub failed: u64,

    /// Already stored and not yet due for a recheck
    pub not_due: u64,

    pub too_deep: u64,

    pub links_enqueued: u64,

    /// Items still in the frontier when the loop stopped
    pub frontier_remaining: usize,

    /// The crawl was stopped by an interrupt
    pub interrupted: bool,
}

impl CrawlSummary {
    pub fn pages_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.saved + self.unchanged + self.save_failed) as f64 / secs
        } else {
            0.0
        }
    }

    /// Writes the summary to the log
    pub fn log(&self) {
        let how = if self.interrupted {
            "interrupted"
        } else {
            "finished"
        };

        tracing::info!(
            "Crawl {} in {:.1}s: {} saved, {} unchanged, {} failed, {} skipped ({:.2} pages/sec)",
            how,
            self.elapsed.as_secs_f64(),
            self.saved,
            self.unchanged,
            self.failed,
            self.skipped,
            self.pages_per_second()
        );
        tracing::info!(
            "{} fetches, {} not due for recheck, {} beyond max depth, {} links enqueued, {} left in frontier",
            self.fetches,
            self.not_due,
            self.too_deep,
            self.links_enqueued,
            self.frontier_remaining
        );
        if self.save_failed > 0 {
            tracing::warn!("{} documents could not be saved", self.save_failed);
        }
    }
}
