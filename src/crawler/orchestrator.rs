//! Crawl orchestrator - main crawl loop
//!
//! Owns every piece of session state (frontier, visited set, politeness
//! engine, counters) and drives items through
//! depth check → revisit check → politeness wait → fetch → diff and save → link extraction.
//!
//! On startup the frontier is seeded from the configured sources and, when
//! enabled, rebuilt from the links of documents already in the store, so an
//! interrupted crawl resumes without any checkpoint file.

use crate::config::{Config, CrawlerConfig, SourceConfig};
use crate::crawler::extractor::{HtmlLinkExtractor, LinkExtractor};
use crate::crawler::fetcher::{build_http_client, FetchFailure, FetchOutcome, Fetcher};
use crate::crawler::frontier::{Frontier, FrontierItem};
use crate::output::{CrawlStats, CrawlSummary};
use crate::politeness::{PolicySet, PolitenessEngine};
use crate::storage::{DocumentRecord, DocumentStore, SqliteStorage};
use crate::url::{get_domain, normalize_url, CanonicalUrl};
use crate::HarvestError;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;

/// What happened to one dequeued frontier item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// New or changed content was written
    Saved { new_links: usize },
    /// Content hash matched the stored one; only the crawl date was refreshed
    Unchanged { new_links: usize },
    /// The page was fetched but the store rejected the write
    SaveFailed { new_links: usize },
    /// Refused by robots.txt or a site policy
    Skipped,
    Failed(FetchFailure),
    /// Stored recently enough that no recheck is due
    NotDue,
    /// Deeper than the configured maximum
    TooDeep,
}

/// Sequential breadth-first crawler over a [`DocumentStore`]
pub struct Orchestrator<S: DocumentStore> {
    config: CrawlerConfig,
    sources: Vec<SourceConfig>,
    store: S,
    extractor: Box<dyn LinkExtractor>,
    politeness: PolitenessEngine,
    fetcher: Fetcher,
    frontier: Frontier,
    /// Canonical URLs stored before this session or processed during it
    visited: HashSet<String>,
    stats: CrawlStats,
    shutdown: watch::Receiver<bool>,
}

impl<S: DocumentStore> Orchestrator<S> {
    /// Creates an orchestrator using the HTML link extractor
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `store` - An open document store
    /// * `shutdown` - Becomes `true` when the crawl should stop
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - Frontier seeded and ready to run
    /// * `Err(HarvestError)` - The store could not be read or the HTTP client could not be built
    pub fn new(config: &Config, store: S, shutdown: watch::Receiver<bool>) -> Result<Self, HarvestError> {
        Self::with_extractor(config, store, Box::new(HtmlLinkExtractor::new()), shutdown)
    }

    /// Creates an orchestrator with a custom link extractor
    pub fn with_extractor(
        config: &Config,
        store: S,
        extractor: Box<dyn LinkExtractor>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.crawler)?;
        let overrides = PolicySet::from_config(&config.site_policies);
        if !overrides.is_empty() {
            tracing::debug!("{} site policies in force", overrides.len());
        }

        let visited = store.list_urls()?;
        tracing::info!("{} documents already in the store", visited.len());

        let mut orchestrator = Self {
            politeness: PolitenessEngine::new(client.clone(), &config.crawler, overrides),
            fetcher: Fetcher::new(client, &config.crawler),
            config: config.crawler.clone(),
            sources: config.enabled_sources().cloned().collect(),
            store,
            extractor,
            frontier: Frontier::new(),
            visited,
            stats: CrawlStats::new(),
            shutdown,
        };

        orchestrator.seed_sources();

        if orchestrator.config.restore_queue_from_saved && !orchestrator.visited.is_empty() {
            orchestrator.restore_from_saved();
        }

        tracing::info!("Frontier initialized with {} URLs", orchestrator.frontier.len());

        Ok(orchestrator)
    }

    /// Enqueues each enabled source URL at depth 0 if it is new or due
    fn seed_sources(&mut self) {
        for source in &self.sources {
            let url = match normalize_url(&source.url, None) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping source {}: {}", source.name, e);
                    continue;
                }
            };

            if !should_recheck(&self.store, &self.visited, url.as_str(), &self.config) {
                tracing::debug!("Seed {} is not due for recheck", url);
                continue;
            }

            self.frontier.push(FrontierItem::new(url, source.name.as_str(), 0));
        }
    }

    /// Replays stored documents through the link extractor to rebuild the frontier
    ///
    /// Links are enqueued at depth 1 under the source that stored the document.
    fn restore_from_saved(&mut self) {
        let mut restored = 0usize;
        let sources = self.sources.clone();

        let store = &self.store;
        let extractor = &self.extractor;
        let politeness = &self.politeness;
        let visited = &self.visited;
        let config = &self.config;
        let frontier = &mut self.frontier;

        for source in &sources {
            let mut visit = |doc: DocumentRecord| {
                let links = match extractor.extract(&doc.html, &doc.url) {
                    Ok(links) => links,
                    Err(e) => {
                        tracing::debug!("Skipping stored document {}: {}", doc.url, e);
                        return;
                    }
                };

                let domain = get_domain(&doc.url);
                for link in links {
                    let Some(url) = followable_link(&link, &domain, politeness) else {
                        continue;
                    };
                    if frontier.was_enqueued(url.as_str())
                        || !should_recheck(store, visited, url.as_str(), config)
                    {
                        continue;
                    }
                    if frontier.push(FrontierItem::new(url, source.name.as_str(), 1)) {
                        restored += 1;
                    }
                }
            };

            if let Err(e) = store.list_documents(Some(&source.name), &mut visit) {
                tracing::warn!("Could not replay stored documents for {}: {}", source.name, e);
            }
        }

        tracing::info!("Restored {} URLs from stored documents", restored);
    }

    /// Runs the crawl loop until the frontier is empty, the page budget is
    /// spent or shutdown is signalled
    pub async fn run(&mut self) -> CrawlSummary {
        tracing::info!("Starting crawl with {} URLs in frontier", self.frontier.len());
        let mut interrupted = false;

        loop {
            if self.is_shutdown() {
                tracing::info!("Shutdown requested, stopping crawl");
                interrupted = true;
                break;
            }

            if self.config.max_pages > 0 && self.stats.fetches() >= self.config.max_pages {
                tracing::info!("Page budget of {} reached", self.config.max_pages);
                break;
            }

            let Some(item) = self.frontier.pop() else {
                tracing::info!("Frontier is empty, crawl complete");
                break;
            };

            let Some(outcome) = self.process_item(item).await else {
                tracing::info!("Shutdown requested while waiting, stopping crawl");
                interrupted = true;
                break;
            };

            let fetched_before = self.stats.pages_fetched();
            self.stats.record(&outcome);
            let fetched = self.stats.pages_fetched();

            if fetched != fetched_before && fetched % 10 == 0 {
                tracing::info!(
                    "Progress: {} pages fetched, {} in frontier, {:.2} pages/sec",
                    fetched,
                    self.frontier.len(),
                    fetched as f64 / self.stats.elapsed().as_secs_f64().max(f64::EPSILON)
                );
            }
        }

        let summary = self.stats.finish(interrupted, self.frontier.len());
        summary.log();
        summary
    }

    /// Handles one frontier item
    ///
    /// Returns `None` only when shutdown interrupted the politeness wait; the
    /// item is then dropped without a request.
    async fn process_item(&mut self, item: FrontierItem) -> Option<PageOutcome> {
        if item.depth > self.config.max_depth {
            tracing::debug!("Skipping {}: depth {} exceeds maximum", item.url, item.depth);
            return Some(PageOutcome::TooDeep);
        }

        if self.visited.contains(item.url.as_str()) && !self.should_recheck(item.url.as_str()) {
            tracing::debug!("Skipping {}: not due for recheck", item.url);
            return Some(PageOutcome::NotDue);
        }

        let domain = item.url.domain();
        if let Some(wait) = self.politeness.time_until_allowed(&domain) {
            if !self.wait_or_shutdown(wait).await {
                return None;
            }
        }

        tracing::info!("[depth {}] Fetching {}", item.depth, item.url);
        self.stats.record_fetch();

        let page = match self.fetcher.fetch(&mut self.politeness, &item.url).await {
            FetchOutcome::Fetched(page) => page,
            FetchOutcome::Disallowed => {
                self.visited.insert(item.url.to_string());
                return Some(PageOutcome::Skipped);
            }
            FetchOutcome::Failed(failure) => {
                tracing::info!("Failed to fetch {}: {}", item.url, failure);
                self.visited.insert(item.url.to_string());
                return Some(PageOutcome::Failed(failure));
            }
        };

        if page.html.len() < 100 {
            tracing::debug!("{} returned a very short document ({} bytes)", item.url, page.html.len());
        }

        let content_hash = hex::encode(Sha256::digest(&page.body));
        let saved = self.save(&item, &page.html, &content_hash);
        self.visited.insert(item.url.to_string());

        let new_links = if item.depth < self.config.max_depth {
            self.enqueue_links(&item, &page.html, &page.final_url)
        } else {
            0
        };

        let outcome = match saved {
            Ok(true) => {
                tracing::info!(
                    "Saved {} (HTTP {}, {} bytes, {}, attempt {})",
                    item.url,
                    page.status,
                    page.body.len(),
                    page.encoding,
                    page.attempts
                );
                PageOutcome::Saved { new_links }
            }
            Ok(false) => {
                tracing::info!("Unchanged {} (attempt {})", item.url, page.attempts);
                PageOutcome::Unchanged { new_links }
            }
            Err(e) => {
                tracing::warn!("Failed to save {}: {}", item.url, e);
                PageOutcome::SaveFailed { new_links }
            }
        };

        if new_links > 0 {
            tracing::debug!("Found {} new links on {}", new_links, item.url);
        }

        Some(outcome)
    }

    /// Writes the page, or only refreshes its date when the hash is unchanged
    ///
    /// Returns `Ok(true)` when content was written.
    fn save(&mut self, item: &FrontierItem, html: &str, content_hash: &str) -> Result<bool, HarvestError> {
        let url = item.url.as_str();
        let now = Utc::now();

        let previous = match self.store.visited_record(url) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("Could not read stored record for {}: {}", url, e);
                None
            }
        };

        if previous.is_some_and(|record| record.content_hash == content_hash) {
            self.store.touch(url, now)?;
            return Ok(false);
        }

        self.store.upsert(url, html, &item.source_name, now, content_hash)?;
        Ok(true)
    }

    /// Extracts, filters and enqueues the links of a fetched page
    ///
    /// Returns how many links were added to the frontier.
    fn enqueue_links(&mut self, item: &FrontierItem, html: &str, base_url: &str) -> usize {
        let links = match self.extractor.extract(html, base_url) {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!("Link extraction failed for {}: {}", item.url, e);
                return 0;
            }
        };

        let domain = item.url.domain();
        let mut added = 0;

        for link in links {
            let Some(url) = followable_link(&link, &domain, &self.politeness) else {
                continue;
            };
            if self.frontier.was_enqueued(url.as_str()) || !self.should_recheck(url.as_str()) {
                continue;
            }
            if self
                .frontier
                .push(FrontierItem::new(url, item.source_name.as_str(), item.depth + 1))
            {
                added += 1;
            }
        }

        added
    }

    /// Whether a URL is new or its stored copy is older than the recheck interval
    pub fn should_recheck(&self, url: &str) -> bool {
        should_recheck(&self.store, &self.visited, url, &self.config)
    }

    fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Sleeps for `wait` unless shutdown is signalled first
    ///
    /// Returns `false` if shutdown won.
    async fn wait_or_shutdown(&mut self, wait: Duration) -> bool {
        tracing::debug!("Waiting {:?} before next request", wait);
        tokio::select! {
            _ = tokio::time::sleep(wait) => true,
            _ = shutdown_signalled(&mut self.shutdown) => false,
        }
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

/// Normalizes an extracted link and keeps it only if it stays on `domain`
/// and the site policies let it be followed
fn followable_link(link: &str, domain: &str, politeness: &PolitenessEngine) -> Option<CanonicalUrl> {
    let url = normalize_url(link, None).ok()?;
    if url.domain() != domain || !politeness.link_permitted(&url) {
        return None;
    }
    Some(url)
}

/// Revisit policy shared by seeding, replay and the crawl loop
///
/// Store errors count as due so that a bad record is refreshed rather than
/// skipped forever.
fn should_recheck<S: DocumentStore + ?Sized>(
    store: &S,
    visited: &HashSet<String>,
    url: &str,
    config: &CrawlerConfig,
) -> bool {
    if !visited.contains(url) {
        return true;
    }

    match store.visited_record(url) {
        Ok(Some(record)) => Utc::now() - record.last_crawl_time > config.recheck_interval(),
        Ok(None) => true,
        Err(e) => {
            tracing::warn!("Could not read stored record for {}: {}", url, e);
            true
        }
    }
}

/// Resolves once the shutdown flag is set
///
/// Never resolves if the sender is dropped without signalling.
async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Opens the configured SQLite store and runs a complete crawl
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open (or create) the document store
/// 2. Seed and restore the frontier
/// 3. Fetch pages and follow links until done or interrupted
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - The crawl ran to a stop condition
/// * `Err(HarvestError)` - The store could not be opened or read
pub async fn run_crawl(config: &Config, shutdown: watch::Receiver<bool>) -> Result<CrawlSummary, HarvestError> {
    let store = SqliteStorage::new(Path::new(&config.storage.database_path))?;
    let mut orchestrator = Orchestrator::new(config, store, shutdown)?;
    Ok(orchestrator.run().await)
}
