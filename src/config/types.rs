use serde::Deserialize;
use std::time::Duration;

/// Default User-Agent sent with every request
pub const DEFAULT_USER_AGENT: &str =
    "MAI-Crawler/1.0 (Educational Research Bot; +https://github.com/your-repo)";

/// Largest `recheck-interval-days` that fits in a `chrono::Duration`
pub const MAX_RECHECK_INTERVAL_DAYS: u64 = (i64::MAX / 86_400_000) as u64;

/// Main configuration structure for Doc-Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub storage: StorageConfig,
    #[serde(rename = "source", default)]
    pub sources: Vec<SourceConfig>,
    #[serde(rename = "site-policy", default)]
    pub site_policies: Vec<SitePolicyConfig>,
}

impl Config {
    /// Sources that take part in the crawl
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum link depth from a seed URL (seeds are depth 0)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of fetch attempts per session (0 = unlimited)
    #[serde(rename = "max-pages")]
    pub max_pages: u64,

    /// Default delay between requests to the same domain (milliseconds)
    #[serde(rename = "delay-between-requests")]
    pub delay_between_requests: u64,

    /// Lower bound for every delay and retry wait (milliseconds)
    #[serde(rename = "min-delay-floor")]
    pub min_delay_floor: u64,

    /// Age after which a stored document is fetched again (days)
    #[serde(rename = "recheck-interval-days")]
    pub recheck_interval_days: u64,

    /// HTTP request timeout (seconds)
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,

    /// Number of attempts per URL before giving up
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Base unit for linear retry backoff (milliseconds)
    #[serde(rename = "backoff-base")]
    pub backoff_base: u64,

    #[serde(rename = "respect-robots-txt")]
    pub respect_robots_txt: bool,

    /// Rebuild the frontier from stored documents on startup
    #[serde(rename = "restore-queue-from-saved")]
    pub restore_queue_from_saved: bool,

    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_pages: 0,
            delay_between_requests: 5000,
            min_delay_floor: 5000,
            recheck_interval_days: 7,
            request_timeout: 30,
            max_attempts: 3,
            backoff_base: 2000,
            respect_robots_txt: true,
            restore_queue_from_saved: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CrawlerConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_between_requests)
    }

    pub fn delay_floor(&self) -> Duration {
        Duration::from_millis(self.min_delay_floor)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_base)
    }

    /// Recheck interval, saturating at the largest representable duration
    pub fn recheck_interval(&self) -> chrono::Duration {
        i64::try_from(self.recheck_interval_days)
            .ok()
            .and_then(chrono::Duration::try_days)
            .unwrap_or(chrono::Duration::MAX)
    }
}

/// Document store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// A seed source: one starting URL whose domain bounds the crawl
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub url: String,

    /// Label stored with every document reached from this source
    pub name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Per-site allow/deny rules, optionally backed by a built-in preset
#[derive(Debug, Clone, Deserialize)]
pub struct SitePolicyConfig {
    /// Domain pattern (e.g., "example.com" or "*.example.com")
    pub domain: String,

    /// Name of a built-in policy (currently only "wikipedia")
    #[serde(default)]
    pub preset: Option<String>,

    /// Path prefixes that are always fetched, bypassing robots.txt
    #[serde(default)]
    pub allow: Vec<String>,

    /// Path prefixes that are never fetched
    #[serde(default)]
    pub deny: Vec<String>,
}
