//! Politeness engine
//!
//! Decides whether a URL may be fetched and how long to wait between
//! requests to the same domain. One engine exists per crawl session and owns
//! all per-domain state: cached robots policies, request timing and denial
//! bookkeeping.
//!
//! Authorization order for a URL:
//! 1. a site override that denies it → denied
//! 2. a site override that allows it → allowed, robots.txt not consulted
//! 3. robots.txt disabled in config → allowed
//! 4. the domain's robots policy (a failed robots fetch allows)

mod domain_state;
mod overrides;
mod wikipedia;

pub use domain_state::DomainState;
pub use overrides::{
    is_known_preset, DomainPolicyOverride, PageCategory, PatternPolicy, PolicySet,
};
pub use wikipedia::WikipediaPolicy;

use crate::config::CrawlerConfig;
use crate::robots::{fetch_robots, RobotsPolicy};
use crate::url::{extract_domain, CanonicalUrl};
use reqwest::Client;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use url::Url;

/// Per-session robots compliance and request spacing
#[derive(Debug)]
pub struct PolitenessEngine {
    client: Client,
    user_agent: String,
    respect_robots: bool,
    default_delay: Duration,
    delay_floor: Duration,
    overrides: PolicySet,
    robots: HashMap<String, RobotsPolicy>,
    domains: HashMap<String, DomainState>,
}

impl PolitenessEngine {
    /// Creates an engine for one crawl session
    ///
    /// `client` is used for robots.txt requests and should carry the same
    /// headers as page requests.
    pub fn new(client: Client, config: &CrawlerConfig, overrides: PolicySet) -> Self {
        Self {
            client,
            user_agent: config.user_agent.clone(),
            respect_robots: config.respect_robots_txt,
            default_delay: config.delay(),
            delay_floor: config.delay_floor(),
            overrides,
            robots: HashMap::new(),
            domains: HashMap::new(),
        }
    }

    /// Decides whether `url` may be fetched
    ///
    /// May fetch the domain's robots.txt the first time the domain is seen.
    pub async fn can_fetch(&mut self, url: &CanonicalUrl) -> bool {
        let Some(parsed) = url.to_url() else {
            return false;
        };
        let domain = extract_domain(&parsed).unwrap_or_default();

        if let Some(rule) = self.overrides.denied_by(&parsed) {
            let rule = rule.to_string();
            let first = self.domain_mut(&domain).record_denial();
            if first {
                tracing::info!(
                    "{} site policy denies some pages on {}; they will be skipped",
                    rule,
                    domain
                );
            }
            tracing::debug!("{} denied by {} site policy", url, rule);
            return false;
        }

        // Fetched even for override-allowed URLs so the declared crawl delay
        // is known before the first request
        if self.respect_robots {
            self.ensure_policy(&parsed).await;
        }

        if self.overrides.allows(&parsed) {
            return true;
        }

        if !self.respect_robots {
            return true;
        }

        let allowed = self
            .robots
            .get(&domain)
            .map_or(true, |policy| policy.is_allowed(url.as_str(), &self.user_agent));

        if !allowed {
            let first = self.domain_mut(&domain).record_denial();
            if first {
                tracing::info!(
                    "robots.txt disallows some pages on {}; they will be skipped",
                    domain
                );
            }
            tracing::debug!("{} disallowed by robots.txt", url);
        }

        allowed
    }

    /// Whether an extracted link may enter the frontier
    ///
    /// Checks site overrides only (deny rules and page category); robots.txt
    /// is left to fetch time so that no network access happens here.
    pub fn link_permitted(&self, url: &CanonicalUrl) -> bool {
        url.to_url()
            .map_or(false, |parsed| self.overrides.is_followable(&parsed))
    }

    /// Makes sure the robots policy for the URL's domain is loaded
    ///
    /// Fetches robots.txt at most once per domain per session. The robots.txt
    /// request counts as a request to the domain for delay purposes.
    pub async fn ensure_policy(&mut self, url: &Url) -> &RobotsPolicy {
        let domain = extract_domain(url).unwrap_or_default();

        if !self.robots.contains_key(&domain) {
            let policy = fetch_robots(&self.client, url, &self.user_agent).await;
            self.record_request(&domain);
            if let Some(delay) = policy.crawl_delay {
                tracing::debug!("{} declares a crawl delay of {:?}", domain, delay);
            }
            self.robots.insert(domain.clone(), policy);
        }

        self.robots
            .entry(domain)
            .or_insert_with(RobotsPolicy::unreachable)
    }

    /// Cached robots policy for a domain, if it has been loaded
    pub fn policy(&self, domain: &str) -> Option<&RobotsPolicy> {
        self.robots.get(domain)
    }

    /// Minimum spacing between two requests to `domain`
    ///
    /// The largest of the robots-declared delay, the configured delay and
    /// the configured floor.
    pub fn crawl_delay(&self, domain: &str) -> Duration {
        let declared = self
            .robots
            .get(domain)
            .and_then(|policy| policy.crawl_delay)
            .unwrap_or_default();

        declared.max(self.default_delay).max(self.delay_floor)
    }

    /// The configured floor for every delay and retry wait
    pub fn delay_floor(&self) -> Duration {
        self.delay_floor
    }

    /// Time left before `domain` may be requested again
    pub fn time_until_allowed(&self, domain: &str) -> Option<Duration> {
        self.domains
            .get(domain)?
            .time_until_next_request(self.crawl_delay(domain), Instant::now())
    }

    /// Records that a request to `domain` is being made now
    pub fn record_request(&mut self, domain: &str) {
        self.domain_mut(domain).record_request(Instant::now());
    }

    /// Number of URLs on `domain` refused so far
    pub fn denied_count(&self, domain: &str) -> u32 {
        self.domains.get(domain).map_or(0, |state| state.denied_count)
    }

    /// Number of requests made to `domain` so far
    pub fn request_count(&self, domain: &str) -> u32 {
        self.domains.get(domain).map_or(0, |state| state.request_count)
    }

    fn domain_mut(&mut self, domain: &str) -> &mut DomainState {
        self.domains.entry(domain.to_string()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::normalize_url;

    fn config() -> CrawlerConfig {
        CrawlerConfig {
            delay_between_requests: 2000,
            min_delay_floor: 5000,
            ..CrawlerConfig::default()
        }
    }

    fn engine(config: &CrawlerConfig, overrides: PolicySet) -> PolitenessEngine {
        PolitenessEngine::new(Client::new(), config, overrides)
    }

    #[test]
    fn test_crawl_delay_respects_floor() {
        let engine = engine(&config(), PolicySet::new());
        assert_eq!(engine.crawl_delay("example.com"), Duration::from_secs(5));
    }

    #[test]
    fn test_crawl_delay_uses_largest_value() {
        let mut engine = engine(&config(), PolicySet::new());
        engine.robots.insert(
            "example.com".to_string(),
            RobotsPolicy::from_content("User-agent: *\nCrawl-delay: 9", "AnyBot"),
        );
        engine.robots.insert(
            "quick.example.com".to_string(),
            RobotsPolicy::from_content("User-agent: *\nCrawl-delay: 1", "AnyBot"),
        );

        assert_eq!(engine.crawl_delay("example.com"), Duration::from_secs(9));
        assert_eq!(engine.crawl_delay("quick.example.com"), Duration::from_secs(5));
    }

    #[test]
    fn test_crawl_delay_when_robots_failed() {
        let mut engine = engine(&config(), PolicySet::new());
        engine
            .robots
            .insert("down.example.com".to_string(), RobotsPolicy::unreachable());
        assert_eq!(engine.crawl_delay("down.example.com"), Duration::from_secs(5));
    }

    #[test]
    fn test_time_until_allowed() {
        let mut engine = engine(&config(), PolicySet::new());
        assert_eq!(engine.time_until_allowed("example.com"), None);

        engine.record_request("example.com");
        let wait = engine.time_until_allowed("example.com").unwrap();
        assert!(wait > Duration::from_secs(4) && wait <= Duration::from_secs(5));

        // Other domains are unaffected
        assert_eq!(engine.time_until_allowed("other.com"), None);
        assert_eq!(engine.request_count("example.com"), 1);
    }

    #[tokio::test]
    async fn test_override_deny_wins_over_allow() {
        let mut overrides = PolicySet::new();
        overrides.push(Box::new(PatternPolicy::new(
            "example.com",
            vec!["/both/".to_string()],
            vec!["/both/".to_string()],
        )));
        let mut config = config();
        config.respect_robots_txt = false;
        let mut engine = engine(&config, overrides);

        let url = normalize_url("https://example.com/both/x", None).unwrap();
        assert!(!engine.can_fetch(&url).await);
        assert_eq!(engine.denied_count("example.com"), 1);
        assert!(engine.domains["example.com"].denial_reported);
    }

    #[tokio::test]
    async fn test_override_denial_claims_first_report() {
        let mut overrides = PolicySet::new();
        overrides.push(Box::new(PatternPolicy::new(
            "example.com",
            vec![],
            vec!["/blocked/".to_string()],
        )));
        let mut engine = engine(&config(), overrides);
        engine.robots.insert(
            "example.com".to_string(),
            RobotsPolicy::from_content("User-agent: *\nDisallow: /private/", "AnyBot"),
        );

        let blocked = normalize_url("https://example.com/blocked/a", None).unwrap();
        let private = normalize_url("https://example.com/private/a", None).unwrap();

        // The override denial is the first one and claims the report
        assert!(!engine.can_fetch(&blocked).await);
        assert!(engine.domains["example.com"].denial_reported);

        // A later robots denial on the same domain is counted but not reported again
        assert!(!engine.can_fetch(&private).await);
        assert_eq!(engine.denied_count("example.com"), 2);
        assert!(!engine.domain_mut("example.com").record_denial());
    }

    #[tokio::test]
    async fn test_robots_disabled_allows() {
        let mut config = config();
        config.respect_robots_txt = false;
        let mut engine = engine(&config, PolicySet::new());

        let url = normalize_url("https://example.com/anything", None).unwrap();
        assert!(engine.can_fetch(&url).await);
        assert!(engine.policy("example.com").is_none());
    }

    #[tokio::test]
    async fn test_cached_robots_policy_is_used() {
        let mut engine = engine(&config(), PolicySet::new());
        engine.robots.insert(
            "example.com".to_string(),
            RobotsPolicy::from_content("User-agent: *\nDisallow: /private/", "AnyBot"),
        );

        let open = normalize_url("https://example.com/open", None).unwrap();
        let closed = normalize_url("https://example.com/private/a", None).unwrap();
        let closed_too = normalize_url("https://example.com/private/b", None).unwrap();

        assert!(engine.can_fetch(&open).await);
        assert!(!engine.can_fetch(&closed).await);
        assert!(!engine.can_fetch(&closed_too).await);
        assert_eq!(engine.denied_count("example.com"), 2);
    }

    #[tokio::test]
    async fn test_override_allow_bypasses_robots() {
        let mut overrides = PolicySet::new();
        overrides.push(Box::new(PatternPolicy::new(
            "example.com",
            vec!["/private/ok/".to_string()],
            vec![],
        )));
        let mut engine = engine(&config(), overrides);
        engine.robots.insert(
            "example.com".to_string(),
            RobotsPolicy::from_content("User-agent: *\nDisallow: /private/", "AnyBot"),
        );

        let url = normalize_url("https://example.com/private/ok/page", None).unwrap();
        assert!(engine.can_fetch(&url).await);
    }

    #[tokio::test]
    async fn test_robots_fetch_counts_as_request() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
            .expect(1)
            .mount(&server)
            .await;

        let mut engine = engine(&config(), PolicySet::new());
        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        let domain = extract_domain(&url).unwrap();

        engine.ensure_policy(&url).await;
        engine.ensure_policy(&url).await;

        assert_eq!(engine.request_count(&domain), 1);
        assert!(engine.time_until_allowed(&domain).is_some());
    }

    #[test]
    fn test_link_permitted_uses_overrides() {
        let mut overrides = PolicySet::new();
        overrides.push(Box::new(WikipediaPolicy::new("*.wikipedia.org")));
        let engine = engine(&config(), overrides);

        let article = normalize_url("https://ru.wikipedia.org/wiki/Rust", None).unwrap();
        let category = normalize_url("https://ru.wikipedia.org/wiki/Категория:X", None).unwrap();
        let elsewhere = normalize_url("https://example.com/page", None).unwrap();

        assert!(engine.link_permitted(&article));
        assert!(!engine.link_permitted(&category));
        assert!(engine.link_permitted(&elsewhere));
    }
}
