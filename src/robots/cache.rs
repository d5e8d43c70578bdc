//! Per-domain robots policy
//!
//! A `RobotsPolicy` is built once per domain per crawl session and kept for
//! the rest of the session.

use crate::robots::ParsedRobots;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Robots rules and declared crawl delay for one domain
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    /// The parsed robots.txt rules
    pub rules: ParsedRobots,

    /// Crawl-delay declared for our user agent, if any
    pub crawl_delay: Option<Duration>,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,

    /// True when robots.txt could not be retrieved (server error or
    /// transport failure). Such a policy allows everything.
    pub fetch_failed: bool,
}

impl RobotsPolicy {
    /// Builds a policy from a robots.txt body
    pub fn from_content(content: &str, user_agent: &str) -> Self {
        let rules = ParsedRobots::from_content(content);
        let crawl_delay = rules
            .crawl_delay(user_agent)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

        Self {
            rules,
            crawl_delay,
            fetched_at: Utc::now(),
            fetch_failed: false,
        }
    }

    /// Policy for a site that has no robots.txt
    pub fn allow_all() -> Self {
        Self {
            rules: ParsedRobots::allow_all(),
            crawl_delay: None,
            fetched_at: Utc::now(),
            fetch_failed: false,
        }
    }

    /// Policy for a site whose robots.txt could not be retrieved
    pub fn unreachable() -> Self {
        Self {
            fetch_failed: true,
            ..Self::allow_all()
        }
    }

    /// Checks if a URL is allowed for the given user agent
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        self.fetch_failed || self.rules.is_allowed(url, user_agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UA: &str = "TestBot/1.0";

    #[test]
    fn test_from_content_reads_delay() {
        let policy = RobotsPolicy::from_content("User-agent: *\nCrawl-delay: 1.5", UA);
        assert_eq!(policy.crawl_delay, Some(Duration::from_millis(1500)));
        assert!(!policy.fetch_failed);
    }

    #[test]
    fn test_from_content_applies_rules() {
        let policy = RobotsPolicy::from_content("User-agent: *\nDisallow: /private/", UA);
        assert!(!policy.is_allowed("https://example.com/private/a", UA));
        assert!(policy.is_allowed("https://example.com/public", UA));
    }

    #[test]
    fn test_unreachable_allows_everything() {
        let policy = RobotsPolicy::unreachable();
        assert!(policy.fetch_failed);
        assert!(policy.crawl_delay.is_none());
        assert!(policy.is_allowed("https://example.com/anything", UA));
    }

    #[test]
    fn test_absurd_delay_ignored() {
        let policy = RobotsPolicy::from_content("User-agent: *\nCrawl-delay: 1e300", UA);
        assert_eq!(policy.crawl_delay, None);
    }
}
