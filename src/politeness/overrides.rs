//! Site-specific policy overrides
//!
//! Overrides are consulted before robots.txt. A deny rule always wins; an
//! allow rule lets a URL through without looking at robots.txt at all. They
//! also classify pages so that the crawler only follows links to content.

use crate::config::SitePolicyConfig;
use crate::politeness::wikipedia::WikipediaPolicy;
use crate::url::{extract_domain, matches_wildcard};
use std::fmt;
use url::Url;

/// What kind of page a URL points to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageCategory {
    /// A regular document worth storing
    Content,
    /// An index of other pages (categories, lists)
    Listing,
    /// Site machinery: search, special pages, user pages, APIs
    Service,
    /// A file description or media page
    Media,
    /// The override has no opinion
    Unknown,
}

impl PageCategory {
    /// Whether links to pages of this category are followed
    pub fn is_followable(&self) -> bool {
        matches!(self, Self::Content | Self::Unknown)
    }
}

/// A per-site rule set checked ahead of robots.txt
pub trait DomainPolicyOverride: Send + Sync + fmt::Debug {
    /// Short name used in log messages
    fn name(&self) -> &str;

    /// Whether this override governs the given domain
    fn applies_to(&self, domain: &str) -> bool;

    /// Whether the URL must never be fetched
    fn denies(&self, url: &Url) -> bool;

    /// Whether the URL may be fetched regardless of robots.txt
    fn allows(&self, url: &Url) -> bool;

    /// Classifies the page behind the URL
    fn categorize(&self, _url: &Url) -> PageCategory {
        PageCategory::Unknown
    }
}

/// Returns true if `name` is a built-in preset usable in `[[site-policy]]`
pub fn is_known_preset(name: &str) -> bool {
    matches!(name, "wikipedia")
}

/// Returns the decoded path of a URL, with the query appended when present
///
/// Site rules are written in readable form (`/wiki/Служебная:`), so they
/// are matched against the decoded path.
pub(crate) fn decoded_target(url: &Url) -> String {
    let path = urlencoding::decode(url.path())
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| url.path().to_string());
    match url.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path,
    }
}

/// Config-driven override: path prefixes to allow and deny on matching sites
#[derive(Debug, Clone)]
pub struct PatternPolicy {
    pattern: String,
    allow: Vec<String>,
    deny: Vec<String>,
}

impl PatternPolicy {
    pub fn new(pattern: &str, allow: Vec<String>, deny: Vec<String>) -> Self {
        Self {
            pattern: pattern.to_string(),
            allow,
            deny,
        }
    }
}

impl DomainPolicyOverride for PatternPolicy {
    fn name(&self) -> &str {
        &self.pattern
    }

    fn applies_to(&self, domain: &str) -> bool {
        matches_wildcard(&self.pattern, domain)
    }

    fn denies(&self, url: &Url) -> bool {
        let target = decoded_target(url);
        self.deny.iter().any(|prefix| target.starts_with(prefix))
    }

    fn allows(&self, url: &Url) -> bool {
        let target = decoded_target(url);
        self.allow.iter().any(|prefix| target.starts_with(prefix))
    }
}

/// The overrides in force for a crawl session
#[derive(Debug, Default)]
pub struct PolicySet {
    policies: Vec<Box<dyn DomainPolicyOverride>>,
}

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the set from `[[site-policy]]` entries
    ///
    /// A preset contributes its built-in rules; explicit prefixes in the same
    /// entry are added on top of them.
    pub fn from_config(entries: &[SitePolicyConfig]) -> Self {
        let mut set = Self::new();

        for entry in entries {
            if entry.preset.as_deref() == Some("wikipedia") {
                set.push(Box::new(WikipediaPolicy::new(&entry.domain)));
            }
            if !entry.allow.is_empty() || !entry.deny.is_empty() {
                set.push(Box::new(PatternPolicy::new(
                    &entry.domain,
                    entry.allow.clone(),
                    entry.deny.clone(),
                )));
            }
        }

        set
    }

    pub fn push(&mut self, policy: Box<dyn DomainPolicyOverride>) {
        self.policies.push(policy);
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    fn applicable<'a>(
        &'a self,
        url: &Url,
    ) -> impl Iterator<Item = &'a dyn DomainPolicyOverride> + 'a {
        let domain = extract_domain(url).unwrap_or_default();
        self.policies
            .iter()
            .map(|p| &**p)
            .filter(move |p| p.applies_to(&domain))
    }

    /// Name of the first applicable override that denies the URL
    pub fn denied_by(&self, url: &Url) -> Option<&str> {
        self.applicable(url).find(|p| p.denies(url)).map(|p| p.name())
    }

    /// Whether any applicable override allows the URL outright
    pub fn allows(&self, url: &Url) -> bool {
        self.applicable(url).any(|p| p.allows(url))
    }

    /// First definite category reported by an applicable override
    pub fn categorize(&self, url: &Url) -> PageCategory {
        self.applicable(url)
            .map(|p| p.categorize(url))
            .find(|c| *c != PageCategory::Unknown)
            .unwrap_or(PageCategory::Unknown)
    }

    /// Whether an extracted link to this URL should be followed
    pub fn is_followable(&self, url: &Url) -> bool {
        self.denied_by(url).is_none() && self.categorize(url).is_followable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn pattern_set() -> PolicySet {
        let mut set = PolicySet::new();
        set.push(Box::new(PatternPolicy::new(
            "*.example.com",
            vec!["/open/".to_string(), "/both/".to_string()],
            vec!["/private/".to_string(), "/both/".to_string()],
        )));
        set
    }

    #[test]
    fn test_pattern_deny_and_allow() {
        let set = pattern_set();
        assert!(set.denied_by(&url("https://example.com/private/a")).is_some());
        assert!(set.denied_by(&url("https://example.com/public")).is_none());
        assert!(set.allows(&url("https://blog.example.com/open/x")));
        assert!(!set.allows(&url("https://example.com/public")));
    }

    #[test]
    fn test_pattern_only_applies_to_matching_domains() {
        let set = pattern_set();
        assert!(set.denied_by(&url("https://example.org/private/a")).is_none());
        assert!(!set.allows(&url("https://example.org/open/x")));
    }

    #[test]
    fn test_pattern_matches_decoded_path() {
        let mut set = PolicySet::new();
        set.push(Box::new(PatternPolicy::new(
            "example.com",
            vec![],
            vec!["/wiki/Служебная:".to_string()],
        )));
        let encoded = url("https://example.com/wiki/%D0%A1%D0%BB%D1%83%D0%B6%D0%B5%D0%B1%D0%BD%D0%B0%D1%8F:Search");
        assert!(set.denied_by(&encoded).is_some());
    }

    #[test]
    fn test_pattern_ignores_port() {
        let mut set = PolicySet::new();
        set.push(Box::new(PatternPolicy::new(
            "127.0.0.1",
            vec![],
            vec!["/private/".to_string()],
        )));
        assert!(set.denied_by(&url("http://127.0.0.1:4000/private/x")).is_some());
    }

    #[test]
    fn test_unknown_category_is_followable() {
        let set = pattern_set();
        let target = url("https://example.com/page");
        assert_eq!(set.categorize(&target), PageCategory::Unknown);
        assert!(set.is_followable(&target));
        assert!(!set.is_followable(&url("https://example.com/private/a")));
    }

    #[test]
    fn test_from_config_builds_presets_and_patterns() {
        let entries = vec![
            SitePolicyConfig {
                domain: "*.wikipedia.org".to_string(),
                preset: Some("wikipedia".to_string()),
                allow: vec![],
                deny: vec!["/extra/".to_string()],
            },
            SitePolicyConfig {
                domain: "example.com".to_string(),
                preset: None,
                allow: vec![],
                deny: vec![],
            },
        ];
        let set = PolicySet::from_config(&entries);
        assert_eq!(set.len(), 2);
        assert!(set.denied_by(&url("https://ru.wikipedia.org/extra/x")).is_some());
        assert!(set.denied_by(&url("https://ru.wikipedia.org/w/index.php")).is_some());
    }

    #[test]
    fn test_category_followability() {
        assert!(PageCategory::Content.is_followable());
        assert!(PageCategory::Unknown.is_followable());
        assert!(!PageCategory::Listing.is_followable());
        assert!(!PageCategory::Service.is_followable());
        assert!(!PageCategory::Media.is_followable());
    }

    #[test]
    fn test_known_presets() {
        assert!(is_known_preset("wikipedia"));
        assert!(!is_known_preset("mediawiki"));
    }
}
