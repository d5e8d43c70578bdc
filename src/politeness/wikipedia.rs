//! Built-in rules for Wikipedia sites
//!
//! Wikipedia's robots.txt welcomes slow bots on article pages but lists a
//! long tail of machinery and project pages. This preset reproduces the
//! parts that matter for a document crawl: article pages are fetched without
//! consulting robots.txt, service paths are never fetched, and links are
//! only followed to articles.

use crate::politeness::overrides::{decoded_target, DomainPolicyOverride, PageCategory};
use crate::url::matches_wildcard;
use url::Url;

/// Path prefixes that are never fetched
const DENIED_PREFIXES: &[&str] = &["/w/", "/api/", "/trap/"];

/// Exceptions to `DENIED_PREFIXES` that robots.txt explicitly allows
const ALLOWED_EXCEPTIONS: &[&str] = &[
    "/w/api.php?action=mobileview&",
    "/w/load.php?",
    "/w/rest.php/site/v1/sitemap",
    "/api/rest_v1/?doc",
];

/// Namespaces for special pages, user pages and project pages
const SERVICE_NAMESPACES: &[&str] = &[
    "Special",
    "Spezial",
    "Spesial",
    "Служебная",
    "Специальная",
    "User",
    "User_talk",
    "Участник",
    "Участница",
    "Обсуждение_участника",
    "Обсуждение_участницы",
    "Wikipedia",
    "Википедия",
    "Talk",
    "Обсуждение",
    "Template",
    "Шаблон",
    "Help",
    "Справка",
    "Portal",
    "Портал",
    "d",
];

const MEDIA_NAMESPACES: &[&str] = &["File", "Файл", "Media", "Медиа", "Image", "Изображение"];

const LISTING_NAMESPACES: &[&str] = &["Category", "Категория", "Список"];

/// Built-in override for MediaWiki-hosted Wikipedia sites
#[derive(Debug, Clone)]
pub struct WikipediaPolicy {
    pattern: String,
}

impl WikipediaPolicy {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
        }
    }
}

/// Returns the namespace of a `/wiki/Namespace:Title` path, if any
fn namespace(target: &str) -> Option<&str> {
    let title = target.strip_prefix("/wiki/")?;
    let (ns, _) = title.split_once(':')?;
    Some(ns)
}

fn is_denied_path(target: &str) -> bool {
    if ALLOWED_EXCEPTIONS.iter().any(|e| target.starts_with(e)) {
        return false;
    }
    DENIED_PREFIXES.iter().any(|p| target.starts_with(p))
}

impl DomainPolicyOverride for WikipediaPolicy {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn applies_to(&self, domain: &str) -> bool {
        matches_wildcard(&self.pattern, domain)
    }

    fn denies(&self, url: &Url) -> bool {
        let target = decoded_target(url);
        is_denied_path(&target) || self.categorize(url) == PageCategory::Service
    }

    fn allows(&self, url: &Url) -> bool {
        self.categorize(url) == PageCategory::Content
    }

    fn categorize(&self, url: &Url) -> PageCategory {
        let target = decoded_target(url);

        if is_denied_path(&target) {
            return PageCategory::Service;
        }
        if !target.starts_with("/wiki/") || target == "/wiki/" {
            return PageCategory::Unknown;
        }

        match namespace(&target) {
            Some(ns) if MEDIA_NAMESPACES.contains(&ns) => PageCategory::Media,
            Some(ns) if LISTING_NAMESPACES.contains(&ns) => PageCategory::Listing,
            Some(ns) if SERVICE_NAMESPACES.contains(&ns) => PageCategory::Service,
            _ => PageCategory::Content,
        }
    }
}
