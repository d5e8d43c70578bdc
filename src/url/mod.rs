//! URL handling module for Doc-Harvester
//!
//! This module provides URL canonicalization, domain extraction and
//! site-pattern matching. Everything here is pure: no I/O, no shared state.

mod domain;
mod matcher;
mod normalize;

use std::borrow::Borrow;
use std::fmt;

// Re-export main functions
pub use domain::{extract_domain, get_domain, is_same_domain, is_valid};
pub use matcher::matches_wildcard;
pub use normalize::normalize_url;

/// A URL in canonical form
///
/// Values are only produced by [`normalize_url`], so two `CanonicalUrl`s
/// are equal exactly when they name the same resource for dedup and
/// storage purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    /// Returns the canonical URL as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the underlying string
    pub fn into_string(self) -> String {
        self.0
    }

    /// Returns the domain of this URL (see [`get_domain`])
    pub fn domain(&self) -> String {
        get_domain(&self.0)
    }

    /// Parses the canonical string back into a `url::Url`
    pub fn to_url(&self) -> Option<::url::Url> {
        ::url::Url::parse(&self.0).ok()
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CanonicalUrl {
    fn borrow(&self) -> &str {
        &self.0
    }
}
