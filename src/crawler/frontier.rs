//! Breadth-first crawl frontier
//!
//! A FIFO queue of URLs paired with the set of everything ever enqueued this
//! session, so a URL enters the queue at most once.

use crate::url::CanonicalUrl;
use std::collections::{HashSet, VecDeque};

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierItem {
    pub url: CanonicalUrl,

    /// Name of the seed source this URL was reached from
    pub source_name: String,

    /// Link distance from the seed (seeds are depth 0)
    pub depth: u32,
}

impl FrontierItem {
    pub fn new(url: CanonicalUrl, source_name: impl Into<String>, depth: u32) -> Self {
        Self {
            url,
            source_name: source_name.into(),
            depth,
        }
    }
}

/// FIFO frontier with session-wide deduplication
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FrontierItem>,
    enqueued: HashSet<CanonicalUrl>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item unless its URL was already enqueued this session
    ///
    /// Returns `true` if the item was added.
    pub fn push(&mut self, item: FrontierItem) -> bool {
        if !self.enqueued.insert(item.url.clone()) {
            return false;
        }
        self.queue.push_back(item);
        true
    }

    /// Takes the oldest item
    pub fn pop(&mut self) -> Option<FrontierItem> {
        self.queue.pop_front()
    }

    /// Number of items still waiting
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether `url` has been enqueued at any point this session
    pub fn was_enqueued(&self, url: &str) -> bool {
        self.enqueued.contains(url)
    }

    /// URLs still waiting, in order
    pub fn pending(&self) -> impl Iterator<Item = &FrontierItem> {
        self.queue.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::normalize_url;

    fn item(url: &str, depth: u32) -> FrontierItem {
        FrontierItem::new(normalize_url(url, None).unwrap(), "Example", depth)
    }

    #[test]
    fn test_fifo_order() {
        let mut frontier = Frontier::new();
        frontier.push(item("https://example.com/a", 0));
        frontier.push(item("https://example.com/b", 1));
        frontier.push(item("https://example.com/c", 1));

        assert_eq!(frontier.len(), 3);
        assert_eq!(frontier.pop().unwrap().url.as_str(), "https://example.com/a");
        assert_eq!(frontier.pop().unwrap().url.as_str(), "https://example.com/b");
        assert_eq!(frontier.pop().unwrap().url.as_str(), "https://example.com/c");
        assert!(frontier.pop().is_none());
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut frontier = Frontier::new();
        assert!(frontier.push(item("https://example.com/a", 0)));
        assert!(!frontier.push(item("https://example.com/a", 3)));
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn test_popped_url_stays_enqueued() {
        let mut frontier = Frontier::new();
        frontier.push(item("https://example.com/a", 0));
        frontier.pop();

        assert!(frontier.was_enqueued("https://example.com/a"));
        assert!(!frontier.push(item("https://example.com/a", 1)));
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_pending_iterates_in_order() {
        let mut frontier = Frontier::new();
        frontier.push(item("https://example.com/a", 0));
        frontier.push(item("https://example.com/b", 0));

        let urls: Vec<_> = frontier.pending().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/a", "https://example.com/b"]);
    }
}
