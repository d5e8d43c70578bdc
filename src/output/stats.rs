//! Statistics generation from the document store
//!
//! This module provides functionality for extracting and displaying
//! what the store holds, independent of any crawl session.

use crate::storage::{DocumentStore, StorageResult};

/// Document store statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatistics {
    /// Total number of stored documents
    pub total_documents: u64,

    /// Document count per source name, sorted by name
    pub documents_by_source: Vec<(String, u64)>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `store` - The store to query
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(store: &dyn DocumentStore) -> StorageResult<StoreStatistics> {
    Ok(StoreStatistics {
        total_documents: store.count_documents()?,
        documents_by_source: store.count_by_source()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Document Store Statistics ===\n");
    println!("Total documents: {}", stats.total_documents);
    println!();

    if stats.documents_by_source.is_empty() {
        return;
    }

    println!("Documents by Source:");
    let mut counts: Vec<_> = stats.documents_by_source.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    for (source, count) in counts {
        let percentage = if stats.total_documents > 0 {
            (*count as f64 / stats.total_documents as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", source, count, percentage);
    }
}
