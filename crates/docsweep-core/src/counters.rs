use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::CrawlStats;

/// Run-scoped progress counters.
///
/// Incremented concurrently by page callbacks and the publisher, read by
/// the progress reporter. Counters only grow, so a relaxed snapshot is at
/// worst slightly behind.
#[derive(Debug, Default)]
pub struct Counters {
    pages_visited: AtomicU64,
    pages_indexed: AtomicU64,
    documents_sent: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_visited(&self) {
        self.pages_visited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn page_indexed(&self) {
        self.pages_indexed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn document_sent(&self) {
        self.documents_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn documents_sent(&self) -> u64 {
        self.documents_sent.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CrawlStats {
        CrawlStats {
            pages_visited: self.pages_visited.load(Ordering::Relaxed),
            pages_indexed: self.pages_indexed.load(Ordering::Relaxed),
            documents_sent: self.documents_sent.load(Ordering::Relaxed),
        }
    }
}
