//! Frontier-driven crawl engine.
//!
//! The engine owns the frontier and the set of URLs already seen, keeps up
//! to `max_concurrency` page visits in flight and hands every loaded page
//! to a [`PageHandler`]. The handler decides which links go back into the
//! frontier.

use std::collections::{HashSet, VecDeque};
use std::future::Future;

use futures::StreamExt;
use futures::stream::FuturesUnordered;

use crate::classify::LinkFilter;
use crate::error::AppError;
use crate::models::{CrawlSpec, DEFAULT_MAX_CONCURRENCY, Page};
use crate::traits::PageLoader;

/// One fetched page, valid for the duration of a handler call.
#[derive(Debug, Clone, Copy)]
pub struct PageVisit<'a> {
    /// Resolved URL of the page (after redirects).
    pub url: &'a str,
    pub page: &'a Page,
}

impl<'a> PageVisit<'a> {
    pub fn new(page: &'a Page) -> Self {
        Self {
            url: &page.url,
            page,
        }
    }

    /// Select the page links to hand back to the frontier.
    ///
    /// Links pass `filter` first, then `transform`, which may rewrite a link
    /// or reject it by returning `None`.
    pub fn enqueue_links<F>(&self, filter: &LinkFilter<'_>, transform: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.page
            .links
            .iter()
            .filter(|link| filter.allows(link))
            .filter_map(|link| transform(link))
            .collect()
    }
}

/// Per-page callback driven by a [`CrawlEngine`].
///
/// Calls for different pages may be in flight at the same time.
pub trait PageHandler: Send + Sync {
    /// Process one page and return the links to enqueue.
    ///
    /// An error aborts the whole crawl.
    fn handle_page(
        &self,
        visit: PageVisit<'_>,
    ) -> impl Future<Output = Result<Vec<String>, AppError>> + Send;
}

/// Counters kept by the engine itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineSummary {
    pub pages_loaded: u64,
    pub pages_failed: u64,
}

/// Crawls from a set of start URLs until the frontier is exhausted.
pub trait CrawlEngine: Send + Sync {
    fn run<H: PageHandler>(
        &self,
        start_urls: &[String],
        handler: &H,
    ) -> impl Future<Output = Result<EngineSummary, AppError>> + Send;
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_concurrency: usize,
    /// Stop scheduling new pages after this many.
    pub max_pages: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_pages: None,
        }
    }
}

impl EngineConfig {
    pub fn from_spec(spec: &CrawlSpec) -> Self {
        Self {
            max_concurrency: spec.max_concurrency.max(1),
            max_pages: spec.max_pages,
        }
    }
}

/// [`CrawlEngine`] over any [`PageLoader`].
#[derive(Clone)]
pub struct CrawlerEngine<L: PageLoader> {
    loader: L,
    config: EngineConfig,
}

impl<L: PageLoader> CrawlerEngine<L> {
    pub fn new(loader: L, config: EngineConfig) -> Self {
        Self { loader, config }
    }

    async fn visit<H: PageHandler>(
        &self,
        url: String,
        handler: &H,
    ) -> Result<Option<(String, Vec<String>)>, AppError> {
        let page = match self.loader.load(&url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(%url, error = %e, "Failed to load page");
                return Ok(None);
            }
        };
        match handler.handle_page(PageVisit::new(&page)).await {
            Ok(links) => Ok(Some((page.url, links))),
            Err(e) if e.is_page_local() => {
                tracing::warn!(%url, error = %e, "Page handler failed");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl<L: PageLoader> CrawlEngine for CrawlerEngine<L> {
    async fn run<H: PageHandler>(
        &self,
        start_urls: &[String],
        handler: &H,
    ) -> Result<EngineSummary, AppError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut frontier: VecDeque<String> = VecDeque::new();
        for url in start_urls {
            if seen.insert(url.clone()) {
                frontier.push_back(url.clone());
            }
        }

        let mut summary = EngineSummary::default();
        let mut scheduled = 0usize;
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < self.config.max_concurrency {
                if self.config.max_pages.is_some_and(|max| scheduled >= max) {
                    break;
                }
                let Some(url) = frontier.pop_front() else {
                    break;
                };
                scheduled += 1;
                in_flight.push(self.visit(url, handler));
            }

            let Some(result) = in_flight.next().await else {
                break;
            };
            match result? {
                Some((resolved, links)) => {
                    summary.pages_loaded += 1;
                    // A redirect target counts as visited.
                    seen.insert(resolved);
                    for link in links {
                        if seen.insert(link.clone()) {
                            frontier.push_back(link);
                        }
                    }
                }
                None => summary.pages_failed += 1,
            }
        }

        tracing::debug!(
            pages_loaded = summary.pages_loaded,
            pages_failed = summary.pages_failed,
            pending = frontier.len(),
            "Frontier exhausted"
        );
        Ok(summary)
    }
}
