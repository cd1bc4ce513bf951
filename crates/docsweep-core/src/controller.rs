use std::sync::Arc;
use std::time::Duration;

use crate::classify::UrlClassifier;
use crate::counters::Counters;
use crate::engine::{CrawlEngine, EngineSummary, PageHandler, PageVisit};
use crate::error::AppError;
use crate::models::CrawlSpec;
use crate::normalize::normalize_link;
use crate::progress::{ProgressEvent, ProgressReporter, ProgressTicker};
use crate::publisher::IndexPublisher;
use crate::traits::{ExtractionStrategy, SearchEngine, StrategyFactory};

/// Drives a crawl engine over one [`CrawlSpec`].
///
/// For every page the engine loads, the controller decides whether to index
/// it, feeds extracted documents to the [`IndexPublisher`] and returns the
/// normalized in-scope links to the frontier.
pub struct TraversalController<S, E>
where
    S: ExtractionStrategy,
    E: SearchEngine,
{
    spec: Arc<CrawlSpec>,
    classifier: UrlClassifier,
    strategy: S,
    publisher: Arc<IndexPublisher<E>>,
    counters: Arc<Counters>,
}

impl<S, E> TraversalController<S, E>
where
    S: ExtractionStrategy,
    E: SearchEngine,
{
    pub fn new<F>(
        spec: Arc<CrawlSpec>,
        factory: &F,
        publisher: Arc<IndexPublisher<E>>,
        counters: Arc<Counters>,
    ) -> Result<Self, AppError>
    where
        F: StrategyFactory<Strategy = S>,
    {
        let classifier = UrlClassifier::from_spec(&spec)?;
        let strategy = factory.create(&spec)?;
        tracing::info!(strategy = ?spec.strategy, index = %spec.index_uid, "Traversal controller ready");

        Ok(Self {
            spec,
            classifier,
            strategy,
            publisher,
            counters,
        })
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn classifier(&self) -> &UrlClassifier {
        &self.classifier
    }

    /// Crawl until the engine's frontier is exhausted.
    ///
    /// `Active` progress is reported every `interval` while the crawl runs and
    /// once more with the final counters.
    pub async fn run<C, R>(
        &self,
        engine: &C,
        reporter: Arc<R>,
        interval: Duration,
    ) -> Result<EngineSummary, AppError>
    where
        C: CrawlEngine,
        R: ProgressReporter + 'static,
    {
        let ticker = ProgressTicker::start(
            Arc::clone(&reporter),
            Arc::clone(&self.spec),
            Arc::clone(&self.counters),
            interval,
        );

        // The ticker is cancelled on drop if the crawl fails.
        let summary = engine.run(&self.spec.start_urls, self).await?;
        ticker.stop().await;

        reporter
            .report(ProgressEvent::Active {
                spec: &self.spec,
                stats: self.counters.snapshot(),
            })
            .await;
        Ok(summary)
    }

    async fn index_page(&self, visit: &PageVisit<'_>) -> Result<(), AppError> {
        let indexable = match self.classifier.is_indexable(visit.url) {
            Ok(indexable) => indexable,
            Err(e) => {
                tracing::warn!(url = %visit.url, error = %e, "Skipping page");
                return Ok(());
            }
        };
        if !indexable {
            tracing::debug!(url = %visit.url, "Not indexed");
            return Ok(());
        }

        self.counters.page_indexed();
        let documents = match self.strategy.extract(visit.url, visit.page).await {
            Ok(documents) => documents,
            // Strategy failures only cost this page.
            Err(e) => {
                tracing::warn!(url = %visit.url, error = %e, "Extraction failed");
                return Ok(());
            }
        };

        tracing::debug!(url = %visit.url, documents = documents.len(), "Extracted");
        for document in documents {
            self.publisher.add(document).await?;
        }
        Ok(())
    }
}

impl<S, E> PageHandler for TraversalController<S, E>
where
    S: ExtractionStrategy,
    E: SearchEngine,
{
    async fn handle_page(&self, visit: PageVisit<'_>) -> Result<Vec<String>, AppError> {
        self.counters.page_visited();
        tracing::info!(url = %visit.url, title = ?visit.page.title, "Visiting page");

        match self.classifier.should_follow_links(visit.url) {
            Ok(true) => {}
            Ok(false) => return Ok(Vec::new()),
            Err(e) => {
                tracing::warn!(url = %visit.url, error = %e, "Skipping page");
                return Ok(Vec::new());
            }
        }

        self.index_page(&visit).await?;

        Ok(visit.enqueue_links(&self.classifier.link_filter(), normalize_link))
    }
}
