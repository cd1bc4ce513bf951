use std::sync::Arc;

use crate::controller::TraversalController;
use crate::counters::Counters;
use crate::engine::CrawlEngine;
use crate::error::AppError;
use crate::models::{CrawlReport, CrawlSpec};
use crate::progress::{ProgressConfig, ProgressEvent, ProgressReporter};
use crate::publisher::{IndexPublisher, IndexTarget};
use crate::traits::{ExtractionStrategy, SearchEngine, StrategyFactory};

/// One crawl-and-publish run: started, init, settings, traverse, publish, completed.
///
/// The page source, search engine, strategy catalog and progress sink are
/// all injected, so tests drive it with in-memory doubles.
pub struct CrawlService<C, E, F, R>
where
    C: CrawlEngine,
    E: SearchEngine,
    F: StrategyFactory,
    R: ProgressReporter + 'static,
{
    engine: C,
    search: E,
    factory: F,
    reporter: Arc<R>,
    progress: ProgressConfig,
}

impl<C, E, F, R> CrawlService<C, E, F, R>
where
    C: CrawlEngine,
    E: SearchEngine,
    F: StrategyFactory,
    R: ProgressReporter + 'static,
{
    pub fn new(engine: C, search: E, factory: F, reporter: Arc<R>, progress: ProgressConfig) -> Self {
        Self {
            engine,
            search,
            factory,
            reporter,
            progress,
        }
    }

    /// Crawl the site described by `spec` and publish the resulting index.
    ///
    /// `Completed` is reported only after the index has been published; any
    /// error returned here means the previously published index is untouched.
    pub async fn run(&self, spec: CrawlSpec) -> Result<CrawlReport, AppError> {
        spec.validate()?;
        let spec = Arc::new(spec);
        self.reporter
            .report(ProgressEvent::Started { spec: &spec })
            .await;

        let counters = Arc::new(Counters::new());
        let publisher = Arc::new(IndexPublisher::new(
            self.search.clone(),
            &spec,
            Arc::clone(&counters),
        ));
        let target = publisher.init().await;

        let controller = TraversalController::new(
            Arc::clone(&spec),
            &self.factory,
            Arc::clone(&publisher),
            Arc::clone(&counters),
        )?;

        let settings = merge_settings(
            controller.strategy().index_settings(),
            spec.custom_settings.as_ref(),
        );
        if let Some(settings) = settings {
            publisher.update_settings(&settings).await?;
        }

        let summary = controller
            .run(&self.engine, Arc::clone(&self.reporter), self.progress.interval)
            .await?;
        let outcome = publisher.finish().await?;

        self.reporter
            .report(ProgressEvent::Completed {
                spec: &spec,
                documents_sent: outcome.documents_sent,
            })
            .await;

        Ok(CrawlReport {
            index_uid: spec.index_uid.clone(),
            staged: target == IndexTarget::Staging,
            swapped: outcome.swapped,
            stats: counters.snapshot(),
            pages_failed: summary.pages_failed,
        })
    }
}

/// Overlay `custom` settings on the strategy defaults, key by key.
pub fn merge_settings(
    defaults: Option<serde_json::Value>,
    custom: Option<&serde_json::Value>,
) -> Option<serde_json::Value> {
    match (defaults, custom) {
        (None, None) => None,
        (Some(defaults), None) => Some(defaults),
        (None, Some(custom)) => Some(custom.clone()),
        (Some(mut defaults), Some(custom)) => {
            match (defaults.as_object_mut(), custom.as_object()) {
                (Some(base), Some(overlay)) => {
                    for (key, value) in overlay {
                        base.insert(key.clone(), value.clone());
                    }
                    Some(defaults)
                }
                _ => Some(custom.clone()),
            }
        }
    }
}
