pub mod classify;
pub mod controller;
pub mod counters;
pub mod crawl;
pub mod engine;
pub mod error;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod publisher;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use classify::{GlobList, LinkFilter, UrlClassifier, is_paginated};
pub use controller::TraversalController;
pub use counters::Counters;
pub use crawl::{CrawlService, merge_settings};
pub use engine::{CrawlEngine, CrawlerEngine, EngineConfig, EngineSummary, PageHandler, PageVisit};
pub use error::AppError;
pub use models::{
    CrawlReport, CrawlSpec, CrawlStats, Document, IndexStats, Page, SchemaSettings, StrategyKind,
    TaskHandle, compute_hash,
};
pub use normalize::normalize_link;
pub use progress::{
    FanOutReporter, ProgressConfig, ProgressEvent, ProgressReporter, TracingProgressReporter,
};
pub use publisher::{IndexPublisher, IndexTarget, PublishOutcome};
pub use traits::{ExtractionStrategy, PageLoader, SearchEngine, StrategyFactory};
