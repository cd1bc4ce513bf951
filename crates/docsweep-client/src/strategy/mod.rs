mod default;
mod docsearch;
mod schema;

pub use default::DefaultStrategy;
pub use docsearch::DocsearchStrategy;
pub use schema::SchemaStrategy;

use docsweep_core::error::AppError;
use docsweep_core::models::{CrawlSpec, Document, Page, StrategyKind};
use docsweep_core::traits::{ExtractionStrategy, StrategyFactory};

/// The extraction strategy selected by a crawl spec.
#[derive(Debug, Clone)]
pub enum Strategy {
    Default(DefaultStrategy),
    Docsearch(DocsearchStrategy),
    Schema(SchemaStrategy),
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Default(_) => StrategyKind::Default,
            Strategy::Docsearch(_) => StrategyKind::Docsearch,
            Strategy::Schema(_) => StrategyKind::Schema,
        }
    }
}

impl ExtractionStrategy for Strategy {
    // Parsed HTML is not `Send`, so extraction runs synchronously inside the future.
    async fn extract(&self, url: &str, page: &Page) -> Result<Vec<Document>, AppError> {
        match self {
            Strategy::Default(s) => s.extract_documents(url, page),
            Strategy::Docsearch(s) => s.extract_documents(url, page),
            Strategy::Schema(s) => s.extract_documents(url, page),
        }
    }

    fn index_settings(&self) -> Option<serde_json::Value> {
        match self {
            Strategy::Default(s) => Some(s.index_settings()),
            Strategy::Docsearch(s) => Some(s.index_settings()),
            Strategy::Schema(_) => None,
        }
    }
}

/// Builds the [`Strategy`] named by each crawl spec.
#[derive(Debug, Clone, Default)]
pub struct StrategyCatalog;

impl StrategyFactory for StrategyCatalog {
    type Strategy = Strategy;

    fn create(&self, spec: &CrawlSpec) -> Result<Strategy, AppError> {
        let strategy = match spec.strategy {
            StrategyKind::Default => Strategy::Default(DefaultStrategy),
            StrategyKind::Docsearch => Strategy::Docsearch(DocsearchStrategy),
            StrategyKind::Schema => {
                Strategy::Schema(SchemaStrategy::new(spec.schema_settings.clone().unwrap_or_default()))
            }
        };
        Ok(strategy)
    }
}
