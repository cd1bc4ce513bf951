use std::future::Future;

use crate::error::AppError;
use crate::models::{CrawlSpec, Document, IndexStats, Page, TaskHandle};

/// Loads a page and the links it points to.
pub trait PageLoader: Send + Sync + Clone {
    fn load(&self, url: &str) -> impl Future<Output = Result<Page, AppError>> + Send;
}

/// Turns a loaded page into search documents.
pub trait ExtractionStrategy: Send + Sync {
    /// Extract zero or more documents from `page`.
    ///
    /// Errors are reported as [`AppError::ExtractionError`] and only skip
    /// the page.
    fn extract(
        &self,
        url: &str,
        page: &Page,
    ) -> impl Future<Output = Result<Vec<Document>, AppError>> + Send;

    /// Index settings this strategy's documents are designed for.
    fn index_settings(&self) -> Option<serde_json::Value> {
        None
    }
}

/// Builds the extraction strategy selected by a crawl spec.
pub trait StrategyFactory: Send + Sync + Clone {
    type Strategy: ExtractionStrategy;

    fn create(&self, spec: &CrawlSpec) -> Result<Self::Strategy, AppError>;
}

/// The search engine operations needed to build and publish an index.
///
/// Mutating operations are asynchronous on the engine side and return a
/// [`TaskHandle`] to be awaited with [`SearchEngine::wait_for_task`].
pub trait SearchEngine: Send + Sync + Clone {
    fn index_exists(&self, uid: &str) -> impl Future<Output = Result<bool, AppError>> + Send;

    fn create_index(
        &self,
        uid: &str,
        primary_key: &str,
    ) -> impl Future<Output = Result<TaskHandle, AppError>> + Send;

    fn delete_index(&self, uid: &str)
    -> impl Future<Output = Result<TaskHandle, AppError>> + Send;

    fn add_documents(
        &self,
        uid: &str,
        documents: &[Document],
    ) -> impl Future<Output = Result<TaskHandle, AppError>> + Send;

    /// Block until the task finishes. A failed task is an error.
    fn wait_for_task(&self, task: TaskHandle)
    -> impl Future<Output = Result<(), AppError>> + Send;

    fn get_stats(&self, uid: &str) -> impl Future<Output = Result<IndexStats, AppError>> + Send;

    /// Atomically exchange the names of each pair of indexes.
    fn swap_indexes(
        &self,
        pairs: &[(String, String)],
    ) -> impl Future<Output = Result<TaskHandle, AppError>> + Send;

    fn update_settings(
        &self,
        uid: &str,
        settings: &serde_json::Value,
    ) -> impl Future<Output = Result<TaskHandle, AppError>> + Send;
}
