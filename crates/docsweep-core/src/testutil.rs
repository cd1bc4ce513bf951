//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::models::{
    CrawlSpec, DEFAULT_PRIMARY_KEY, Document, IndexStats, Page, StrategyKind, TaskHandle,
};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::traits::{ExtractionStrategy, PageLoader, SearchEngine, StrategyFactory};

// ---------------------------------------------------------------------------
// MockSearchEngine
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MockIndex {
    primary_key: Option<String>,
    documents: Vec<Document>,
}

#[derive(Default)]
struct SearchState {
    indexes: HashMap<String, MockIndex>,
    batches: Vec<(String, usize)>,
    swaps: Vec<(String, String)>,
    calls: Vec<String>,
    next_task: u64,
    add_error: Option<AppError>,
    create_error: Option<AppError>,
    swap_error: Option<AppError>,
}

impl SearchState {
    fn task(&mut self) -> TaskHandle {
        self.next_task += 1;
        TaskHandle {
            task_uid: self.next_task,
        }
    }
}

/// In-memory search engine. Tasks are applied immediately.
#[derive(Clone, Default)]
pub struct MockSearchEngine {
    state: Arc<Mutex<SearchState>>,
}

impl MockSearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate an index with `documents` placeholder documents.
    pub fn with_index(self, uid: &str, documents: u64) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let index = MockIndex {
                primary_key: Some(DEFAULT_PRIMARY_KEY.to_string()),
                documents: (0..documents).map(|i| make_document(1_000 + i)).collect(),
            };
            state.indexes.insert(uid.to_string(), index);
        }
        self
    }

    /// The next `add_documents` call fails with `error`.
    pub fn with_add_error(self, error: AppError) -> Self {
        self.state.lock().unwrap().add_error = Some(error);
        self
    }

    /// The next `create_index` call fails with `error`.
    pub fn with_create_error(self, error: AppError) -> Self {
        self.state.lock().unwrap().create_error = Some(error);
        self
    }

    /// The next `swap_indexes` call fails with `error`.
    pub fn with_swap_error(self, error: AppError) -> Self {
        self.state.lock().unwrap().swap_error = Some(error);
        self
    }

    pub fn has_index(&self, uid: &str) -> bool {
        self.state.lock().unwrap().indexes.contains_key(uid)
    }

    pub fn document_count(&self, uid: &str) -> Option<usize> {
        let state = self.state.lock().unwrap();
        state.indexes.get(uid).map(|i| i.documents.len())
    }

    pub fn documents(&self, uid: &str) -> Vec<Document> {
        let state = self.state.lock().unwrap();
        state
            .indexes
            .get(uid)
            .map(|i| i.documents.clone())
            .unwrap_or_default()
    }

    pub fn primary_key(&self, uid: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.indexes.get(uid).and_then(|i| i.primary_key.clone())
    }

    /// Sizes of every `add_documents` call made against `uid`, in order.
    pub fn batch_sizes(&self, uid: &str) -> Vec<usize> {
        let state = self.state.lock().unwrap();
        state
            .batches
            .iter()
            .filter(|(index, _)| index == uid)
            .map(|(_, size)| *size)
            .collect()
    }

    pub fn swaps(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().swaps.clone()
    }

    /// Every call as `operation:index`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl SearchEngine for MockSearchEngine {
    async fn index_exists(&self, uid: &str) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("index_exists:{uid}"));
        Ok(state.indexes.contains_key(uid))
    }

    async fn create_index(&self, uid: &str, primary_key: &str) -> Result<TaskHandle, AppError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create_index:{uid}"));
        if let Some(e) = state.create_error.take() {
            return Err(e);
        }
        state.indexes.insert(
            uid.to_string(),
            MockIndex {
                primary_key: Some(primary_key.to_string()),
                documents: Vec::new(),
            },
        );
        Ok(state.task())
    }

    async fn delete_index(&self, uid: &str) -> Result<TaskHandle, AppError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete_index:{uid}"));
        state.indexes.remove(uid);
        Ok(state.task())
    }

    async fn add_documents(&self, uid: &str, documents: &[Document]) -> Result<TaskHandle, AppError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("add_documents:{uid}"));
        if let Some(e) = state.add_error.take() {
            return Err(e);
        }
        state.batches.push((uid.to_string(), documents.len()));

        let index = state.indexes.entry(uid.to_string()).or_default();
        let key = index
            .primary_key
            .clone()
            .unwrap_or_else(|| DEFAULT_PRIMARY_KEY.to_string());
        for doc in documents {
            let existing = doc.get(&key).and_then(|id| {
                index
                    .documents
                    .iter()
                    .position(|d| d.get(&key) == Some(id))
            });
            match existing {
                Some(pos) => index.documents[pos] = doc.clone(),
                None => index.documents.push(doc.clone()),
            }
        }
        Ok(state.task())
    }

    async fn wait_for_task(&self, _task: TaskHandle) -> Result<(), AppError> {
        Ok(())
    }

    async fn get_stats(&self, uid: &str) -> Result<IndexStats, AppError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("get_stats:{uid}"));
        let index = state
            .indexes
            .get(uid)
            .ok_or_else(|| AppError::Generic(format!("index {uid} not found")))?;
        Ok(IndexStats {
            document_count: index.documents.len() as u64,
        })
    }

    async fn swap_indexes(&self, pairs: &[(String, String)]) -> Result<TaskHandle, AppError> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.swap_error.take() {
            return Err(e);
        }
        for (a, b) in pairs {
            state.calls.push(format!("swap_indexes:{a}:{b}"));
            state.swaps.push((a.clone(), b.clone()));
            let left = state.indexes.remove(a).unwrap_or_default();
            let right = state.indexes.remove(b).unwrap_or_default();
            state.indexes.insert(a.clone(), right);
            state.indexes.insert(b.clone(), left);
        }
        Ok(state.task())
    }

    async fn update_settings(
        &self,
        uid: &str,
        _settings: &serde_json::Value,
    ) -> Result<TaskHandle, AppError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("update_settings:{uid}"));
        Ok(state.task())
    }
}

// ---------------------------------------------------------------------------
// MockLoader
// ---------------------------------------------------------------------------

/// Mock loader serving a fixed site map of `url -> links`.
#[derive(Clone, Default)]
pub struct MockLoader {
    pages: Arc<Mutex<HashMap<String, Result<Page, String>>>>,
    pub loaded: Arc<Mutex<Vec<String>>>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, links: &[&str]) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(make_page(url, links)));
        self
    }

    pub fn with_failure(self, url: &str, message: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(message.to_string()));
        self
    }

    pub fn loaded(&self) -> Vec<String> {
        self.loaded.lock().unwrap().clone()
    }
}

impl PageLoader for MockLoader {
    async fn load(&self, url: &str) -> Result<Page, AppError> {
        self.loaded.lock().unwrap().push(url.to_string());
        match self.pages.lock().unwrap().get(url) {
            Some(Ok(page)) => Ok(page.clone()),
            Some(Err(message)) => Err(AppError::HttpError(message.clone())),
            None => Err(AppError::HttpError(format!("HTTP 404 for {url}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// MockStrategy
// ---------------------------------------------------------------------------

/// Mock strategy emitting `per_page` documents per page, or failing on
/// configured URLs.
#[derive(Clone, Default)]
pub struct MockStrategy {
    per_page: usize,
    failing: Arc<Mutex<Vec<String>>>,
    pub extracted: Arc<Mutex<Vec<String>>>,
}

impl MockStrategy {
    pub fn new(per_page: usize) -> Self {
        Self {
            per_page,
            ..Self::default()
        }
    }

    pub fn failing_on(self, url: &str) -> Self {
        self.failing.lock().unwrap().push(url.to_string());
        self
    }

    pub fn extracted(&self) -> Vec<String> {
        self.extracted.lock().unwrap().clone()
    }
}

impl ExtractionStrategy for MockStrategy {
    async fn extract(&self, url: &str, _page: &Page) -> Result<Vec<Document>, AppError> {
        if self.failing.lock().unwrap().iter().any(|u| u == url) {
            return Err(AppError::ExtractionError {
                url: url.to_string(),
                message: "unparsable page".into(),
            });
        }
        self.extracted.lock().unwrap().push(url.to_string());
        Ok((0..self.per_page)
            .map(|i| {
                let mut doc = Document::new();
                doc.insert("uid".into(), format!("{url}#{i}").into());
                doc.insert("url".into(), url.into());
                doc
            })
            .collect())
    }

    fn index_settings(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({"distinctAttribute": "url"}))
    }
}

/// Factory handing out clones of one [`MockStrategy`], recording the kinds requested.
#[derive(Clone, Default)]
pub struct MockStrategyFactory {
    strategy: MockStrategy,
    pub requested: Arc<Mutex<Vec<StrategyKind>>>,
}

impl MockStrategyFactory {
    pub fn new(strategy: MockStrategy) -> Self {
        Self {
            strategy,
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl StrategyFactory for MockStrategyFactory {
    type Strategy = MockStrategy;

    fn create(&self, spec: &CrawlSpec) -> Result<MockStrategy, AppError> {
        self.requested.lock().unwrap().push(spec.strategy);
        Ok(self.strategy.clone())
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock progress reporter that records event labels.
#[derive(Clone, Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressReporter for MockReporter {
    async fn report(&self, event: ProgressEvent<'_>) {
        let label = match &event {
            ProgressEvent::Started { .. } => "Started".to_string(),
            ProgressEvent::Active { stats, .. } => format!(
                "Active:{}/{}/{}",
                stats.pages_visited, stats.pages_indexed, stats.documents_sent
            ),
            ProgressEvent::Completed { documents_sent, .. } => {
                format!("Completed:{documents_sent}")
            }
        };
        self.events.lock().unwrap().push(label);
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

pub fn make_document(n: u64) -> Document {
    let mut doc = Document::new();
    doc.insert("uid".into(), format!("doc-{n}").into());
    doc.insert("title".into(), format!("Document {n}").into());
    doc
}

pub fn make_page(url: &str, links: &[&str]) -> Page {
    Page {
        url: url.to_string(),
        html: format!("<html><body><h1>{url}</h1></body></html>"),
        title: Some(url.to_string()),
        links: links.iter().map(|l| l.to_string()).collect(),
    }
}
