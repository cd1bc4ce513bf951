use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// A document produced by an extraction strategy and sent to the search engine.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Field the search engine uses as identity when no custom primary key is configured.
pub const DEFAULT_PRIMARY_KEY: &str = "uid";

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Which extraction strategy a crawl uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Default,
    #[serde(alias = "docssearch")]
    Docsearch,
    Schema,
}

/// Options for the `schema` strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSettings {
    /// Convert ISO-8601 date strings to unix timestamps.
    #[serde(default)]
    pub convert_dates: bool,
    /// Only keep JSON-LD objects whose `@type` equals this value.
    #[serde(default)]
    pub only_type: Option<String>,
}

/// Immutable configuration for one crawl-and-index run.
///
/// Field aliases accept the configuration files written for earlier
/// releases of the crawler (`crawled_urls`, `indexed_urls`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSpec {
    #[serde(alias = "crawled_urls")]
    pub start_urls: Vec<String>,

    #[serde(default, alias = "exclude_crawled_urls")]
    pub urls_to_exclude: Vec<String>,

    /// Defaults to `start_urls` when absent.
    #[serde(default, alias = "indexed_urls")]
    pub urls_to_index: Option<Vec<String>>,

    #[serde(default, alias = "exclude_indexed_urls")]
    pub urls_to_not_index: Vec<String>,

    #[serde(alias = "meilisearch_index_uid")]
    pub index_uid: String,

    #[serde(default)]
    pub primary_key: Option<String>,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub strategy: StrategyKind,

    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Raw index settings merged over the strategy defaults.
    #[serde(default)]
    pub custom_settings: Option<serde_json::Value>,

    #[serde(default, alias = "schema")]
    pub schema_settings: Option<SchemaSettings>,

    #[serde(default)]
    pub meilisearch_url: Option<String>,

    #[serde(default)]
    pub meilisearch_api_key: Option<String>,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default)]
    pub max_pages: Option<usize>,

    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_headless() -> bool {
    true
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl CrawlSpec {
    /// Minimal spec for the given roots and index, every other field at its default.
    pub fn new(start_urls: Vec<String>, index_uid: impl Into<String>) -> Self {
        Self {
            start_urls,
            urls_to_exclude: Vec::new(),
            urls_to_index: None,
            urls_to_not_index: Vec::new(),
            index_uid: index_uid.into(),
            primary_key: None,
            batch_size: DEFAULT_BATCH_SIZE,
            strategy: StrategyKind::Default,
            headless: true,
            custom_settings: None,
            schema_settings: None,
            meilisearch_url: None,
            meilisearch_api_key: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_pages: None,
            user_agent: None,
        }
    }

    /// Parse and validate a spec from JSON.
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let spec: CrawlSpec = serde_json::from_str(raw)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.start_urls.is_empty() {
            return Err(AppError::ConfigError(
                "start_urls must contain at least one URL".into(),
            ));
        }
        if self.index_uid.trim().is_empty() {
            return Err(AppError::ConfigError("index_uid must not be empty".into()));
        }
        if self.batch_size == 0 {
            return Err(AppError::ConfigError("batch_size must be at least 1".into()));
        }
        if self.max_concurrency == 0 {
            return Err(AppError::ConfigError(
                "max_concurrency must be at least 1".into(),
            ));
        }
        if let Some(settings) = &self.custom_settings {
            if !settings.is_object() {
                return Err(AppError::ConfigError(
                    "custom_settings must be a JSON object".into(),
                ));
            }
        }
        Ok(())
    }

    /// Roots whose pages are eligible for indexing.
    pub fn urls_to_index(&self) -> &[String] {
        self.urls_to_index.as_deref().unwrap_or(&self.start_urls)
    }

    /// The primary key sent to the search engine.
    pub fn primary_key(&self) -> &str {
        self.primary_key.as_deref().unwrap_or(DEFAULT_PRIMARY_KEY)
    }

    /// True when a primary key other than `uid` is configured.
    pub fn has_custom_primary_key(&self) -> bool {
        self.primary_key
            .as_deref()
            .is_some_and(|key| key != DEFAULT_PRIMARY_KEY)
    }
}

/// A loaded page, owned by the crawl engine for the duration of one callback.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Final URL after redirects.
    pub url: String,
    pub html: String,
    pub title: Option<String>,
    /// Outbound links, already resolved to absolute URLs.
    pub links: Vec<String>,
}

/// Point-in-time snapshot of the run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub pages_visited: u64,
    pub pages_indexed: u64,
    pub documents_sent: u64,
}

/// Outcome of a completed crawl.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub index_uid: String,
    /// True when the run was written to a staging index and swapped in.
    pub staged: bool,
    pub swapped: bool,
    pub stats: CrawlStats,
    pub pages_failed: u64,
}

/// Handle of an asynchronous search engine task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task_uid: u64,
}

/// Subset of the index statistics the publisher needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub document_count: u64,
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
