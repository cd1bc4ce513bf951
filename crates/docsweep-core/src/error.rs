use thiserror::Error;

/// Application-wide error types for docsweep.
#[derive(Error, Debug)]
pub enum AppError {
    /// A visited or discovered URL could not be parsed.
    #[error("Malformed URL '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },

    /// An extraction strategy failed on a page.
    #[error("Extraction error for {url}: {message}")]
    ExtractionError { url: String, message: String },

    /// Checking for or creating the target index failed.
    #[error("Index initialization error: {0}")]
    IndexInitializationError(String),

    /// The search engine rejected a write, swap or settings update.
    #[error("Ingestion error (HTTP {status_code}): {message}")]
    IngestionError { message: String, status_code: u16 },

    /// HTTP request failed (fetching a page or talking to the search engine).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid crawl spec or environment configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    pub fn malformed_url(url: &str, reason: impl ToString) -> Self {
        AppError::MalformedUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if this error only concerns the page being processed.
    ///
    /// Page-local errors are logged and the crawl moves on; everything else
    /// aborts the run before the index is swapped.
    pub fn is_page_local(&self) -> bool {
        matches!(
            self,
            AppError::MalformedUrl { .. } | AppError::ExtractionError { .. }
        )
    }
}
