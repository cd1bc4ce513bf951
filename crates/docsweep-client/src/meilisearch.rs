use std::time::Duration;

use docsweep_core::error::AppError;
use docsweep_core::models::{CrawlSpec, Document, IndexStats, TaskHandle};
use docsweep_core::traits::SearchEngine;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_TASK_POLL_INTERVAL: Duration = Duration::from_millis(50);
const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(300);

/// Where the search engine lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub url: String,
    pub api_key: Option<String>,
}

impl SearchConfig {
    /// Read configuration from environment variables.
    ///
    /// - `MEILISEARCH_URL` (required)
    /// - `MEILISEARCH_API_KEY` (optional)
    pub fn from_env() -> Result<Self, AppError> {
        let url = std::env::var("MEILISEARCH_URL")
            .map_err(|_| AppError::ConfigError("MEILISEARCH_URL is not set".into()))?;
        Ok(Self {
            url,
            api_key: std::env::var("MEILISEARCH_API_KEY").ok(),
        })
    }

    /// Connection settings for one crawl: values in the crawl spec win over `fallback`.
    pub fn resolve(spec: &CrawlSpec, fallback: Option<&SearchConfig>) -> Result<Self, AppError> {
        let url = spec
            .meilisearch_url
            .clone()
            .or_else(|| fallback.map(|f| f.url.clone()))
            .ok_or_else(|| {
                AppError::ConfigError(
                    "no Meilisearch URL: set meilisearch_url in the crawl spec or MEILISEARCH_URL"
                        .into(),
                )
            })?;
        let api_key = spec
            .meilisearch_api_key
            .clone()
            .or_else(|| fallback.and_then(|f| f.api_key.clone()));
        Ok(Self { url, api_key })
    }
}

/// [`SearchEngine`] backed by the Meilisearch REST API.
///
/// Mutating calls return as soon as Meilisearch has enqueued the task;
/// [`wait_for_task`](SearchEngine::wait_for_task) polls `/tasks/{uid}`
/// until it reaches a terminal status.
#[derive(Clone)]
pub struct MeilisearchClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
    poll_interval: Duration,
    task_timeout: Duration,
}

impl MeilisearchClient {
    pub fn new(config: &SearchConfig) -> Result<Self, AppError> {
        Self::build(config, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(config: &SearchConfig, timeout: Duration) -> Result<Self, AppError> {
        Self::build(config, timeout)
    }

    /// How often and how long [`wait_for_task`](SearchEngine::wait_for_task) polls.
    pub fn with_task_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.task_timeout = timeout;
        self
    }

    fn build(config: &SearchConfig, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout_secs: timeout.as_secs(),
            poll_interval: DEFAULT_TASK_POLL_INTERVAL,
            task_timeout: DEFAULT_TASK_TIMEOUT,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, format!("{}{path}", self.base_url));
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, AppError> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })
    }

    /// Send a mutating request and return the task Meilisearch enqueued for it.
    async fn enqueue(&self, request: RequestBuilder) -> Result<TaskHandle, AppError> {
        let response = ensure_success(self.send(request).await?).await?;
        let task: SummarizedTask = response
            .json()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to parse task response: {e}")))?;
        Ok(TaskHandle {
            task_uid: task.task_uid,
        })
    }
}

// ---- Meilisearch API types ----

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummarizedTask {
    task_uid: u64,
}

#[derive(Deserialize)]
struct Task {
    status: TaskStatus,
    #[serde(default)]
    error: Option<MeiliError>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
enum TaskStatus {
    Enqueued,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

#[derive(Deserialize)]
struct MeiliError {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Stats {
    number_of_documents: u64,
}

/// Turn a non-2xx response into an [`AppError::IngestionError`] carrying Meilisearch's message.
async fn ensure_success(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let status_code = status.as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<MeiliError>(&body)
        .map(|e| match e.code {
            Some(code) => format!("{} ({code})", e.message),
            None => e.message,
        })
        .unwrap_or_else(|_| format!("HTTP {status_code}: {body}"));
    Err(AppError::IngestionError {
        message,
        status_code,
    })
}

impl SearchEngine for MeilisearchClient {
    async fn index_exists(&self, uid: &str) -> Result<bool, AppError> {
        let response = self
            .send(self.request(Method::GET, &format!("/indexes/{uid}")))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(response).await?;
        Ok(true)
    }

    async fn create_index(&self, uid: &str, primary_key: &str) -> Result<TaskHandle, AppError> {
        tracing::debug!(index = %uid, %primary_key, "Creating index");
        let body = json!({ "uid": uid, "primaryKey": primary_key });
        self.enqueue(self.request(Method::POST, "/indexes").json(&body))
            .await
    }

    async fn delete_index(&self, uid: &str) -> Result<TaskHandle, AppError> {
        tracing::debug!(index = %uid, "Deleting index");
        self.enqueue(self.request(Method::DELETE, &format!("/indexes/{uid}")))
            .await
    }

    async fn add_documents(&self, uid: &str, documents: &[Document]) -> Result<TaskHandle, AppError> {
        self.enqueue(
            self.request(Method::POST, &format!("/indexes/{uid}/documents"))
                .json(documents),
        )
        .await
    }

    async fn wait_for_task(&self, task: TaskHandle) -> Result<(), AppError> {
        let deadline = tokio::time::Instant::now() + self.task_timeout;
        loop {
            let response = ensure_success(
                self.send(self.request(Method::GET, &format!("/tasks/{}", task.task_uid)))
                    .await?,
            )
            .await?;
            let current: Task = response
                .json()
                .await
                .map_err(|e| AppError::HttpError(format!("Failed to parse task: {e}")))?;

            match current.status {
                TaskStatus::Succeeded => return Ok(()),
                TaskStatus::Failed | TaskStatus::Canceled => {
                    let message = current
                        .error
                        .map(|e| e.message)
                        .unwrap_or_else(|| format!("task {} was {:?}", task.task_uid, current.status));
                    tracing::warn!(task = task.task_uid, %message, "Meilisearch task did not succeed");
                    // The HTTP call itself succeeded; the task failed asynchronously.
                    return Err(AppError::IngestionError {
                        message,
                        status_code: StatusCode::UNPROCESSABLE_ENTITY.as_u16(),
                    });
                }
                TaskStatus::Enqueued | TaskStatus::Processing => {}
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(AppError::Timeout(self.task_timeout.as_secs()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn get_stats(&self, uid: &str) -> Result<IndexStats, AppError> {
        let response = ensure_success(
            self.send(self.request(Method::GET, &format!("/indexes/{uid}/stats")))
                .await?,
        )
        .await?;
        let stats: Stats = response
            .json()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to parse index stats: {e}")))?;
        Ok(IndexStats {
            document_count: stats.number_of_documents,
        })
    }

    async fn swap_indexes(&self, pairs: &[(String, String)]) -> Result<TaskHandle, AppError> {
        let body: Vec<_> = pairs
            .iter()
            .map(|(a, b)| json!({ "indexes": [a, b] }))
            .collect();
        self.enqueue(self.request(Method::POST, "/swap-indexes").json(&body))
            .await
    }

    async fn update_settings(
        &self,
        uid: &str,
        settings: &serde_json::Value,
    ) -> Result<TaskHandle, AppError> {
        self.enqueue(
            self.request(Method::PATCH, &format!("/indexes/{uid}/settings"))
                .json(settings),
        )
        .await
    }
}
