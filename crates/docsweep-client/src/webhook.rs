use std::time::Duration;

use chrono::Utc;
use docsweep_core::error::AppError;
use docsweep_core::progress::{ProgressEvent, ProgressReporter};
use reqwest::Client;
use serde::Serialize;

const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Webhook endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub url: String,
    pub token: Option<String>,
}

impl WebhookConfig {
    /// Read configuration from environment variables.
    ///
    /// - `WEBHOOK_URL` (optional; `None` disables the webhook)
    /// - `WEBHOOK_TOKEN` (optional bearer token)
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("WEBHOOK_URL").ok().filter(|u| !u.trim().is_empty())?;
        Some(Self {
            url,
            token: std::env::var("WEBHOOK_TOKEN").ok(),
        })
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    status: &'static str,
    index_uid: &'a str,
    start_urls: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<WebhookData>,
    date: String,
}

#[derive(Serialize)]
struct WebhookData {
    #[serde(skip_serializing_if = "Option::is_none")]
    nb_page_crawled: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nb_page_indexed: Option<u64>,
    nb_documents_sent: u64,
}

impl<'a> WebhookPayload<'a> {
    fn from_event(event: &ProgressEvent<'a>) -> Self {
        let (spec, data) = match *event {
            ProgressEvent::Started { spec } => (spec, None),
            ProgressEvent::Active { spec, stats } => (
                spec,
                Some(WebhookData {
                    nb_page_crawled: Some(stats.pages_visited),
                    nb_page_indexed: Some(stats.pages_indexed),
                    nb_documents_sent: stats.documents_sent,
                }),
            ),
            ProgressEvent::Completed {
                spec,
                documents_sent,
            } => (
                spec,
                Some(WebhookData {
                    nb_page_crawled: None,
                    nb_page_indexed: None,
                    nb_documents_sent: documents_sent,
                }),
            ),
        };
        Self {
            status: event.kind(),
            index_uid: &spec.index_uid,
            start_urls: &spec.start_urls,
            data,
            date: Utc::now().to_rfc3339(),
        }
    }
}

/// Posts crawl lifecycle events to an HTTP endpoint.
///
/// Delivery is best-effort: failures are logged and never affect the crawl.
/// The payload never includes the crawl spec's Meilisearch credentials.
#[derive(Clone)]
pub struct WebhookReporter {
    client: Client,
    config: WebhookConfig,
}

impl WebhookReporter {
    pub fn new(config: WebhookConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(DEFAULT_WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;
        Ok(Self { client, config })
    }

    async fn deliver(&self, payload: &WebhookPayload<'_>) -> Result<(), AppError> {
        let mut request = self.client.post(&self.config.url).json(payload);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| AppError::NetworkError(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "webhook returned HTTP {}",
                status.as_u16()
            )));
        }
        Ok(())
    }
}

impl ProgressReporter for WebhookReporter {
    async fn report(&self, event: ProgressEvent<'_>) {
        let payload = WebhookPayload::from_event(&event);
        match self.deliver(&payload).await {
            Ok(()) => tracing::debug!(status = payload.status, "Webhook delivered"),
            Err(e) => tracing::warn!(
                url = %self.config.url,
                status = payload.status,
                error = %e,
                "Webhook delivery failed"
            ),
        }
    }
}
