use std::time::Duration;

use docsweep_core::error::AppError;
use docsweep_core::models::Page;
use docsweep_core::traits::PageLoader;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use url::Url;

use crate::guard::HostGuard;
use crate::html::parse_page;

pub const DEFAULT_USER_AGENT: &str = concat!("docsweep/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 10;

/// Page loader over plain HTTP using reqwest.
///
/// Returns the served HTML without running scripts; use the browser loader
/// for sites that render their content client-side. Redirects are followed
/// hop by hop and the returned [`Page`] carries the final URL.
///
/// Every hop to a private or reserved address is refused unless
/// [`allow_private_urls`](Self::allow_private_urls) is called, since crawl
/// specs submitted to the server are untrusted.
#[derive(Clone)]
pub struct HttpLoader {
    client: Client,
    timeout_secs: u64,
    guard: HostGuard,
}

impl HttpLoader {
    pub fn new() -> Result<Self, AppError> {
        Self::with_options(DEFAULT_TIMEOUT, None)
    }

    pub fn with_options(timeout: Duration, user_agent: Option<&str>) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
            guard: HostGuard::default(),
        })
    }

    /// Allow crawling hosts on private networks (local docs servers).
    pub fn allow_private_urls(mut self) -> Self {
        self.guard.allow_private();
        self
    }

    /// Exempt `host` from the private address check.
    pub fn trust_host(mut self, host: &str) -> Self {
        self.guard.trust(host);
        self
    }

    /// GET `url`, following redirects and checking every hop against the guard.
    async fn fetch(&self, url: Url) -> Result<Response, AppError> {
        let mut current = url;
        for _ in 0..=MAX_REDIRECTS {
            self.guard.check(&current).await?;
            let response = self.client.get(current.clone()).send().await.map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {e}"))
                } else {
                    AppError::HttpError(e.to_string())
                }
            })?;

            if !response.status().is_redirection() {
                return Ok(response);
            }
            let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
            else {
                return Ok(response);
            };
            let next = current
                .join(location)
                .map_err(|e| AppError::malformed_url(location, e))?;
            tracing::debug!(from = %current, to = %next, "Following redirect");
            current = next;
        }
        Err(AppError::HttpError(format!(
            "Too many redirects (more than {MAX_REDIRECTS}) from {current}"
        )))
    }
}

impl PageLoader for HttpLoader {
    async fn load(&self, url: &str) -> Result<Page, AppError> {
        let parsed = Url::parse(url).map_err(|e| AppError::malformed_url(url, e))?;
        let response = self.fetch(parsed).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {url}",
                status.as_u16()
            )));
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !content_type.contains("html") {
                return Err(AppError::HttpError(format!(
                    "{url} is not an HTML page ({content_type})"
                )));
            }
        }

        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?;

        Ok(parse_page(&final_url, html))
    }
}
