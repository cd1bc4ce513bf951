use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig};
use docsweep_core::error::AppError;
use docsweep_core::models::Page;
use docsweep_core::traits::PageLoader;
use futures::StreamExt;
use url::Url;

use crate::guard::HostGuard;
use crate::html::parse_page;

/// Page loader driving Chromium over the DevTools protocol.
///
/// Pages are rendered, scripts included, before their HTML is read, so
/// client-side rendered documentation sites can be crawled. One browser
/// process is shared by all clones; each [`PageLoader::load`] opens a tab
/// and closes it afterwards.
///
/// As with the HTTP loader, private and reserved addresses are refused by
/// default. Both the requested URL and the URL the tab ends up on are checked.
///
/// ```rust,no_run
/// use docsweep_client::BrowserLoader;
/// use docsweep_core::traits::PageLoader;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let loader = BrowserLoader::launch(true).await?;
/// let page = loader.load("https://example.com").await?;
/// println!("{} links", page.links.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BrowserLoader {
    browser: Arc<Browser>,
    timeout: Duration,
    guard: HostGuard,
}

impl BrowserLoader {
    /// Launch Chromium with a 30 s navigation timeout.
    ///
    /// `headless = false` opens a visible window, which helps when debugging
    /// what a crawl actually sees.
    pub async fn launch(headless: bool) -> Result<Self, AppError> {
        Self::launch_with_timeout(headless, Duration::from_secs(30)).await
    }

    pub async fn launch_with_timeout(headless: bool, timeout: Duration) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();
        if let Some(bin) = find_chrome_binary() {
            tracing::info!(binary = %bin.display(), "Using Chrome binary");
            builder = builder.chrome_executable(bin);
        }
        builder = if headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };

        let config = builder
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--no-first-run")
            .build()
            .map_err(|e| AppError::Generic(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::Generic(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled for the connection to make progress.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!(error = %e, "Browser CDP handler error");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            timeout,
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

    async fn render(&self, url: &str) -> Result<(String, String), AppError> {
        let tab = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to navigate to {url}: {e}")))?;

        tab.find_element("body")
            .await
            .map_err(|e| AppError::HttpError(format!("Page did not render body: {e}")))?;
        let html = tab
            .content()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read page content: {e}")))?;
        let final_url = tab
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        if let Err(e) = tab.close().await {
            tracing::debug!(%url, error = %e, "Failed to close tab");
        }
        Ok((final_url, html))
    }
}

/// `CHROME_BIN`, then well-known install locations. The snap wrapper at
/// `/snap/bin/chromium` drops unknown flags, so the binary inside the snap
/// is preferred. `None` lets chromiumoxide search on its own.
fn find_chrome_binary() -> Option<PathBuf> {
    const CANDIDATES: &[&str] = &[
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ];

    std::env::var_os("CHROME_BIN")
        .map(PathBuf::from)
        .filter(|p| p.exists())
        .or_else(|| CANDIDATES.iter().map(PathBuf::from).find(|p| p.exists()))
}

impl PageLoader for BrowserLoader {
    async fn load(&self, url: &str) -> Result<Page, AppError> {
        let parsed = Url::parse(url).map_err(|e| AppError::malformed_url(url, e))?;
        self.guard.check(&parsed).await?;

        let (final_url, html) = tokio::time::timeout(self.timeout, self.render(url))
            .await
            .map_err(|_| AppError::Timeout(self.timeout.as_secs()))??;

        self.guard.check_landing(url, &final_url).await?;
        Ok(parse_page(&final_url, html))
    }
}
