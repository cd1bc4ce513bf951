use docsweep_client::{SearchConfig, WebhookConfig};
use docsweep_core::error::AppError;
use docsweep_core::progress::ProgressConfig;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Meilisearch used when a submitted spec names none.
    pub search: Option<SearchConfig>,
    pub webhook: Option<WebhookConfig>,
    pub progress: ProgressConfig,
    /// Bearer token required on crawl endpoints (None = open).
    pub api_key: Option<String>,
    /// Let submitted specs crawl hosts on private networks.
    pub allow_private_urls: bool,
    /// Hosts exempt from the private network check.
    pub trusted_hosts: Vec<String>,
}

impl AppState {
    /// Read configuration from environment variables.
    ///
    /// - `MEILISEARCH_URL` / `MEILISEARCH_API_KEY` (optional defaults for specs)
    /// - `WEBHOOK_URL` / `WEBHOOK_TOKEN` / `WEBHOOK_INTERVAL` (optional)
    /// - `DOCSWEEP_SERVER_API_KEY` (optional)
    /// - `DOCSWEEP_ALLOW_PRIVATE_URLS` (optional, `true`/`1`)
    /// - `DOCSWEEP_TRUSTED_HOSTS` (optional, comma separated)
    pub fn from_env() -> Result<Self, AppError> {
        let allow_private_urls = parse_flag(
            "DOCSWEEP_ALLOW_PRIVATE_URLS",
            std::env::var("DOCSWEEP_ALLOW_PRIVATE_URLS").ok().as_deref(),
        )?;

        Ok(Self {
            search: SearchConfig::from_env().ok(),
            webhook: WebhookConfig::from_env(),
            progress: ProgressConfig::from_env()?,
            api_key: std::env::var("DOCSWEEP_SERVER_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            allow_private_urls,
            trusted_hosts: parse_host_list(std::env::var("DOCSWEEP_TRUSTED_HOSTS").ok().as_deref()),
        })
    }
}

fn parse_flag(name: &str, raw: Option<&str>) -> Result<bool, AppError> {
    let Some(raw) = raw else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(AppError::ConfigError(format!(
            "Invalid {name} '{raw}': expected true or false"
        ))),
    }
}

/// Comma separated host names; blanks are ignored.
fn parse_host_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}
