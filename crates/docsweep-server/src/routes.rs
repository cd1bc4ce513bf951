use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use serde::Serialize;

use docsweep_client::{MeilisearchClient, SearchConfig, StrategyCatalog, WebhookReporter};
use docsweep_core::error::AppError;
use docsweep_core::models::{CrawlReport, CrawlSpec};
use docsweep_core::{
    CrawlService, CrawlerEngine, EngineConfig, FanOutReporter, ProgressEvent, ProgressReporter,
    TracingProgressReporter,
};
use tokio::sync::oneshot;

use crate::auth::require_api_key;
use crate::error::ApiError;
use crate::state::AppState;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let crawl = Router::new()
        .route("/crawl", post(start_crawl))
        .route("/crawl/async", post(start_crawl))
        .route("/crawl/start", post(start_crawl_confirmed))
        .route("/crawl/sync", post(sync_crawl))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let public = Router::new()
        .route("/health", get(health))
        .route("/webhook", post(log_webhook));

    public.merge(crawl).with_state(state)
}

#[derive(Debug, Serialize)]
pub struct CrawlStartedResponse {
    pub status: &'static str,
    pub index_uid: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Parse and validate a submitted spec and pick the Meilisearch it targets.
fn accept_spec(state: &AppState, body: &[u8]) -> Result<(CrawlSpec, SearchConfig), ApiError> {
    let spec: CrawlSpec = serde_json::from_slice(body).map_err(AppError::from)?;
    spec.validate()?;
    let search = SearchConfig::resolve(&spec, state.search.as_ref())?;
    Ok((spec, search))
}

/// Fires once the `started` event has gone through the other reporters.
struct StartedSignal(std::sync::Mutex<Option<oneshot::Sender<()>>>);

impl StartedSignal {
    fn new(sender: oneshot::Sender<()>) -> Self {
        Self(std::sync::Mutex::new(Some(sender)))
    }
}

impl ProgressReporter for StartedSignal {
    async fn report(&self, event: ProgressEvent<'_>) {
        if !matches!(event, ProgressEvent::Started { .. }) {
            return;
        }
        let sender = self.0.lock().ok().and_then(|mut slot| slot.take());
        if let Some(sender) = sender {
            let _ = sender.send(());
        }
    }
}

async fn run_crawl(
    state: &AppState,
    spec: CrawlSpec,
    search: SearchConfig,
    started: Option<oneshot::Sender<()>>,
) -> Result<CrawlReport, AppError> {
    let client = MeilisearchClient::new(&search)?;
    let webhook = state
        .webhook
        .clone()
        .map(WebhookReporter::new)
        .transpose()?;
    let reporter = Arc::new(FanOutReporter::new(
        FanOutReporter::new(TracingProgressReporter, webhook),
        started.map(StartedSignal::new),
    ));
    let engine_config = EngineConfig::from_spec(&spec);

    #[cfg(feature = "browser")]
    let loader = docsweep_client::BrowserLoader::launch(spec.headless).await?;
    #[cfg(not(feature = "browser"))]
    let loader = docsweep_client::HttpLoader::with_options(
        std::time::Duration::from_secs(30),
        spec.user_agent.as_deref(),
    )?;

    let mut loader = if state.allow_private_urls {
        loader.allow_private_urls()
    } else {
        loader
    };
    for host in &state.trusted_hosts {
        loader = loader.trust_host(host);
    }

    let service = CrawlService::new(
        CrawlerEngine::new(loader, engine_config),
        client,
        StrategyCatalog,
        reporter,
        state.progress.clone(),
    );
    service.run(spec).await
}

// ---------------------------------------------------------------------------
// Crawl
// ---------------------------------------------------------------------------

/// Spawn the crawl, returning its index uid.
fn spawn_crawl(
    state: &Arc<AppState>,
    spec: CrawlSpec,
    search: SearchConfig,
    started: Option<oneshot::Sender<()>>,
) -> String {
    let index_uid = spec.index_uid.clone();
    tracing::info!(index = %index_uid, "Crawl accepted");

    let task_state = Arc::clone(state);
    let task_index = index_uid.clone();
    tokio::spawn(async move {
        match run_crawl(&task_state, spec, search, started).await {
            Ok(report) => tracing::info!(
                index = %report.index_uid,
                documents_sent = report.stats.documents_sent,
                swapped = report.swapped,
                "Background crawl finished"
            ),
            Err(e) => tracing::error!(index = %task_index, error = %e, "Background crawl failed"),
        }
    });
    index_uid
}

fn started_response(index_uid: String) -> impl IntoResponse {
    let response = CrawlStartedResponse {
        status: "started",
        index_uid,
    };
    (StatusCode::ACCEPTED, axum::Json(response))
}

/// Start a crawl in the background and return immediately.
pub async fn start_crawl(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let (spec, search) = accept_spec(&state, &body)?;
    let index_uid = spawn_crawl(&state, spec, search, None);
    Ok(started_response(index_uid))
}

/// Like [`start_crawl`], but answer only once the `started` webhook has been sent.
pub async fn start_crawl_confirmed(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let (spec, search) = accept_spec(&state, &body)?;
    let (sender, receiver) = oneshot::channel();
    let index_uid = spawn_crawl(&state, spec, search, Some(sender));
    if receiver.await.is_err() {
        tracing::warn!(index = %index_uid, "Crawl ended before it could start");
    }
    Ok(started_response(index_uid))
}

/// Run a crawl to completion and return its report.
pub async fn sync_crawl(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let (spec, search) = accept_spec(&state, &body)?;
    let report = run_crawl(&state, spec, search, None).await?;
    Ok(axum::Json(report))
}

// ---------------------------------------------------------------------------
// Webhook sink
// ---------------------------------------------------------------------------

/// Log webhook payloads, so a local server can be its own `WEBHOOK_URL`.
pub async fn log_webhook(axum::Json(payload): axum::Json<serde_json::Value>) -> impl IntoResponse {
    tracing::info!(%payload, "Webhook received");
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub async fn health() -> impl IntoResponse {
    axum::Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}
