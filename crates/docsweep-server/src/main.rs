use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use docsweep_server::routes;
use docsweep_server::state::AppState;

/// Crawl specs are small; anything larger is a mistake or abuse.
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("docsweep=info".parse()?))
        .with_target(false)
        .init();

    let port = std::env::var("DOCSWEEP_SERVER_PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("0.0.0.0:{port}");

    let state = AppState::from_env().context("Invalid server configuration")?;
    tracing::info!(
        meilisearch = ?state.search.as_ref().map(|s| s.url.as_str()),
        webhook = ?state.webhook.as_ref().map(|w| w.url.as_str()),
        auth = state.api_key.is_some(),
        allow_private_urls = state.allow_private_urls,
        trusted_hosts = ?state.trusted_hosts,
        "Server configuration loaded"
    );

    let app = routes::router(Arc::new(state))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for CTRL+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
