use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::counters::Counters;
use crate::error::AppError;
use crate::models::{CrawlSpec, CrawlStats};

pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(5000);

/// Lifecycle notifications of a crawl run.
#[derive(Debug, Clone, Copy)]
pub enum ProgressEvent<'a> {
    Started {
        spec: &'a CrawlSpec,
    },
    Active {
        spec: &'a CrawlSpec,
        stats: CrawlStats,
    },
    /// Sent only once the index has been published.
    Completed {
        spec: &'a CrawlSpec,
        documents_sent: u64,
    },
}

impl ProgressEvent<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            ProgressEvent::Started { .. } => "started",
            ProgressEvent::Active { .. } => "active",
            ProgressEvent::Completed { .. } => "completed",
        }
    }
}

/// Receives progress events (decoupled notification).
///
/// Reporting is observational: implementations log their own failures
/// instead of returning them.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent<'_>) -> impl Future<Output = ()> + Send;
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgressReporter;

impl ProgressReporter for TracingProgressReporter {
    async fn report(&self, event: ProgressEvent<'_>) {
        match event {
            ProgressEvent::Started { spec } => {
                tracing::info!(index = %spec.index_uid, start_urls = ?spec.start_urls, "Crawl started");
            }
            ProgressEvent::Active { spec, stats } => {
                tracing::info!(
                    index = %spec.index_uid,
                    pages_visited = stats.pages_visited,
                    pages_indexed = stats.pages_indexed,
                    documents_sent = stats.documents_sent,
                    "Crawl progress"
                );
            }
            ProgressEvent::Completed {
                spec,
                documents_sent,
            } => {
                tracing::info!(index = %spec.index_uid, %documents_sent, "Crawl completed");
            }
        }
    }
}

/// Reporter forwarding each event to two reporters.
#[derive(Debug, Clone)]
pub struct FanOutReporter<A, B> {
    first: A,
    second: B,
}

impl<A, B> FanOutReporter<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: ProgressReporter, B: ProgressReporter> ProgressReporter for FanOutReporter<A, B> {
    async fn report(&self, event: ProgressEvent<'_>) {
        self.first.report(event).await;
        self.second.report(event).await;
    }
}

/// An absent reporter ignores every event.
impl<R: ProgressReporter> ProgressReporter for Option<R> {
    async fn report(&self, event: ProgressEvent<'_>) {
        if let Some(inner) = self {
            inner.report(event).await;
        }
    }
}

/// Progress configuration read from the environment.
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    pub interval: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl ProgressConfig {
    /// Read configuration from environment variables.
    ///
    /// - `WEBHOOK_INTERVAL` (optional, milliseconds, defaults to 5000)
    pub fn from_env() -> Result<Self, AppError> {
        let interval = parse_interval(std::env::var("WEBHOOK_INTERVAL").ok().as_deref())?;
        Ok(Self { interval })
    }
}

fn parse_interval(raw: Option<&str>) -> Result<Duration, AppError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_PROGRESS_INTERVAL);
    };
    let millis: u64 = raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!(
            "Invalid WEBHOOK_INTERVAL '{raw}': must be a number of milliseconds"
        ))
    })?;
    if millis == 0 {
        return Err(AppError::ConfigError(
            "WEBHOOK_INTERVAL must be at least 1".into(),
        ));
    }
    Ok(Duration::from_millis(millis))
}

/// Periodically reports `Active` progress until stopped or dropped.
pub struct ProgressTicker {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    pub fn start<R>(
        reporter: Arc<R>,
        spec: Arc<CrawlSpec>,
        counters: Arc<Counters>,
        interval: Duration,
    ) -> Self
    where
        R: ProgressReporter + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let event = ProgressEvent::Active {
                            spec: &spec,
                            stats: counters.snapshot(),
                        };
                        reporter.report(event).await;
                    }
                }
            }
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Stop ticking and wait for an in-flight report to finish.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
