//! Buffered, zero-downtime publication of crawled documents.
//!
//! When the target index does not exist yet, documents are written to it
//! directly. When it already serves readers, a staging index
//! (`<uid>_tmp`) is built instead and swapped in by [`IndexPublisher::finish`]
//! only if it ended up non-empty, so a failed or empty crawl never replaces
//! live data.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::counters::Counters;
use crate::error::AppError;
use crate::models::{CrawlSpec, DEFAULT_PRIMARY_KEY, Document};
use crate::traits::SearchEngine;

const STAGING_SUFFIX: &str = "_tmp";

/// Which index the run is writing to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexTarget {
    /// The named index did not exist; documents go straight into it.
    Primary,
    /// The named index is live; documents go to the staging index.
    Staging,
}

impl fmt::Display for IndexTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexTarget::Primary => write!(f, "primary"),
            IndexTarget::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Writing(IndexTarget),
    Finished,
}

struct PublisherState {
    phase: Phase,
    buffer: Vec<Document>,
}

/// Outcome of [`IndexPublisher::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOutcome {
    pub target: IndexTarget,
    pub swapped: bool,
    pub documents_sent: u64,
}

/// Owns the document buffer and the create/swap/cleanup lifecycle.
pub struct IndexPublisher<E: SearchEngine> {
    engine: E,
    index_uid: String,
    staging_uid: String,
    primary_key: String,
    strip_uid: bool,
    batch_size: usize,
    counters: Arc<Counters>,
    state: Mutex<PublisherState>,
}

impl<E: SearchEngine> IndexPublisher<E> {
    pub fn new(engine: E, spec: &CrawlSpec, counters: Arc<Counters>) -> Self {
        Self {
            engine,
            index_uid: spec.index_uid.clone(),
            staging_uid: format!("{}{STAGING_SUFFIX}", spec.index_uid),
            primary_key: spec.primary_key().to_string(),
            strip_uid: spec.has_custom_primary_key(),
            batch_size: spec.batch_size.max(1),
            counters,
            state: Mutex::new(PublisherState {
                phase: Phase::Uninitialized,
                buffer: Vec::new(),
            }),
        }
    }

    pub fn index_uid(&self) -> &str {
        &self.index_uid
    }

    pub fn staging_uid(&self) -> &str {
        &self.staging_uid
    }

    /// The index currently receiving writes, if initialized.
    pub async fn target(&self) -> Option<IndexTarget> {
        match self.state.lock().await.phase {
            Phase::Writing(target) => Some(target),
            _ => None,
        }
    }

    /// Number of documents waiting for the next flush.
    pub async fn buffered(&self) -> usize {
        self.state.lock().await.buffer.len()
    }

    /// Select the write target and prepare its index.
    ///
    /// Failures are best-effort: they are logged and the publisher keeps the
    /// target it selected, since Meilisearch creates missing indexes on the
    /// first document write anyway.
    pub async fn init(&self) -> IndexTarget {
        let mut state = self.state.lock().await;
        if let Phase::Writing(target) = state.phase {
            return target;
        }

        let target = match self.engine.index_exists(&self.index_uid).await {
            Ok(true) => IndexTarget::Staging,
            Ok(false) => IndexTarget::Primary,
            Err(e) => {
                tracing::warn!(
                    index = %self.index_uid,
                    error = %e,
                    "Could not check whether the index exists, writing to it directly"
                );
                IndexTarget::Primary
            }
        };

        if let Err(e) = self.prepare(target).await {
            let e = AppError::IndexInitializationError(e.to_string());
            tracing::warn!(
                index = %self.write_uid(target),
                %target,
                error = %e,
                "Index initialization failed, continuing with the selected target"
            );
        }

        tracing::info!(
            index = %self.index_uid,
            write_index = %self.write_uid(target),
            %target,
            "Index publisher initialized"
        );
        state.phase = Phase::Writing(target);
        target
    }

    async fn prepare(&self, target: IndexTarget) -> Result<(), AppError> {
        if target == IndexTarget::Staging && self.engine.index_exists(&self.staging_uid).await? {
            tracing::info!(index = %self.staging_uid, "Deleting leftover staging index");
            let task = self.engine.delete_index(&self.staging_uid).await?;
            self.engine.wait_for_task(task).await?;
        }
        let uid = self.write_uid(target);
        let task = self.engine.create_index(uid, &self.primary_key).await?;
        self.engine.wait_for_task(task).await
    }

    fn write_uid(&self, target: IndexTarget) -> &str {
        match target {
            IndexTarget::Primary => &self.index_uid,
            IndexTarget::Staging => &self.staging_uid,
        }
    }

    fn writing(&self, phase: Phase) -> Result<IndexTarget, AppError> {
        match phase {
            Phase::Writing(target) => Ok(target),
            Phase::Uninitialized => Err(AppError::IndexInitializationError(
                "publisher used before init()".into(),
            )),
            Phase::Finished => Err(AppError::Generic(format!(
                "publisher for '{}' is already finished",
                self.index_uid
            ))),
        }
    }

    /// Queue a document, flushing synchronously once `batch_size` is reached.
    ///
    /// The lock is held through the flush so concurrent callers cannot
    /// overshoot the batch size or race an append against a flush.
    pub async fn add(&self, mut document: Document) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        let target = self.writing(state.phase)?;

        if self.strip_uid {
            document.remove(DEFAULT_PRIMARY_KEY);
        }
        self.counters.document_sent();
        state.buffer.push(document);

        if state.buffer.len() >= self.batch_size {
            self.flush(target, &mut state.buffer).await?;
        }
        Ok(())
    }

    async fn flush(&self, target: IndexTarget, buffer: &mut Vec<Document>) -> Result<(), AppError> {
        if buffer.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(buffer);
        let uid = self.write_uid(target);
        tracing::debug!(index = %uid, size = batch.len(), "Sending batch");

        let task = self.engine.add_documents(uid, &batch).await?;
        self.engine.wait_for_task(task).await
    }

    /// Apply index settings to the index currently receiving writes.
    pub async fn update_settings(&self, settings: &serde_json::Value) -> Result<(), AppError> {
        let state = self.state.lock().await;
        let target = self.writing(state.phase)?;
        let uid = self.write_uid(target);
        tracing::info!(index = %uid, "Updating index settings");

        let task = self.engine.update_settings(uid, settings).await?;
        self.engine.wait_for_task(task).await
    }

    /// Flush what is left and publish the result.
    pub async fn finish(&self) -> Result<PublishOutcome, AppError> {
        let mut state = self.state.lock().await;
        let target = self.writing(state.phase)?;
        self.flush(target, &mut state.buffer).await?;
        state.phase = Phase::Finished;

        let mut swapped = false;
        if target == IndexTarget::Staging {
            let stats = self.engine.get_stats(&self.staging_uid).await?;
            if stats.document_count > 0 {
                tracing::info!(
                    index = %self.index_uid,
                    staging = %self.staging_uid,
                    documents = stats.document_count,
                    "Swapping staging index into place"
                );
                let pair = (self.index_uid.clone(), self.staging_uid.clone());
                let task = self.engine.swap_indexes(&[pair]).await?;
                self.engine.wait_for_task(task).await?;
                swapped = true;
            } else {
                tracing::warn!(
                    index = %self.index_uid,
                    staging = %self.staging_uid,
                    "Staging index is empty, keeping the published index"
                );
            }

            // After a swap the staging name holds the retired index.
            let task = self.engine.delete_index(&self.staging_uid).await?;
            self.engine.wait_for_task(task).await?;
        }

        Ok(PublishOutcome {
            target,
            swapped,
            documents_sent: self.counters.documents_sent(),
        })
    }
}
