//! Index synchronization engine.
//!
//! Brings every in-scope file to a fresh state in the index before it is
//! searched. Each file moves through a small state machine:
//!
//! ```text
//! lookup ─┬─▶ Absent ──create → add_context → refresh──▶ synced
//!         ├─▶ Stale  ──update → add_context → refresh──▶ synced
//!         ├─▶ Fresh  ─────────────────────────────────▶ synced
//!         └─▶ Err    ─────────────────────────────────▶ request aborted
//! ```
//!
//! A document is stale when any of its url, title or last-updated fields is
//! missing, or when it is older than the staleness window. Context is always
//! attached after the content write and the refresh always comes last, so a
//! refresh never publishes content without its provenance.
//!
//! Files are processed sequentially. A failed write, context or refresh is
//! recorded in the [`SyncReport`] and the remaining files still sync. A
//! failed lookup is not: the file's freshness is unknown, so the batch stops
//! and the error is returned. A document left without context by a partial
//! failure is seen as stale on the next request and rewritten.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::clock::Clock;
use crate::error::{MetadataError, SyncAction, SyncActionError};
use crate::index::{DocumentLookup, IndexService};
use crate::metadata::FileMetadata;
use crate::models::{DocumentContext, FileState, StaleReason, SyncDecision};

/// Everything needed to write one file into the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncItem {
    pub file_id: String,
    pub text: String,
    pub url: String,
    pub title: String,
}

/// Join downloaded contents with their metadata, ordered by file id.
pub fn build_items(
    contents: HashMap<String, String>,
    metadata: &FileMetadata,
) -> Result<Vec<SyncItem>, MetadataError> {
    let mut items = contents
        .into_iter()
        .map(|(file_id, text)| {
            let url = metadata
                .view_links
                .get(&file_id)
                .cloned()
                .ok_or_else(|| MetadataError::MissingField {
                    file_id: file_id.clone(),
                    field: "webViewLink",
                })?;
            let title = metadata
                .titles
                .get(&file_id)
                .cloned()
                .ok_or_else(|| MetadataError::MissingField {
                    file_id: file_id.clone(),
                    field: "name",
                })?;
            Ok(SyncItem {
                file_id,
                text,
                url,
                title,
            })
        })
        .collect::<Result<Vec<_>, MetadataError>>()?;
    items.sort_by(|a, b| a.file_id.cmp(&b.file_id));
    Ok(items)
}

/// Classify a lookup result against the staleness window.
pub fn classify(lookup: &DocumentLookup, now: i64, staleness_window: i64) -> FileState {
    let doc = match lookup {
        DocumentLookup::NotFound => return FileState::Absent,
        DocumentLookup::Found(doc) => doc,
    };

    let content = &doc.content;
    let last_updated = match (&content.url, &content.title, content.last_updated) {
        (Some(_), Some(_), Some(ts)) => ts,
        _ => return FileState::Stale(StaleReason::MissingMetadata),
    };

    let age = now.saturating_sub(last_updated);
    if age > staleness_window {
        FileState::Stale(StaleReason::Expired { age })
    } else {
        FileState::Fresh
    }
}

/// One async mutex per (index, document), shared across requests.
#[derive(Default)]
pub struct DocumentLocks {
    locks: Mutex<HashMap<(String, String), Arc<AsyncMutex<()>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `(index, doc_id)`.
    pub async fn acquire(&self, index: &str, doc_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Drop entries nobody holds or waits on.
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks
                .entry((index.to_string(), doc_id.to_string()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of documents currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|l| Arc::strong_count(l) > 1)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What happened to one file that synced without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub file_id: String,
    /// State observed before any action was taken.
    pub observed: FileState,
    pub decision: SyncDecision,
}

/// Result of syncing a batch of files.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub outcomes: Vec<FileOutcome>,
    pub failures: Vec<SyncActionError>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.file_id.clone()).collect()
    }

    pub fn count(&self, decision: SyncDecision) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.decision == decision)
            .count()
    }
}

pub struct IndexSyncEngine {
    index: Arc<dyn IndexService>,
    clock: Arc<dyn Clock>,
    locks: Arc<DocumentLocks>,
    staleness_window: i64,
}

impl IndexSyncEngine {
    pub fn new(
        index: Arc<dyn IndexService>,
        clock: Arc<dyn Clock>,
        locks: Arc<DocumentLocks>,
        staleness_window_secs: u64,
    ) -> Self {
        Self {
            index,
            clock,
            locks,
            staleness_window: i64::try_from(staleness_window_secs).unwrap_or(i64::MAX),
        }
    }

    /// Sync every item, one after another.
    ///
    /// Create, update, context and refresh failures are isolated to their
    /// file and collected in the report. A failed lookup leaves the file's
    /// freshness unknown and aborts the batch.
    pub async fn sync_all(
        &self,
        index: &str,
        items: &[SyncItem],
    ) -> Result<SyncReport, SyncActionError> {
        let mut report = SyncReport::default();

        for item in items {
            match self.sync_file(index, item).await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(err) if err.action == SyncAction::Lookup => {
                    tracing::error!(
                        index,
                        file_id = %err.file_id,
                        error = %err.source,
                        "document lookup failed"
                    );
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(
                        index,
                        file_id = %err.file_id,
                        action = %err.action,
                        error = %err.source,
                        "file sync failed"
                    );
                    report.failures.push(err);
                }
            }
        }

        tracing::info!(
            index,
            created = report.count(SyncDecision::Create),
            updated = report.count(SyncDecision::Update),
            fresh = report.count(SyncDecision::Skip),
            failed = report.failures.len(),
            "index sync finished"
        );
        Ok(report)
    }

    /// Sync one file while holding its document lock.
    pub async fn sync_file(
        &self,
        index: &str,
        item: &SyncItem,
    ) -> Result<FileOutcome, SyncActionError> {
        let _guard = self.locks.acquire(index, &item.file_id).await;
        let fail = |action: SyncAction| {
            let file_id = item.file_id.clone();
            move |source: anyhow::Error| SyncActionError {
                file_id,
                action,
                source,
            }
        };

        let lookup = self
            .index
            .get_document(index, &item.file_id)
            .await
            .map_err(fail(SyncAction::Lookup))?;

        let now = self.clock.now();
        let observed = classify(&lookup, now, self.staleness_window);
        let decision = observed.decision();

        match decision {
            SyncDecision::Create => {
                self.index
                    .create_document(index, &item.file_id, &item.text)
                    .await
                    .map_err(fail(SyncAction::Create))?;
            }
            SyncDecision::Update => {
                self.index
                    .update_document(index, &item.file_id, &item.text)
                    .await
                    .map_err(fail(SyncAction::Update))?;
            }
            SyncDecision::Skip => {
                tracing::debug!(index, file_id = %item.file_id, "document is fresh");
                return Ok(FileOutcome {
                    file_id: item.file_id.clone(),
                    observed,
                    decision,
                });
            }
        }

        let previous = match &lookup {
            DocumentLookup::Found(doc) => doc.content.last_updated,
            DocumentLookup::NotFound => None,
        };
        let context = DocumentContext {
            url: item.url.clone(),
            title: item.title.clone(),
            last_updated: previous.map_or(now, |prev| prev.max(now)),
        };
        self.index
            .add_context(index, &item.file_id, &context)
            .await
            .map_err(fail(SyncAction::AddContext))?;

        self.index
            .refresh(index)
            .await
            .map_err(fail(SyncAction::Refresh))?;

        tracing::debug!(index, file_id = %item.file_id, ?observed, ?decision, "document synced");
        Ok(FileOutcome {
            file_id: item.file_id.clone(),
            observed,
            decision,
        })
    }
}
