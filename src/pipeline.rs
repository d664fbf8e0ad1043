//! End-to-end retrieval for one agent request.
//!
//! ```text
//! ScopeStore ─▶ build_scope ─▶ resolve ─▶ FileSource (get_files | search)
//!                                              │
//!                     empty? ◀─────────────────┘──▶ sentinel, no index calls
//!                                              │
//!     resolve_shortcuts ─▶ metadata::extract ─▶ download (bounded)
//!                                              │
//!     create_index_if_absent ─▶ IndexSyncEngine::sync_all ─▶ results::search
//! ```
//!
//! Scope, listing, metadata, index creation, document lookup and search
//! failures abort the request. Per-file sync failures do not: the search
//! still runs over whatever is indexed and the output is flagged incomplete.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, GOOGLE_DRIVE_TOOL_ID};
use crate::connector_drive::DriveSource;
use crate::error::{PipelineError, ScopeError, SourceFetchError};
use crate::index::http::HttpIndex;
use crate::index::IndexService;
use crate::metadata;
use crate::models::ResultChunk;
use crate::results;
use crate::scope::{self, ConfigScopeStore, ScopeResolution, ScopeStore};
use crate::source::{self, FileSource};
use crate::sync::{build_items, DocumentLocks, IndexSyncEngine};

/// Name of the per-agent Drive index.
pub fn index_name(agent_id: &str) -> String {
    format!("{}_{}", agent_id, GOOGLE_DRIVE_TOOL_ID)
}

/// What one request returns to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolOutput {
    pub chunks: Vec<ResultChunk>,
    /// Some in-scope files could not be synced; results may be stale or
    /// missing those files.
    pub indexing_incomplete: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_files: Vec<String>,
}

pub struct DrivePipeline {
    config: Config,
    scope_store: Arc<dyn ScopeStore>,
    source: Arc<dyn FileSource>,
    index: Arc<dyn IndexService>,
    engine: IndexSyncEngine,
}

impl DrivePipeline {
    pub fn new(
        config: Config,
        scope_store: Arc<dyn ScopeStore>,
        source: Arc<dyn FileSource>,
        index: Arc<dyn IndexService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_locks(
            config,
            scope_store,
            source,
            index,
            clock,
            Arc::new(DocumentLocks::new()),
        )
    }

    /// Like [`new`](Self::new) but sharing a lock registry with other
    /// pipelines in the same process.
    pub fn with_locks(
        config: Config,
        scope_store: Arc<dyn ScopeStore>,
        source: Arc<dyn FileSource>,
        index: Arc<dyn IndexService>,
        clock: Arc<dyn Clock>,
        locks: Arc<DocumentLocks>,
    ) -> Self {
        let engine = IndexSyncEngine::new(
            index.clone(),
            clock,
            locks,
            config.sync.staleness_window_secs,
        );
        Self {
            config,
            scope_store,
            source,
            index,
            engine,
        }
    }

    /// Production wiring: scopes from the config file, the Drive REST API
    /// and the HTTP index service.
    pub fn from_config(config: Config) -> Result<Self> {
        let scope_store = Arc::new(ConfigScopeStore::new(config.agents.clone()));
        let source = Arc::new(DriveSource::from_env(&config.source)?);
        let index = Arc::new(HttpIndex::new(&config.index)?);
        Ok(Self::new(
            config,
            scope_store,
            source,
            index,
            Arc::new(SystemClock),
        ))
    }

    /// Resolve an agent's scope without touching the file source or index.
    pub async fn resolve_scope(
        &self,
        agent_id: &str,
        query: &str,
    ) -> Result<Option<ScopeResolution>, PipelineError> {
        let artifacts = self
            .scope_store
            .artifacts(agent_id, GOOGLE_DRIVE_TOOL_ID)
            .await
            .map_err(|source| ScopeError::Store {
                agent_id: agent_id.to_string(),
                source,
            })?;
        if artifacts.is_empty() {
            return Ok(None);
        }
        let spec = scope::build_scope(agent_id, &artifacts, query)?;
        Ok(Some(scope::resolve(&spec, &self.config.source.mime_types)?))
    }

    /// Sync the agent's in-scope files and search them, bounded by the
    /// configured request timeout.
    pub async fn run(&self, agent_id: &str, query: &str) -> Result<ToolOutput, PipelineError> {
        let Some(secs) = self.config.request.timeout_secs else {
            return self.run_inner(agent_id, query).await;
        };
        tokio::time::timeout(Duration::from_secs(secs), self.run_inner(agent_id, query))
            .await
            .map_err(|_| {
                tracing::warn!(agent_id, timeout_secs = secs, "request timed out");
                PipelineError::Timeout(secs)
            })?
    }

    async fn run_inner(&self, agent_id: &str, query: &str) -> Result<ToolOutput, PipelineError> {
        let search_limit = self.config.retrieval.search_limit;

        let files = match self.resolve_scope(agent_id, query).await? {
            None => Vec::new(),
            Some(ScopeResolution::Files(ids)) => {
                tracing::debug!(agent_id, files = ids.len(), "fetching explicit files");
                self.source
                    .get_files(&ids)
                    .await
                    .map_err(SourceFetchError::Get)?
            }
            Some(ScopeResolution::Query(filter)) => {
                tracing::debug!(agent_id, %filter, "searching file source");
                self.source
                    .search(&filter, search_limit)
                    .await
                    .map_err(SourceFetchError::Search)?
            }
        };

        if files.is_empty() {
            tracing::info!(agent_id, "nothing in scope");
            return Ok(ToolOutput {
                chunks: results::empty_sentinel(),
                ..Default::default()
            });
        }

        let files = self
            .source
            .resolve_shortcuts(files)
            .await
            .map_err(SourceFetchError::Shortcuts)?;
        let meta = metadata::extract(&files)?;
        let contents = source::download(
            self.source.as_ref(),
            &meta.locators,
            self.config.source.download_concurrency,
        )
        .await?;

        let index = index_name(agent_id);
        self.index
            .create_index_if_absent(&index)
            .await
            .map_err(|source| PipelineError::Index {
                index: index.clone(),
                source,
            })?;

        let items = build_items(contents, &meta)?;
        let report = self
            .engine
            .sync_all(&index, &items)
            .await
            .map_err(|err| PipelineError::Lookup {
                index: index.clone(),
                file_id: err.file_id,
                source: err.source,
            })?;

        let chunks = results::search(self.index.as_ref(), &index, query, search_limit).await?;

        tracing::info!(
            agent_id,
            index = %index,
            files = items.len(),
            chunks = chunks.len(),
            incomplete = !report.is_complete(),
            "drive search complete"
        );
        Ok(ToolOutput {
            chunks,
            indexing_incomplete: !report.is_complete(),
            failed_files: report.failed_ids(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_name() {
        assert_eq!(index_name("agent-7"), "agent-7_google_drive");
    }

    #[test]
    fn test_output_omits_empty_failures() {
        let out = ToolOutput {
            chunks: results::empty_sentinel(),
            ..Default::default()
        };
        let json = serde_json::to_value(&out).unwrap();
        assert!(json.get("failed_files").is_none());
        assert_eq!(json["indexing_incomplete"], false);
        assert_eq!(json["chunks"][0]["text"], "");
    }
}
