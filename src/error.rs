//! Error taxonomy for the sync and retrieval pipeline.
//!
//! Collaborators (file source, index service, scope store) report failures
//! as [`anyhow::Error`]; the pipeline wraps them into the typed errors below
//! so callers can tell request-fatal failures from per-file ones.

use thiserror::Error;

/// Malformed scope configuration. Raised before any I/O.
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("artifact with empty id in scope of agent '{agent_id}'")]
    EmptyArtifactId { agent_id: String },
    #[error("no mime types configured for the file search")]
    EmptyMimeTypes,
    #[error("failed to read scope for agent '{agent_id}': {source}")]
    Store {
        agent_id: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Listing, shortcut resolution or download failure. Fatal for the request.
#[derive(Debug, Error)]
pub enum SourceFetchError {
    #[error("file search failed: {0}")]
    Search(#[source] anyhow::Error),
    #[error("fetching files by id failed: {0}")]
    Get(#[source] anyhow::Error),
    #[error("shortcut resolution failed: {0}")]
    Shortcuts(#[source] anyhow::Error),
    #[error("download of file '{file_id}' failed: {source}")]
    Download {
        file_id: String,
        #[source]
        source: anyhow::Error,
    },
}

/// A hole in the metadata of a file already declared in scope.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("file '{file_id}' is missing required field '{field}'")]
    MissingField { file_id: String, field: &'static str },
    #[error("file '{file_id}' is an unresolved shortcut")]
    UnresolvedShortcut { file_id: String },
}

/// The index operation that failed during a per-file sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Lookup,
    Create,
    Update,
    AddContext,
    Refresh,
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SyncAction::Lookup => "lookup",
            SyncAction::Create => "create",
            SyncAction::Update => "update",
            SyncAction::AddContext => "add_context",
            SyncAction::Refresh => "refresh",
        };
        f.write_str(name)
    }
}

/// Failure of one file's sync. Isolated to that file, except for
/// [`SyncAction::Lookup`], which aborts the request.
#[derive(Debug, Error)]
#[error("{action} failed for file '{file_id}': {source}")]
pub struct SyncActionError {
    pub file_id: String,
    pub action: SyncAction,
    #[source]
    pub source: anyhow::Error,
}

/// Failure of the final retrieval call.
#[derive(Debug, Error)]
#[error("search on index '{index}' failed: {source}")]
pub struct SearchError {
    pub index: String,
    #[source]
    pub source: anyhow::Error,
}

/// Request-fatal failures of the whole pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error(transparent)]
    Source(#[from] SourceFetchError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("creating index '{index}' failed: {source}")]
    Index {
        index: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("looking up file '{file_id}' in index '{index}' failed: {source}")]
    Lookup {
        index: String,
        file_id: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("request timed out after {0}s")]
    Timeout(u64),
}
