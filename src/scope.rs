//! Scope resolution.
//!
//! Turns the agent's configured artifacts plus a free-text query into either
//! an explicit list of file ids or a Drive search query. Explicit files win
//! over folders: when both are configured, only the files are fetched and no
//! folder-filtered search is issued.
//!
//! Query shape:
//!
//! ```text
//! (mimeType = 'a' or mimeType = 'b')
//!   and (fullText contains 'q' or name contains 'q')
//!   [and ('folder1' in parents or 'folder2' in parents)]
//! ```

use anyhow::Result;
use async_trait::async_trait;

use crate::config::AgentScopeConfig;
use crate::error::ScopeError;
use crate::models::{Artifact, ScopeSpec};

/// Read-only access to the per-agent tool configuration.
#[async_trait]
pub trait ScopeStore: Send + Sync {
    /// Artifacts configured for `tool_name` on `agent_id`. Unknown agents
    /// have an empty scope.
    async fn artifacts(&self, agent_id: &str, tool_name: &str) -> Result<Vec<Artifact>>;
}

/// Serves scopes from the `[[agents]]` section of the config file.
pub struct ConfigScopeStore {
    agents: Vec<AgentScopeConfig>,
}

impl ConfigScopeStore {
    pub fn new(agents: Vec<AgentScopeConfig>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl ScopeStore for ConfigScopeStore {
    async fn artifacts(&self, agent_id: &str, tool_name: &str) -> Result<Vec<Artifact>> {
        Ok(self
            .agents
            .iter()
            .filter(|a| a.id == agent_id && a.tool == tool_name)
            .flat_map(|a| a.artifacts.iter().cloned())
            .collect())
    }
}

/// Outcome of scope resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeResolution {
    /// Fetch exactly these files.
    Files(Vec<String>),
    /// Run this filter query against the file source.
    Query(String),
}

/// Build a [`ScopeSpec`] from stored artifacts, rejecting malformed entries.
pub fn build_scope(
    agent_id: &str,
    artifacts: &[Artifact],
    query_text: &str,
) -> Result<ScopeSpec, ScopeError> {
    if artifacts.iter().any(|a| a.id().trim().is_empty()) {
        return Err(ScopeError::EmptyArtifactId {
            agent_id: agent_id.to_string(),
        });
    }
    Ok(ScopeSpec::from_artifacts(artifacts, query_text))
}

/// Resolve a scope into a file list or a filter query.
pub fn resolve(spec: &ScopeSpec, mime_types: &[String]) -> Result<ScopeResolution, ScopeError> {
    if !spec.explicit_file_ids.is_empty() {
        return Ok(ScopeResolution::Files(
            spec.explicit_file_ids.iter().cloned().collect(),
        ));
    }

    if mime_types.is_empty() {
        return Err(ScopeError::EmptyMimeTypes);
    }

    let query = escape(&spec.query_text);
    let mut conditions = vec![
        disjunction(mime_types.iter().map(|m| format!("mimeType = '{}'", escape(m)))),
        disjunction([
            format!("fullText contains '{}'", query),
            format!("name contains '{}'", query),
        ]),
    ];

    if !spec.explicit_folder_ids.is_empty() {
        conditions.push(disjunction(
            spec.explicit_folder_ids
                .iter()
                .map(|f| format!("'{}' in parents", escape(f))),
        ));
    }

    Ok(ScopeResolution::Query(conditions.join(" and ")))
}

fn disjunction(clauses: impl IntoIterator<Item = String>) -> String {
    format!("({})", clauses.into_iter().collect::<Vec<_>>().join(" or "))
}

/// Escape a value for use inside a single-quoted query literal.
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
