//! TOML configuration parsing.
//!
//! ```toml
//! [source]
//! api_base = "https://www.googleapis.com/drive/v3"
//! download_concurrency = 8
//!
//! [index]
//! base_url = "http://localhost:8080"
//!
//! [sync]
//! staleness_window_secs = 86400
//!
//! [retrieval]
//! search_limit = 10
//!
//! [[agents]]
//! id = "agent-42"
//! artifacts = [{ type = "folder", id = "0AbcFolder" }]
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::models::Artifact;

/// Tool name under which Drive scopes and indexes are keyed.
pub const GOOGLE_DRIVE_TOOL_ID: &str = "google_drive";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    pub index: IndexConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub agents: Vec<AgentScopeConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_download_concurrency")]
    pub download_concurrency: usize,
    #[serde(default = "default_mime_types")]
    pub mime_types: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            download_concurrency: default_download_concurrency(),
            mime_types: default_mime_types(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}
fn default_download_concurrency() -> usize {
    8
}
fn default_mime_types() -> Vec<String> {
    vec![
        "application/vnd.google-apps.document".to_string(),
        "application/vnd.google-apps.presentation".to_string(),
        "text/plain".to_string(),
        "text/markdown".to_string(),
    ]
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Maximum age of an indexed document before it is rewritten.
    #[serde(default = "default_staleness_window")]
    pub staleness_window_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            staleness_window_secs: default_staleness_window(),
        }
    }
}

fn default_staleness_window() -> u64 {
    86_400
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Page size of the file search and top-k of the index search.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            search_limit: default_search_limit(),
        }
    }
}

fn default_search_limit() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RequestConfig {
    /// Upper bound on one pipeline run. Unset means no limit.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentScopeConfig {
    pub id: String,
    #[serde(default = "default_tool")]
    pub tool: String,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

fn default_tool() -> String {
    GOOGLE_DRIVE_TOOL_ID.to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.source.download_concurrency == 0 {
        anyhow::bail!("source.download_concurrency must be > 0");
    }

    if config.source.mime_types.is_empty() {
        anyhow::bail!("source.mime_types must not be empty");
    }

    if config.index.base_url.trim().is_empty() {
        anyhow::bail!("index.base_url must not be empty");
    }

    if !(1..=1000).contains(&config.retrieval.search_limit) {
        anyhow::bail!("retrieval.search_limit must be in [1, 1000]");
    }

    if config.request.timeout_secs == Some(0) {
        anyhow::bail!("request.timeout_secs must be > 0 when set");
    }

    for agent in &config.agents {
        if agent.id.trim().is_empty() {
            anyhow::bail!("agents[].id must not be empty");
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[index]
base_url = "http://localhost:8080"
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.sync.staleness_window_secs, 86_400);
        assert_eq!(config.retrieval.search_limit, 10);
        assert_eq!(config.source.download_concurrency, 8);
        assert_eq!(config.source.mime_types.len(), 4);
        assert!(config.request.timeout_secs.is_none());
        assert!(config.agents.is_empty());
    }

    #[test]
    fn test_agents_with_artifacts() {
        let content = r#"
[index]
base_url = "http://localhost:8080"

[[agents]]
id = "agent-1"
artifacts = [
    { type = "folder", id = "d1" },
    { type = "file", id = "f1", name = "Plan" },
]
"#;
        let config = parse_config(content).unwrap();
        assert_eq!(config.agents.len(), 1);
        assert_eq!(config.agents[0].tool, GOOGLE_DRIVE_TOOL_ID);
        assert_eq!(config.agents[0].artifacts.len(), 2);
        assert_eq!(config.agents[0].artifacts[1].id(), "f1");
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let content = format!("{}\n[source]\ndownload_concurrency = 0\n", MINIMAL);
        assert!(parse_config(&content).is_err());
    }

    #[test]
    fn test_rejects_zero_search_limit() {
        let content = format!("{}\n[retrieval]\nsearch_limit = 0\n", MINIMAL);
        assert!(parse_config(&content).is_err());
    }

    #[test]
    fn test_sync_section_only_sets_window() {
        let content = format!("{}\n[sync]\nstaleness_window_secs = 60\n", MINIMAL);
        let config = parse_config(&content).unwrap();
        assert_eq!(config.sync.staleness_window_secs, 60);
        assert_eq!(config.retrieval.search_limit, 10);
    }

    #[test]
    fn test_rejects_missing_index() {
        assert!(parse_config("[sync]\nstaleness_window_secs = 10\n").is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("dctx.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.index.base_url, "http://localhost:8080");
    }
}
