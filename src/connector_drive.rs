//! Google Drive connector.
//!
//! Implements [`FileSource`] against the Drive v3 REST API with plain
//! `reqwest` calls:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | search | `GET {api_base}/files?q=..&pageSize=..&fields=..` |
//! | get by id | `GET {api_base}/files/{id}?fields=..`, at most `download_concurrency` at once |
//! | download | `GET {locator}` (export link or content link) |
//!
//! # Environment Variables
//!
//! - `GOOGLE_DRIVE_ACCESS_TOKEN` - OAuth bearer token, required. Obtaining
//!   and refreshing the token is left to the caller.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;

use crate::config::SourceConfig;
use crate::index::http::encode_segment;
use crate::models::FileReference;
use crate::source::FileSource;

/// Fields requested for every file record.
pub const DOC_FIELDS: &str =
    "id, name, mimeType, parents, webViewLink, webContentLink, exportLinks, shortcutDetails";

/// Drive caps `pageSize` at this value.
const MAX_PAGE_SIZE: usize = 1000;

pub struct DriveSource {
    api_base: String,
    access_token: String,
    client: reqwest::Client,
    /// Cap on concurrent `files.get` requests.
    concurrency: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<FileReference>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl DriveSource {
    pub fn new(config: &SourceConfig, access_token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            access_token,
            client,
            concurrency: config.download_concurrency.max(1),
        })
    }

    /// Build a source using the token in `GOOGLE_DRIVE_ACCESS_TOKEN`.
    pub fn from_env(config: &SourceConfig) -> Result<Self> {
        let token = std::env::var("GOOGLE_DRIVE_ACCESS_TOKEN")
            .context("GOOGLE_DRIVE_ACCESS_TOKEN environment variable not set")?;
        Self::new(config, token)
    }

    async fn get_file(&self, file_id: &str) -> Result<FileReference> {
        let url = format!("{}/files/{}", self.api_base, encode_segment(file_id));
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("fields", DOC_FIELDS)])
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get Drive file {}: {}", file_id, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "Drive files.get failed (HTTP {}) for '{}': {}",
                status,
                file_id,
                body.chars().take(500).collect::<String>()
            );
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl FileSource for DriveSource {
    fn name(&self) -> &str {
        "drive"
    }

    async fn search(&self, filter_query: &str, page_size: usize) -> Result<Vec<FileReference>> {
        let url = format!("{}/files", self.api_base);
        let fields = format!("nextPageToken, files({})", DOC_FIELDS);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let remaining = page_size.saturating_sub(files.len());
            if remaining == 0 {
                break;
            }

            let mut params = vec![
                ("q", filter_query.to_string()),
                ("pageSize", remaining.min(MAX_PAGE_SIZE).to_string()),
                ("fields", fields.clone()),
            ];
            if let Some(ref token) = page_token {
                params.push(("pageToken", token.clone()));
            }

            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&params)
                .send()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to list Drive files: {}", e))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                bail!(
                    "Drive files.list failed (HTTP {}): {}",
                    status,
                    body.chars().take(500).collect::<String>()
                );
            }

            let page: FileList = resp.json().await?;
            files.extend(page.files);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        files.truncate(page_size);
        if files.is_empty() {
            tracing::debug!("no files found");
        }
        Ok(files)
    }

    async fn get_files(&self, file_ids: &[String]) -> Result<Vec<FileReference>> {
        let fetches: Vec<_> = file_ids.iter().map(|id| self.get_file(id)).collect();
        stream::iter(fetches)
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    async fn fetch(&self, file_id: &str, locator: &str) -> Result<String> {
        let resp = self
            .client
            .get(locator)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to download Drive file {}: {}", file_id, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            bail!("Drive download failed (HTTP {}) for '{}'", status, file_id);
        }

        let bytes = resp.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }
}
