//! File source abstraction.
//!
//! The [`FileSource`] trait is the boundary to the remote file service:
//! listing by filter query, fetching by id, shortcut resolution and content
//! download. [`download`] fans the per-file fetches out with a fixed worker
//! cap and returns content keyed by file id, so downstream steps do not
//! depend on completion order.
//!
//! Network and auth failures are fatal for the whole request; nothing here
//! is retried per file.

pub mod memory;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::error::SourceFetchError;
use crate::models::FileReference;

#[async_trait]
pub trait FileSource: Send + Sync {
    /// Short label used in logs (e.g. `"drive"`).
    fn name(&self) -> &str;

    /// List files matching a filter query, at most `page_size` of them.
    async fn search(&self, filter_query: &str, page_size: usize) -> Result<Vec<FileReference>>;

    /// Fetch file records by id. Ids that do not exist are an error.
    async fn get_files(&self, file_ids: &[String]) -> Result<Vec<FileReference>>;

    /// Download the raw content of one file from its locator.
    async fn fetch(&self, file_id: &str, locator: &str) -> Result<String>;

    /// Replace shortcut files with the files they point to.
    ///
    /// Order is preserved; a target that is already in the list (or is
    /// pointed to twice) appears once.
    async fn resolve_shortcuts(&self, files: Vec<FileReference>) -> Result<Vec<FileReference>> {
        let target_ids: Vec<String> = files
            .iter()
            .filter_map(|f| f.shortcut_target_id().map(str::to_string))
            .collect();
        if target_ids.is_empty() {
            return Ok(files);
        }

        let targets: HashMap<String, FileReference> = self
            .get_files(&target_ids)
            .await?
            .into_iter()
            .map(|f| (f.id.clone(), f))
            .collect();

        let mut seen = std::collections::HashSet::new();
        let mut resolved = Vec::with_capacity(files.len());
        for file in files {
            let file = match file.shortcut_target_id() {
                Some(target_id) => targets.get(target_id).cloned().ok_or_else(|| {
                    anyhow::anyhow!(
                        "shortcut '{}' points to missing file '{}'",
                        file.id,
                        target_id
                    )
                })?,
                None => file,
            };
            if seen.insert(file.id.clone()) {
                resolved.push(file);
            }
        }
        Ok(resolved)
    }
}

/// Download every file in `locators` with at most `concurrency` fetches in
/// flight. The first failure aborts the remaining downloads.
pub async fn download(
    source: &dyn FileSource,
    locators: &HashMap<String, String>,
    concurrency: usize,
) -> Result<HashMap<String, String>, SourceFetchError> {
    let pending: Vec<_> = locators
        .iter()
        .map(|(file_id, locator)| async move {
            let result = source.fetch(file_id, locator).await;
            (file_id.clone(), result)
        })
        .collect();
    let mut fetches = stream::iter(pending).buffer_unordered(concurrency.max(1));

    let mut contents = HashMap::with_capacity(locators.len());
    while let Some((file_id, result)) = fetches.next().await {
        match result {
            Ok(text) => {
                contents.insert(file_id, text);
            }
            Err(err) => {
                return Err(SourceFetchError::Download {
                    file_id,
                    source: err,
                })
            }
        }
    }

    tracing::debug!(
        source = source.name(),
        files = contents.len(),
        "downloaded file contents"
    );
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::memory::InMemorySource;
    use super::*;
    use crate::models::ShortcutDetails;

    fn file(id: &str) -> FileReference {
        FileReference {
            id: id.to_string(),
            name: Some(id.to_string()),
            mime_type: "text/plain".to_string(),
            ..Default::default()
        }
    }

    fn shortcut(id: &str, target: &str) -> FileReference {
        FileReference {
            id: id.to_string(),
            mime_type: "application/vnd.google-apps.shortcut".to_string(),
            shortcut: Some(ShortcutDetails {
                target_id: target.to_string(),
                target_mime_type: None,
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_download_keyed_by_id() {
        let source = InMemorySource::new();
        for i in 0..5 {
            source.add_file(file(&format!("f{}", i)), &format!("body {}", i));
        }
        let locators: HashMap<String, String> = (0..5)
            .map(|i| (format!("f{}", i), format!("mem://f{}", i)))
            .collect();

        let contents = download(&source, &locators, 2).await.unwrap();
        assert_eq!(contents.len(), 5);
        assert_eq!(contents["f3"], "body 3");
    }

    #[tokio::test]
    async fn test_download_respects_worker_cap() {
        let source = InMemorySource::new().with_fetch_delay_ms(20);
        for i in 0..12 {
            source.add_file(file(&format!("f{}", i)), "x");
        }
        let locators: HashMap<String, String> = (0..12)
            .map(|i| (format!("f{}", i), String::new()))
            .collect();

        download(&source, &locators, 3).await.unwrap();
        assert!(source.max_in_flight() <= 3);
        assert!(source.max_in_flight() >= 1);
    }

    #[tokio::test]
    async fn test_download_failure_is_fatal() {
        let source = InMemorySource::new();
        source.add_file(file("ok"), "fine");
        source.add_file(file("bad"), "never");
        source.fail_fetch("bad");
        let locators = HashMap::from([
            ("ok".to_string(), String::new()),
            ("bad".to_string(), String::new()),
        ]);

        let err = download(&source, &locators, 4).await.unwrap_err();
        assert!(matches!(err, SourceFetchError::Download { ref file_id, .. } if file_id == "bad"));
    }

    #[tokio::test]
    async fn test_resolve_shortcuts_inlines_targets() {
        let source = InMemorySource::new();
        source.add_file(file("target"), "content");
        let resolved = source
            .resolve_shortcuts(vec![file("a"), shortcut("s1", "target")])
            .await
            .unwrap();
        let ids: Vec<&str> = resolved.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "target"]);
        assert!(!resolved[1].is_shortcut());
    }

    #[tokio::test]
    async fn test_resolve_shortcuts_dedups_targets() {
        let source = InMemorySource::new();
        source.add_file(file("t"), "content");
        let resolved = source
            .resolve_shortcuts(vec![file("t"), shortcut("s1", "t"), shortcut("s2", "t")])
            .await
            .unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_shortcut_to_missing_target_fails() {
        let source = InMemorySource::new();
        assert!(source
            .resolve_shortcuts(vec![shortcut("s1", "gone")])
            .await
            .is_err());
    }
}
