//! In-memory [`FileSource`] for tests and offline runs.
//!
//! Files and their contents live in `HashMap`s behind `std::sync::RwLock`.
//! The source cannot evaluate Drive query syntax: `search` records the query
//! and returns the configured search results. Fetches track how many are in
//! flight at once so tests can check the download worker cap.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::FileSource;
use crate::models::FileReference;

pub struct InMemorySource {
    files: RwLock<HashMap<String, FileReference>>,
    contents: RwLock<HashMap<String, String>>,
    search_results: RwLock<Vec<String>>,
    failing: RwLock<HashSet<String>>,
    searches: RwLock<Vec<(String, usize)>>,
    get_calls: RwLock<Vec<Vec<String>>>,
    fetch_delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            contents: RwLock::new(HashMap::new()),
            search_results: RwLock::new(Vec::new()),
            failing: RwLock::new(HashSet::new()),
            searches: RwLock::new(Vec::new()),
            get_calls: RwLock::new(Vec::new()),
            fetch_delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_fetch_delay_ms(mut self, millis: u64) -> Self {
        self.fetch_delay = Duration::from_millis(millis);
        self
    }

    pub fn add_file(&self, file: FileReference, content: &str) {
        self.contents
            .write()
            .unwrap()
            .insert(file.id.clone(), content.to_string());
        self.files.write().unwrap().insert(file.id.clone(), file);
    }

    /// Make `file_id` part of every search result, in insertion order.
    pub fn add_search_result(&self, file_id: &str) {
        self.search_results.write().unwrap().push(file_id.to_string());
    }

    pub fn set_content(&self, file_id: &str, content: &str) {
        self.contents
            .write()
            .unwrap()
            .insert(file_id.to_string(), content.to_string());
    }

    pub fn fail_fetch(&self, file_id: &str) {
        self.failing.write().unwrap().insert(file_id.to_string());
    }

    /// Queries passed to [`FileSource::search`], with their page sizes.
    pub fn searches(&self) -> Vec<(String, usize)> {
        self.searches.read().unwrap().clone()
    }

    /// Id lists passed to [`FileSource::get_files`].
    pub fn get_calls(&self) -> Vec<Vec<String>> {
        self.get_calls.read().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSource for InMemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn search(&self, filter_query: &str, page_size: usize) -> Result<Vec<FileReference>> {
        self.searches
            .write()
            .unwrap()
            .push((filter_query.to_string(), page_size));
        let files = self.files.read().unwrap();
        Ok(self
            .search_results
            .read()
            .unwrap()
            .iter()
            .filter_map(|id| files.get(id).cloned())
            .take(page_size)
            .collect())
    }

    async fn get_files(&self, file_ids: &[String]) -> Result<Vec<FileReference>> {
        self.get_calls.write().unwrap().push(file_ids.to_vec());
        let files = self.files.read().unwrap();
        file_ids
            .iter()
            .map(|id| {
                files
                    .get(id)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("file not found: {}", id))
            })
            .collect()
    }

    async fn fetch(&self, file_id: &str, _locator: &str) -> Result<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.read().unwrap().contains(file_id) {
            bail!("simulated download failure for {}", file_id);
        }
        self.contents
            .read()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no content for {}", file_id))
    }
}
