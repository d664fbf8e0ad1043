//! In-memory [`IndexService`] implementation for testing and offline runs.
//!
//! Uses `HashMap`s behind `std::sync::RwLock`. Writes are staged: search only
//! sees the snapshot taken by the last [`refresh`](IndexService::refresh),
//! while [`get_document`](IndexService::get_document) reads the latest
//! state. Keyword search counts query-term matches per chunk.
//!
//! Every call is appended to an operation log so tests can assert exactly
//! which actions a sync performed and in what order. Failures can be
//! injected per operation and document.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::{DocumentLookup, IndexService};
use crate::chunk::chunk_text;
use crate::models::{
    ChunkText, DocumentChunk, DocumentContent, DocumentContext, Hit, HitChunk, HitContent,
    IndexedDocument,
};

/// One recorded call against the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOp {
    CreateIndex { index: String },
    Get { index: String, doc_id: String },
    Create { index: String, doc_id: String },
    Update { index: String, doc_id: String },
    AddContext { index: String, doc_id: String },
    Refresh { index: String },
    Search { index: String, query: String, top_k: usize },
}

impl IndexOp {
    /// Document the operation targets, if any.
    pub fn doc_id(&self) -> Option<&str> {
        match self {
            IndexOp::Get { doc_id, .. }
            | IndexOp::Create { doc_id, .. }
            | IndexOp::Update { doc_id, .. }
            | IndexOp::AddContext { doc_id, .. } => Some(doc_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredDoc {
    content: DocumentContent,
    chunks: Vec<String>,
}

#[derive(Debug, Default)]
struct IndexState {
    docs: HashMap<String, StoredDoc>,
    published: HashMap<String, StoredDoc>,
}

pub struct InMemoryIndex {
    max_chunk_tokens: usize,
    indexes: RwLock<HashMap<String, IndexState>>,
    ops: RwLock<Vec<IndexOp>>,
    failures: RwLock<HashSet<(String, String)>>,
}

impl InMemoryIndex {
    pub fn new(max_chunk_tokens: usize) -> Self {
        Self {
            max_chunk_tokens,
            indexes: RwLock::new(HashMap::new()),
            ops: RwLock::new(Vec::new()),
            failures: RwLock::new(HashSet::new()),
        }
    }

    /// Make the named operation fail. `target` is the document id for
    /// `get`, `create`, `update` and `add_context`, and the index name for
    /// `refresh` and `search`.
    pub fn fail(&self, op: &str, target: &str) {
        self.failures
            .write()
            .unwrap()
            .insert((op.to_string(), target.to_string()));
    }

    pub fn clear_failures(&self) {
        self.failures.write().unwrap().clear();
    }

    /// Seed a document directly, already visible to search. Does not log.
    pub fn insert_document(&self, doc: IndexedDocument) {
        let mut indexes = self.indexes.write().unwrap();
        let state = indexes.entry(doc.index_name.clone()).or_default();
        let stored = StoredDoc {
            content: doc.content,
            chunks: doc.chunks.into_iter().map(|c| c.text).collect(),
        };
        state.docs.insert(doc.doc_id.clone(), stored.clone());
        state.published.insert(doc.doc_id, stored);
    }

    pub fn document(&self, index: &str, doc_id: &str) -> Option<IndexedDocument> {
        let indexes = self.indexes.read().unwrap();
        indexes
            .get(index)
            .and_then(|state| state.docs.get(doc_id))
            .map(|stored| to_indexed(index, doc_id, stored))
    }

    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn document_count(&self, index: &str) -> usize {
        self.indexes
            .read()
            .unwrap()
            .get(index)
            .map(|s| s.docs.len())
            .unwrap_or(0)
    }

    pub fn ops(&self) -> Vec<IndexOp> {
        self.ops.read().unwrap().clone()
    }

    pub fn clear_ops(&self) {
        self.ops.write().unwrap().clear();
    }

    fn record(&self, op: IndexOp) {
        self.ops.write().unwrap().push(op);
    }

    fn check_failure(&self, op: &str, target: &str) -> Result<()> {
        if self
            .failures
            .read()
            .unwrap()
            .contains(&(op.to_string(), target.to_string()))
        {
            bail!("injected {} failure for '{}'", op, target);
        }
        Ok(())
    }

    fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(text, self.max_chunk_tokens)
            .into_iter()
            .map(|c| c.text)
            .collect()
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new(700)
    }
}

fn to_indexed(index: &str, doc_id: &str, stored: &StoredDoc) -> IndexedDocument {
    IndexedDocument {
        index_name: index.to_string(),
        doc_id: doc_id.to_string(),
        content: stored.content.clone(),
        chunks: stored
            .chunks
            .iter()
            .map(|text| DocumentChunk { text: text.clone() })
            .collect(),
    }
}

#[async_trait]
impl IndexService for InMemoryIndex {
    async fn create_index_if_absent(&self, index: &str) -> Result<()> {
        self.record(IndexOp::CreateIndex {
            index: index.to_string(),
        });
        self.indexes
            .write()
            .unwrap()
            .entry(index.to_string())
            .or_default();
        Ok(())
    }

    async fn get_document(&self, index: &str, doc_id: &str) -> Result<DocumentLookup> {
        self.record(IndexOp::Get {
            index: index.to_string(),
            doc_id: doc_id.to_string(),
        });
        self.check_failure("get", doc_id)?;

        let indexes = self.indexes.read().unwrap();
        let Some(state) = indexes.get(index) else {
            bail!("index not found: {}", index);
        };
        Ok(match state.docs.get(doc_id) {
            Some(stored) => DocumentLookup::Found(to_indexed(index, doc_id, stored)),
            None => DocumentLookup::NotFound,
        })
    }

    async fn create_document(&self, index: &str, doc_id: &str, text: &str) -> Result<()> {
        self.record(IndexOp::Create {
            index: index.to_string(),
            doc_id: doc_id.to_string(),
        });
        self.check_failure("create", doc_id)?;

        let chunks = self.chunk(text);
        let mut indexes = self.indexes.write().unwrap();
        let Some(state) = indexes.get_mut(index) else {
            bail!("index not found: {}", index);
        };
        if state.docs.contains_key(doc_id) {
            bail!("document already exists: {}/{}", index, doc_id);
        }
        state.docs.insert(
            doc_id.to_string(),
            StoredDoc {
                content: DocumentContent::default(),
                chunks,
            },
        );
        Ok(())
    }

    async fn update_document(&self, index: &str, doc_id: &str, text: &str) -> Result<()> {
        self.record(IndexOp::Update {
            index: index.to_string(),
            doc_id: doc_id.to_string(),
        });
        self.check_failure("update", doc_id)?;

        let chunks = self.chunk(text);
        let mut indexes = self.indexes.write().unwrap();
        let Some(stored) = indexes.get_mut(index).and_then(|s| s.docs.get_mut(doc_id)) else {
            bail!("document not found: {}/{}", index, doc_id);
        };
        stored.chunks = chunks;
        Ok(())
    }

    async fn add_context(
        &self,
        index: &str,
        doc_id: &str,
        context: &DocumentContext,
    ) -> Result<()> {
        self.record(IndexOp::AddContext {
            index: index.to_string(),
            doc_id: doc_id.to_string(),
        });
        self.check_failure("add_context", doc_id)?;

        let mut indexes = self.indexes.write().unwrap();
        let Some(stored) = indexes.get_mut(index).and_then(|s| s.docs.get_mut(doc_id)) else {
            bail!("document not found: {}/{}", index, doc_id);
        };
        stored.content = DocumentContent {
            url: Some(context.url.clone()),
            title: Some(context.title.clone()),
            last_updated: Some(context.last_updated),
        };
        Ok(())
    }

    async fn refresh(&self, index: &str) -> Result<()> {
        self.record(IndexOp::Refresh {
            index: index.to_string(),
        });
        self.check_failure("refresh", index)?;

        let mut indexes = self.indexes.write().unwrap();
        let Some(state) = indexes.get_mut(index) else {
            bail!("index not found: {}", index);
        };
        state.published = state.docs.clone();
        Ok(())
    }

    async fn search(&self, index: &str, query: &str, top_k: usize) -> Result<Vec<Hit>> {
        self.record(IndexOp::Search {
            index: index.to_string(),
            query: query.to_string(),
            top_k,
        });
        self.check_failure("search", index)?;

        let indexes = self.indexes.read().unwrap();
        let Some(state) = indexes.get(index) else {
            bail!("index not found: {}", index);
        };

        let query_lower = query.to_lowercase();
        let terms: Vec<&str> = query_lower.split_whitespace().collect();

        let mut scored: Vec<(usize, &String, &StoredDoc, Vec<&String>)> = state
            .published
            .iter()
            .filter_map(|(doc_id, stored)| {
                let mut score = 0;
                let mut matching = Vec::new();
                for text in &stored.chunks {
                    let text_lower = text.to_lowercase();
                    let matches = terms.iter().filter(|t| text_lower.contains(*t)).count();
                    if terms.is_empty() || matches > 0 {
                        score += matches;
                        matching.push(text);
                    }
                }
                (!matching.is_empty()).then_some((score, doc_id, stored, matching))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(_, _, stored, matching)| Hit {
                content: HitContent {
                    url: stored.content.url.clone(),
                    title: stored.content.title.clone(),
                },
                chunks: matching
                    .into_iter()
                    .map(|text| HitChunk {
                        content: ChunkText { text: text.clone() },
                    })
                    .collect(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = "agent_google_drive";

    fn context(ts: i64) -> DocumentContext {
        DocumentContext {
            url: "https://drive.test/view/a".to_string(),
            title: "A".to_string(),
            last_updated: ts,
        }
    }

    #[tokio::test]
    async fn test_create_index_is_idempotent() {
        let index = InMemoryIndex::default();
        index.create_index_if_absent(INDEX).await.unwrap();
        index
            .create_document(INDEX, "a", "hello world")
            .await
            .unwrap();
        index.create_index_if_absent(INDEX).await.unwrap();
        assert_eq!(index.index_names(), vec![INDEX.to_string()]);
        assert_eq!(index.document_count(INDEX), 1);
    }

    #[tokio::test]
    async fn test_get_missing_document_is_not_found() {
        let index = InMemoryIndex::default();
        index.create_index_if_absent(INDEX).await.unwrap();
        let lookup = index.get_document(INDEX, "nope").await.unwrap();
        assert_eq!(lookup, DocumentLookup::NotFound);
    }

    #[tokio::test]
    async fn test_injected_lookup_failure_is_an_error() {
        let index = InMemoryIndex::default();
        index.create_index_if_absent(INDEX).await.unwrap();
        index.fail("get", "a");
        assert!(index.get_document(INDEX, "a").await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let index = InMemoryIndex::default();
        index.create_index_if_absent(INDEX).await.unwrap();
        index.create_document(INDEX, "a", "one").await.unwrap();
        assert!(index.create_document(INDEX, "a", "two").await.is_err());
    }

    #[tokio::test]
    async fn test_search_sees_only_refreshed_writes() {
        let index = InMemoryIndex::default();
        index.create_index_if_absent(INDEX).await.unwrap();
        index
            .create_document(INDEX, "a", "quarterly budget review")
            .await
            .unwrap();
        index.add_context(INDEX, "a", &context(100)).await.unwrap();

        assert!(index.search(INDEX, "budget", 10).await.unwrap().is_empty());

        index.refresh(INDEX).await.unwrap();
        let hits = index.search(INDEX, "budget", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content.title.as_deref(), Some("A"));
        assert_eq!(hits[0].chunks[0].content.text, "quarterly budget review");
    }

    #[tokio::test]
    async fn test_search_respects_top_k() {
        let index = InMemoryIndex::default();
        index.create_index_if_absent(INDEX).await.unwrap();
        for id in ["a", "b", "c"] {
            index.create_document(INDEX, id, "shared term").await.unwrap();
        }
        index.refresh(INDEX).await.unwrap();
        assert_eq!(index.search(INDEX, "shared", 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_add_context_sets_metadata() {
        let index = InMemoryIndex::default();
        index.create_index_if_absent(INDEX).await.unwrap();
        index.create_document(INDEX, "a", "text").await.unwrap();
        index.add_context(INDEX, "a", &context(42)).await.unwrap();
        let doc = index.document(INDEX, "a").unwrap();
        assert_eq!(doc.content.last_updated, Some(42));
        assert_eq!(doc.content.url.as_deref(), Some("https://drive.test/view/a"));
    }

    #[tokio::test]
    async fn test_ops_are_logged_in_order() {
        let index = InMemoryIndex::default();
        index.create_index_if_absent(INDEX).await.unwrap();
        index.create_document(INDEX, "a", "text").await.unwrap();
        index.refresh(INDEX).await.unwrap();
        let ops = index.ops();
        assert_eq!(ops.len(), 3);
        assert!(matches!(ops[1], IndexOp::Create { .. }));
        assert_eq!(ops[1].doc_id(), Some("a"));
        assert!(matches!(ops[2], IndexOp::Refresh { .. }));
    }
}
