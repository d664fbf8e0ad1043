//! Search index abstraction.
//!
//! The [`IndexService`] trait covers every operation the sync engine and the
//! result assembler need from the remote index, enabling pluggable backends
//! (the HTTP service in production, [`memory::InMemoryIndex`] in tests).
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`create_index_if_absent`](IndexService::create_index_if_absent) | Idempotent index creation |
//! | [`get_document`](IndexService::get_document) | Look up a document, distinguishing absence from failure |
//! | [`create_document`](IndexService::create_document) | Write content for a new document |
//! | [`update_document`](IndexService::update_document) | Replace content of an existing document |
//! | [`add_context`](IndexService::add_context) | Attach provenance to a document |
//! | [`refresh`](IndexService::refresh) | Make pending writes visible to search |
//! | [`search`](IndexService::search) | Ranked document hits with their chunks |

pub mod http;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{DocumentContext, Hit, IndexedDocument};

/// Result of a document lookup.
///
/// Transport and auth failures are returned as `Err` by
/// [`IndexService::get_document`], never folded into `NotFound`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentLookup {
    Found(IndexedDocument),
    NotFound,
}

#[async_trait]
pub trait IndexService: Send + Sync {
    /// Create the named index. Must succeed without side effects when the
    /// index already exists.
    async fn create_index_if_absent(&self, index: &str) -> Result<()>;

    async fn get_document(&self, index: &str, doc_id: &str) -> Result<DocumentLookup>;

    async fn create_document(&self, index: &str, doc_id: &str, text: &str) -> Result<()>;

    async fn update_document(&self, index: &str, doc_id: &str, text: &str) -> Result<()>;

    async fn add_context(&self, index: &str, doc_id: &str, context: &DocumentContext)
        -> Result<()>;

    async fn refresh(&self, index: &str) -> Result<()>;

    async fn search(&self, index: &str, query: &str, top_k: usize) -> Result<Vec<Hit>>;
}
