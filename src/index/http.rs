//! HTTP client for the remote index service.
//!
//! # Endpoints
//!
//! | Operation | Request | Notes |
//! |-----------|---------|-------|
//! | create index | `PUT /v1/indexes/{index}` | `409` means it already exists |
//! | get document | `GET /v1/indexes/{index}/documents/{id}` | `404` is [`DocumentLookup::NotFound`] |
//! | create document | `POST /v1/indexes/{index}/documents` | body `{doc_id, text}` |
//! | update document | `PUT /v1/indexes/{index}/documents/{id}` | body `{text}` |
//! | add context | `POST /v1/indexes/{index}/documents/{id}/context` | body [`DocumentContext`] |
//! | refresh | `POST /v1/indexes/{index}/refresh` | |
//! | search | `POST /v1/indexes/{index}/search` | body `{query, top_k}`, returns `{hits}` |
//!
//! Requests carry `Authorization: Bearer $INDEX_API_TOKEN` when the variable
//! is set.
//!
//! Retry strategy:
//! - HTTP 429 or 5xx → retry with exponential backoff
//! - other HTTP errors → returned to the caller immediately
//! - network error → retry

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{DocumentLookup, IndexService};
use crate::config::IndexConfig;
use crate::models::{DocumentChunk, DocumentContent, DocumentContext, Hit, IndexedDocument};

pub struct HttpIndex {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
    max_retries: u32,
    backoff_base: Duration,
}

#[derive(Debug, Deserialize)]
struct DocEnvelope {
    doc: WireDoc,
}

#[derive(Debug, Deserialize)]
struct WireDoc {
    #[serde(default)]
    content: DocumentContent,
    #[serde(default)]
    chunks: Vec<DocumentChunk>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

impl HttpIndex {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: std::env::var("INDEX_API_TOKEN").ok().filter(|t| !t.is_empty()),
            client,
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(500),
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    fn index_url(&self, index: &str) -> String {
        format!("{}/v1/indexes/{}", self.base_url, encode_segment(index))
    }

    fn doc_url(&self, index: &str, doc_id: &str) -> String {
        format!("{}/documents/{}", self.index_url(index), encode_segment(doc_id))
    }

    /// Send a request, retrying rate limits, server errors and network
    /// failures. Any other response is returned for the caller to inspect.
    async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Response> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff_base * (1u32 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let mut req = self.client.request(method.clone(), url);
            if let Some(ref token) = self.token {
                req = req.bearer_auth(token);
            }
            if let Some(body) = body {
                req = req.json(body);
            }

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        let text = resp.text().await.unwrap_or_default();
                        tracing::debug!(%status, attempt, url, "index request will be retried");
                        last_err = Some(anyhow::anyhow!("index API error {}: {}", status, text));
                        continue;
                    }
                    return Ok(resp);
                }
                Err(e) => {
                    tracing::debug!(error = %e, attempt, url, "index request failed");
                    last_err = Some(e.into());
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("index request failed after retries")))
    }

    async fn expect_success(&self, method: Method, url: &str, body: Option<&Value>) -> Result<()> {
        let resp = self.send(method, url, body).await?;
        ensure_success(resp).await.map(|_| ())
    }
}

async fn ensure_success(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    bail!(
        "index API error {}: {}",
        status,
        text.chars().take(500).collect::<String>()
    )
}

#[async_trait]
impl IndexService for HttpIndex {
    async fn create_index_if_absent(&self, index: &str) -> Result<()> {
        let resp = self.send(Method::PUT, &self.index_url(index), None).await?;
        if resp.status() == StatusCode::CONFLICT {
            return Ok(());
        }
        ensure_success(resp).await.map(|_| ())
    }

    async fn get_document(&self, index: &str, doc_id: &str) -> Result<DocumentLookup> {
        let resp = self
            .send(Method::GET, &self.doc_url(index, doc_id), None)
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(DocumentLookup::NotFound);
        }
        let envelope: DocEnvelope = ensure_success(resp).await?.json().await?;
        Ok(DocumentLookup::Found(IndexedDocument {
            index_name: index.to_string(),
            doc_id: doc_id.to_string(),
            content: envelope.doc.content,
            chunks: envelope.doc.chunks,
        }))
    }

    async fn create_document(&self, index: &str, doc_id: &str, text: &str) -> Result<()> {
        let url = format!("{}/documents", self.index_url(index));
        let body = json!({ "doc_id": doc_id, "text": text });
        self.expect_success(Method::POST, &url, Some(&body)).await
    }

    async fn update_document(&self, index: &str, doc_id: &str, text: &str) -> Result<()> {
        let body = json!({ "text": text });
        self.expect_success(Method::PUT, &self.doc_url(index, doc_id), Some(&body))
            .await
    }

    async fn add_context(
        &self,
        index: &str,
        doc_id: &str,
        context: &DocumentContext,
    ) -> Result<()> {
        let url = format!("{}/context", self.doc_url(index, doc_id));
        let body = serde_json::to_value(context)?;
        self.expect_success(Method::POST, &url, Some(&body)).await
    }

    async fn refresh(&self, index: &str) -> Result<()> {
        let url = format!("{}/refresh", self.index_url(index));
        self.expect_success(Method::POST, &url, None).await
    }

    async fn search(&self, index: &str, query: &str, top_k: usize) -> Result<Vec<Hit>> {
        let url = format!("{}/search", self.index_url(index));
        let body = json!({ "query": query, "top_k": top_k });
        let resp = self.send(Method::POST, &url, Some(&body)).await?;
        let parsed: SearchResponse = ensure_success(resp).await?.json().await?;
        Ok(parsed.hits)
    }
}

/// Percent-encode one URL path segment (RFC 3986 unreserved set kept).
pub(crate) fn encode_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
