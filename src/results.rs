//! Retrieval result assembly.
//!
//! The index returns document-level hits, each with its matching chunks.
//! Callers want a flat list of records carrying the chunk text plus the
//! document's url and title, so hits are flattened in hit order and then
//! chunk order.

use crate::error::SearchError;
use crate::index::IndexService;
use crate::models::{Hit, ResultChunk};

/// Flatten hits into one record per chunk. Missing url or title become `""`.
pub fn assemble(hits: Vec<Hit>) -> Vec<ResultChunk> {
    hits.into_iter()
        .flat_map(|hit| {
            let url = hit.content.url.unwrap_or_default();
            let title = hit.content.title.unwrap_or_default();
            hit.chunks.into_iter().map(move |chunk| ResultChunk {
                text: chunk.content.text,
                url: url.clone(),
                title: title.clone(),
            })
        })
        .collect()
}

/// The single empty record returned when nothing is in scope.
pub fn empty_sentinel() -> Vec<ResultChunk> {
    vec![ResultChunk::default()]
}

/// Run the search and flatten its hits.
pub async fn search(
    index_service: &dyn IndexService,
    index: &str,
    query: &str,
    top_k: usize,
) -> Result<Vec<ResultChunk>, SearchError> {
    let hits = index_service
        .search(index, query, top_k)
        .await
        .map_err(|source| SearchError {
            index: index.to_string(),
            source,
        })?;
    tracing::debug!(index, hits = hits.len(), "search returned");
    Ok(assemble(hits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::InMemoryIndex;
    use crate::models::{ChunkText, HitChunk, HitContent};

    fn hit(url: Option<&str>, title: Option<&str>, chunks: &[&str]) -> Hit {
        Hit {
            content: HitContent {
                url: url.map(str::to_string),
                title: title.map(str::to_string),
            },
            chunks: chunks
                .iter()
                .map(|t| HitChunk {
                    content: ChunkText {
                        text: t.to_string(),
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn test_flattens_in_hit_then_chunk_order() {
        let hits = vec![
            hit(Some("u1"), Some("T1"), &["a", "b"]),
            hit(Some("u2"), Some("T2"), &["c"]),
        ];
        let records = assemble(hits);
        assert_eq!(records.len(), 3);
        assert_eq!(
            records.iter().map(|r| r.text.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert_eq!(records[1].url, "u1");
        assert_eq!(records[2].title, "T2");
    }

    #[test]
    fn test_missing_provenance_defaults_to_empty() {
        let records = assemble(vec![hit(None, None, &["x"])]);
        assert_eq!(records[0].url, "");
        assert_eq!(records[0].title, "");
    }

    #[test]
    fn test_hit_without_chunks_yields_nothing() {
        assert!(assemble(vec![hit(Some("u"), Some("t"), &[])]).is_empty());
    }

    #[test]
    fn test_empty_sentinel() {
        let sentinel = empty_sentinel();
        assert_eq!(sentinel.len(), 1);
        assert_eq!(sentinel[0].text, "");
        assert_eq!(sentinel[0].url, "");
    }

    #[tokio::test]
    async fn test_search_failure_is_typed() {
        let index = InMemoryIndex::default();
        index.create_index_if_absent("i").await.unwrap();
        index.fail("search", "i");
        let err = search(&index, "i", "q", 10).await.unwrap_err();
        assert_eq!(err.index, "i");
    }
}
