//! Retrieval facade for RAG (C8): assembles top-k context records for a
//! query from either ranker or their union.

use crate::core::error::Result;
use crate::core::types::DocId;
use crate::query;
use crate::repository::DocumentRepository;
use crate::scoring::Bm25Scorer;
use crate::semantic;
use crate::vector::Embedder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMethod {
    Bm25,
    Semantic,
    Hybrid,
}

#[derive(Debug, Clone)]
pub struct RetrievedContext {
    pub document_id: DocId,
    pub chunk_text: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub relevance_score: f32,
}

const BM25_CHUNK_TRUNCATE: usize = 1000;

pub async fn retrieve_context(
    repo: &dyn DocumentRepository,
    embedder: &dyn Embedder,
    bm25: &Bm25Scorer,
    query_text: &str,
    top_k: usize,
    method: RetrievalMethod,
) -> Result<Vec<RetrievedContext>> {
    match method {
        RetrievalMethod::Bm25 => bm25_contexts(repo, bm25, query_text, top_k).await,
        RetrievalMethod::Semantic => semantic_contexts(repo, embedder, query_text, top_k).await,
        RetrievalMethod::Hybrid => {
            let mut seen = std::collections::HashSet::new();
            let mut merged = Vec::new();
            for ctx in semantic_contexts(repo, embedder, query_text, top_k).await? {
                seen.insert(ctx.document_id);
                merged.push(ctx);
            }
            for ctx in bm25_contexts(repo, bm25, query_text, top_k).await? {
                if seen.insert(ctx.document_id) {
                    merged.push(ctx);
                }
            }
            merged.sort_by(|a, b| {
                b.relevance_score.partial_cmp(&a.relevance_score).unwrap_or(std::cmp::Ordering::Equal)
            });
            merged.truncate(top_k);
            Ok(merged)
        }
    }
}

async fn bm25_contexts(
    repo: &dyn DocumentRepository,
    bm25: &Bm25Scorer,
    query_text: &str,
    top_k: usize,
) -> Result<Vec<RetrievedContext>> {
    let processed = query::process(query_text);
    let page = bm25.search(repo, &processed.tokens, 1, top_k).await?;
    let mut out = Vec::with_capacity(page.results.len());
    for hit in page.results {
        let doc = repo.get_document(hit.doc_id).await?;
        let truncated: String = doc.clean_text.chars().take(BM25_CHUNK_TRUNCATE).collect();
        out.push(RetrievedContext {
            document_id: hit.doc_id,
            chunk_text: truncated,
            title: doc.title,
            url: doc.url,
            source: doc.source.as_str().to_string(),
            relevance_score: hit.score,
        });
    }
    Ok(out)
}

async fn semantic_contexts(
    repo: &dyn DocumentRepository,
    embedder: &dyn Embedder,
    query_text: &str,
    top_k: usize,
) -> Result<Vec<RetrievedContext>> {
    let page = semantic::search(repo, embedder, query_text, 1, top_k).await?;
    let mut out = Vec::with_capacity(page.results.len());
    for hit in page.results {
        let doc = repo.get_document(hit.doc_id).await?;
        out.push(RetrievedContext {
            document_id: hit.doc_id,
            chunk_text: hit.chunk_text,
            title: doc.title,
            url: doc.url,
            source: doc.source.as_str().to_string(),
            relevance_score: hit.similarity,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Document, SourceTag};
    use crate::index;
    use crate::repository::InMemoryRepository;
    use crate::vector::{index_document_vectors, HashingEmbedder};

    async fn seeded_repo() -> (InMemoryRepository, HashingEmbedder) {
        let repo = InMemoryRepository::new();
        let embedder = HashingEmbedder::new(64);

        let mut doc = Document::new("https://x/ownership", SourceTag::Custom, "Rust Ownership");
        doc.clean_text = "rust ownership borrowing lifetimes move semantics".repeat(3);
        let id = repo.insert_document(doc).await.unwrap();
        index::index_document(&repo, id).await.unwrap();
        index_document_vectors(&repo, &embedder, id, 20, 5).await.unwrap();
        index::update_collection_stats(&repo).await.unwrap();

        (repo, embedder)
    }

    #[tokio::test]
    async fn bm25_method_returns_truncated_chunk_text() {
        let (repo, embedder) = seeded_repo().await;
        let bm25 = Bm25Scorer::default();
        let contexts =
            retrieve_context(&repo, &embedder, &bm25, "ownership", 5, RetrievalMethod::Bm25).await.unwrap();
        assert!(!contexts.is_empty());
        assert!(contexts[0].chunk_text.len() <= BM25_CHUNK_TRUNCATE);
    }

    #[tokio::test]
    async fn hybrid_method_dedups_and_respects_top_k() {
        let (repo, embedder) = seeded_repo().await;
        let bm25 = Bm25Scorer::default();
        let contexts =
            retrieve_context(&repo, &embedder, &bm25, "ownership borrowing", 1, RetrievalMethod::Hybrid)
                .await
                .unwrap();
        assert!(contexts.len() <= 1);
        let ids: std::collections::HashSet<_> = contexts.iter().map(|c| c.document_id).collect();
        assert_eq!(ids.len(), contexts.len());
    }
}
