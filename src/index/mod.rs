//! Inverted index builder (C2): per-document term-frequency/position
//! aggregation and collection-wide statistics.

use chrono::Utc;
use tracing::warn;

use crate::core::error::Result;
use crate::core::types::{CollectionStats, DocId, DocumentStats};
use crate::repository::{DocumentRepository, Posting};
use crate::text;

/// `indexDocument` (spec §4.2): load clean text, process through C1,
/// aggregate into postings, replace atomically, stamp `indexedAt`.
pub async fn index_document(repo: &dyn DocumentRepository, doc_id: DocId) -> Result<()> {
    let doc = repo.get_document(doc_id).await?;
    if doc.clean_text.trim().is_empty() {
        warn!(?doc_id, "skipping index: document has no clean text");
        return Ok(());
    }

    let stream = text::process_with_positions(&doc.clean_text);
    let total_terms = stream.len() as u64;

    use std::collections::HashMap;
    let mut aggregated: HashMap<String, (u32, Vec<u32>)> = HashMap::new();
    for (term, position) in stream {
        let entry = aggregated.entry(term).or_insert((0, Vec::new()));
        entry.0 += 1;
        entry.1.push(position);
    }
    let unique_terms = aggregated.len() as u64;

    let postings: Vec<Posting> = aggregated
        .into_iter()
        .map(|(term, (tf, positions))| Posting { term, doc_id, term_freq: tf, positions })
        .collect();

    let stats = DocumentStats { doc_id, total_terms, unique_terms };
    repo.replace_postings(doc_id, postings, stats).await?;
    repo.mark_indexed(doc_id, Utc::now()).await?;
    Ok(())
}

/// Recomputes the singleton Collection Stats from every Document Stats row.
/// Safe to run concurrently with individual document indexing; callers
/// tolerate staleness of up to one batch (spec §4.2/§9).
pub async fn update_collection_stats(repo: &dyn DocumentRepository) -> Result<()> {
    let all = repo.all_document_stats().await?;
    let total_documents = all.len() as u64;
    let avgdl = if total_documents == 0 {
        0.0
    } else {
        all.iter().map(|s| s.total_terms as f64).sum::<f64>() / total_documents as f64
    };
    repo.set_collection_stats(CollectionStats { total_documents, avgdl }).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Document, SourceTag};
    use crate::repository::InMemoryRepository;

    async fn indexed_doc(repo: &InMemoryRepository, text: &str) -> DocId {
        let mut doc = Document::new(format!("https://x/{}", uuid::Uuid::new_v4()), SourceTag::Custom, "t");
        doc.clean_text = text.to_string();
        let id = repo.insert_document(doc).await.unwrap();
        index_document(repo, id).await.unwrap();
        id
    }

    #[tokio::test]
    async fn empty_text_is_a_noop() {
        let repo = InMemoryRepository::new();
        let doc = Document::new("https://x/empty", SourceTag::Custom, "t");
        let id = repo.insert_document(doc).await.unwrap();
        index_document(&repo, id).await.unwrap();
        assert!(repo.document_stats(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reindex_is_idempotent() {
        // Property 9
        let repo = InMemoryRepository::new();
        let id = indexed_doc(&repo, "the cat sat on the mat").await;
        let first = repo.document_stats(id).await.unwrap().unwrap();
        index_document(&repo, id).await.unwrap();
        let second = repo.document_stats(id).await.unwrap().unwrap();
        assert_eq!(first.total_terms, second.total_terms);
        assert_eq!(first.unique_terms, second.unique_terms);
    }

    #[tokio::test]
    async fn collection_stats_converge() {
        let repo = InMemoryRepository::new();
        indexed_doc(&repo, "the cat sat on the mat").await;
        indexed_doc(&repo, "the dog chased the cat").await;
        update_collection_stats(&repo).await.unwrap();
        let stats = repo.collection_stats().await.unwrap();
        assert_eq!(stats.total_documents, 2);
        assert!(stats.avgdl > 0.0);
    }
}
