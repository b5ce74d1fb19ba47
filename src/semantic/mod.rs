//! Semantic searcher (C6): embed the query, cosine-rank chunks, dedup to
//! one best chunk per document.

use std::collections::HashSet;

use crate::core::error::Result;
use crate::core::types::DocId;
use crate::repository::DocumentRepository;
use crate::vector::Embedder;

#[derive(Debug, Clone)]
pub struct SemanticHit {
    pub doc_id: DocId,
    pub similarity: f32,
    pub chunk_text: String,
}

#[derive(Debug, Clone)]
pub struct SemanticPage {
    pub total: usize,
    pub results: Vec<SemanticHit>,
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

/// Brute-force nearest-neighbor scan standing in for pgvector's ANN index —
/// the correct reference behavior an approximate index only approximates
/// (spec §4.6, resolved in SPEC_FULL §4.6).
pub async fn search(
    repo: &dyn DocumentRepository,
    embedder: &dyn Embedder,
    query: &str,
    page: usize,
    size: usize,
) -> Result<SemanticPage> {
    let query_vector = match embedder.embed(query).await {
        Ok(v) => v,
        Err(_) => return Ok(SemanticPage { total: 0, results: Vec::new() }),
    };

    let chunks = repo.all_embeddings().await?;
    let mut scored: Vec<SemanticHit> = chunks
        .into_iter()
        .map(|c| SemanticHit {
            doc_id: c.doc_id,
            similarity: cosine(&query_vector, &c.vector),
            chunk_text: c.chunk_text,
        })
        .collect();
    scored.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));

    let fetch = 5 * size;
    scored.truncate(fetch);

    let mut seen = HashSet::new();
    let mut deduped = Vec::new();
    for hit in scored {
        if seen.insert(hit.doc_id) {
            deduped.push(hit);
        }
    }

    let total = deduped.len();
    let offset = page.saturating_sub(1) * size;
    let results = deduped.into_iter().skip(offset).take(size).collect();
    Ok(SemanticPage { total, results })
}

/// Chunk text truncated to `max_len` characters, suffixed with "…" if
/// truncated.
pub fn snippet(chunk_text: &str, max_len: usize) -> String {
    let chars: Vec<char> = chunk_text.chars().collect();
    if chars.len() <= max_len {
        chunk_text.to_string()
    } else {
        let truncated: String = chars[..max_len].iter().collect();
        format!("{truncated}…")
    }
}
