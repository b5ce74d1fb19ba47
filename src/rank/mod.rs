//! Hybrid ranker (C7): Reciprocal Rank Fusion of BM25 + semantic rankings.

use std::collections::HashMap;

use crate::core::error::Result;
use crate::core::types::DocId;
use crate::repository::DocumentRepository;
use crate::scoring::Bm25Scorer;
use crate::vector::Embedder;
use crate::{scoring, semantic};

#[derive(Debug, Clone)]
pub struct HybridHit {
    pub doc_id: DocId,
    pub rrf_score: f64,
    pub bm25_rank: Option<usize>,
    pub semantic_rank: Option<usize>,
    bm25_snippet: Option<String>,
    semantic_snippet: Option<String>,
}

impl HybridHit {
    /// BM25's keyword-centered snippet if present, else the semantic chunk
    /// snippet (spec §4.7).
    pub fn snippet(&self) -> Option<&str> {
        self.bm25_snippet.as_deref().or(self.semantic_snippet.as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct HybridPage {
    pub total: usize,
    pub results: Vec<HybridHit>,
}

fn rrf(rank: usize, k: u32) -> f64 {
    1.0 / (k as f64 + rank as f64)
}

/// Fetches `min(3*size, max_results)` from both rankers at page 1, builds
/// 1-indexed rank maps, and fuses with RRF (spec §4.7).
pub async fn search(
    repo: &dyn DocumentRepository,
    embedder: &dyn Embedder,
    bm25: &Bm25Scorer,
    terms: &[String],
    query: &str,
    page: usize,
    size: usize,
    max_results: usize,
    rrf_k: u32,
) -> Result<HybridPage> {
    let fetch_size = (3 * size).min(max_results).max(1);

    let bm25_page = bm25.search(repo, terms, 1, fetch_size).await?;
    let semantic_page = semantic::search(repo, embedder, query, 1, fetch_size).await?;

    let mut bm25_rank: HashMap<DocId, usize> = HashMap::new();
    let mut bm25_snippets: HashMap<DocId, String> = HashMap::new();
    for (i, hit) in bm25_page.results.iter().enumerate() {
        bm25_rank.insert(hit.doc_id, i + 1);
        if let Ok(doc) = repo.get_document(hit.doc_id).await {
            bm25_snippets.insert(hit.doc_id, scoring::snippet(&doc.clean_text, terms, 250));
        }
    }

    let mut semantic_rank: HashMap<DocId, usize> = HashMap::new();
    let mut semantic_snippets: HashMap<DocId, String> = HashMap::new();
    for (i, hit) in semantic_page.results.iter().enumerate() {
        semantic_rank.insert(hit.doc_id, i + 1);
        semantic_snippets.insert(hit.doc_id, semantic::snippet(&hit.chunk_text, 250));
    }

    let mut doc_ids: Vec<DocId> = bm25_rank.keys().chain(semantic_rank.keys()).copied().collect();
    doc_ids.sort();
    doc_ids.dedup();

    let mut hits: Vec<HybridHit> = doc_ids
        .into_iter()
        .map(|doc_id| {
            let br = bm25_rank.get(&doc_id).copied();
            let sr = semantic_rank.get(&doc_id).copied();
            let score = br.map(|r| rrf(r, rrf_k)).unwrap_or(0.0) + sr.map(|r| rrf(r, rrf_k)).unwrap_or(0.0);
            HybridHit {
                doc_id,
                rrf_score: score,
                bm25_rank: br,
                semantic_rank: sr,
                bm25_snippet: bm25_snippets.get(&doc_id).cloned(),
                semantic_snippet: semantic_snippets.get(&doc_id).cloned(),
            }
        })
        .collect();

    hits.sort_by(|a, b| b.rrf_score.partial_cmp(&a.rrf_score).unwrap_or(std::cmp::Ordering::Equal));

    let total = hits.len();
    let offset = page.saturating_sub(1) * size;
    let results = hits.into_iter().skip(offset).take(size).collect();
    Ok(HybridPage { total, results })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rrf_bounds_for_scenario_s4() {
        // Property 5 / S4
        let k = 60u32;
        let d1 = rrf(1, k) + rrf(3, k); // bm25 rank 1, semantic rank 3
        let d2 = rrf(2, k); // bm25 only
        let d3 = rrf(3, k) + rrf(1, k); // bm25 rank 3, semantic rank 1
        let d4 = rrf(2, k); // semantic only
        assert!((d1 - (1.0 / 61.0 + 1.0 / 63.0)).abs() < 1e-12);
        assert!((d3 - (1.0 / 63.0 + 1.0 / 61.0)).abs() < 1e-12);
        assert!((d1 - d3).abs() < 1e-12);
        assert!((d2 - d4).abs() < 1e-12);
        assert!(d1 > d2);
    }

    fn hit(bm25_snippet: Option<&str>, semantic_snippet: Option<&str>) -> HybridHit {
        HybridHit {
            doc_id: DocId::new(),
            rrf_score: 0.0,
            bm25_rank: None,
            semantic_rank: None,
            bm25_snippet: bm25_snippet.map(String::from),
            semantic_snippet: semantic_snippet.map(String::from),
        }
    }

    #[test]
    fn snippet_prefers_bm25_over_semantic() {
        assert_eq!(hit(Some("bm25 excerpt"), Some("semantic excerpt")).snippet(), Some("bm25 excerpt"));
    }

    #[test]
    fn snippet_falls_back_to_semantic_when_bm25_absent() {
        assert_eq!(hit(None, Some("semantic excerpt")).snippet(), Some("semantic excerpt"));
    }

    #[test]
    fn snippet_is_none_when_both_absent() {
        assert_eq!(hit(None, None).snippet(), None);
    }
}
