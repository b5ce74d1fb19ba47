//! Okapi BM25 scorer (C5): IDF, length normalization, pagination, snippet
//! and highlight extraction.

use std::collections::HashMap;

use crate::core::error::Result;
use crate::core::types::DocId;
use crate::repository::DocumentRepository;

#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub doc_id: DocId,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct Bm25Page {
    pub total: usize,
    pub results: Vec<ScoredDocument>,
}

pub struct Bm25Scorer {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Scorer {
    fn default() -> Self {
        Bm25Scorer { k1: 1.2, b: 0.75 }
    }
}

impl Bm25Scorer {
    pub fn new(k1: f32, b: f32) -> Self {
        Bm25Scorer { k1, b }
    }

    /// Scores every document carrying at least one of `terms`, sorts
    /// descending, and returns the `[offset, offset+size)` page (spec §4.5).
    pub async fn search(
        &self,
        repo: &dyn DocumentRepository,
        terms: &[String],
        page: usize,
        size: usize,
    ) -> Result<Bm25Page> {
        let collection = repo.collection_stats().await?;
        if collection.total_documents == 0 {
            return Ok(Bm25Page { total: 0, results: Vec::new() });
        }
        let n = collection.total_documents as f32;
        let avgdl = collection.avgdl as f32;

        let mut scores: HashMap<DocId, f32> = HashMap::new();
        for term in terms {
            let df = repo.document_frequency(term).await?;
            if df == 0 {
                continue;
            }
            let idf = ((n - df as f32 + 0.5) / (df as f32 + 0.5) + 1.0).ln();
            if idf <= 0.0 {
                // Property 4: terms in every document contribute nothing.
                continue;
            }
            for posting in repo.postings_for_term(term).await? {
                let stats = match repo.document_stats(posting.doc_id).await? {
                    Some(s) => s,
                    None => continue,
                };
                let tf = posting.term_freq as f32;
                let doc_len = stats.total_terms as f32;
                let denom = tf + self.k1 * (1.0 - self.b + self.b * (doc_len / avgdl));
                let contribution = idf * (tf * (self.k1 + 1.0)) / denom;
                *scores.entry(posting.doc_id).or_insert(0.0) += contribution;
            }
        }

        let mut ranked: Vec<ScoredDocument> = scores
            .into_iter()
            .map(|(doc_id, score)| ScoredDocument { doc_id, score })
            .collect();
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let total = ranked.len();
        let offset = page.saturating_sub(1) * size;
        let page_slice = ranked.into_iter().skip(offset).take(size).collect();
        Ok(Bm25Page { total, results: page_slice })
    }
}

/// Earliest-term window snippet, guarding UTF-8 char boundaries (spec §4.5,
/// §9's note on snippet byte-offset safety).
pub fn snippet(clean_content: &str, terms: &[String], max_len: usize) -> String {
    let chars: Vec<char> = clean_content.chars().collect();
    let lower: Vec<char> = clean_content.to_lowercase().chars().collect();
    let needle_positions: Vec<usize> = terms
        .iter()
        .filter_map(|t| {
            let t = t.to_lowercase();
            find_char_subsequence(&lower, &t)
        })
        .collect();

    let start = match needle_positions.iter().min() {
        Some(&pos) => pos.saturating_sub(50),
        None => 0,
    };
    let end = (start + max_len).min(chars.len());
    let window: String = chars[start..end].iter().collect();

    let prefix = if start > 0 { "…" } else { "" };
    let suffix = if end < chars.len() { "…" } else { "" };
    format!("{prefix}{window}{suffix}")
}

fn find_char_subsequence(haystack: &[char], needle: &str) -> Option<usize> {
    let needle_chars: Vec<char> = needle.chars().collect();
    if needle_chars.is_empty() || needle_chars.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle_chars.len()).position(|w| w == needle_chars.as_slice())
}

/// Wraps every case-insensitive occurrence of any raw token with
/// `<mark>…</mark>`, preserving the matched substring's original casing.
pub fn highlight(text: &str, raw_tokens: &[String]) -> String {
    if raw_tokens.is_empty() {
        return text.to_string();
    }
    let mut pattern = raw_tokens
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    pattern = format!("(?i)({pattern})");
    let re = regex::Regex::new(&pattern).unwrap();
    re.replace_all(text, "<mark>$1</mark>").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Document, SourceTag};
    use crate::index;
    use crate::repository::InMemoryRepository;
    use crate::text;

    async fn index_text(repo: &InMemoryRepository, text_content: &str) -> crate::core::types::DocId {
        let mut doc = Document::new(format!("https://x/{}", uuid::Uuid::new_v4()), SourceTag::Custom, "t");
        doc.clean_text = text_content.to_string();
        let id = repo.insert_document(doc).await.unwrap();
        index::index_document(repo, id).await.unwrap();
        id
    }

    #[tokio::test]
    async fn s1_single_document_scores_positive() {
        let repo = InMemoryRepository::new();
        let id = index_text(&repo, "search engines index the web and answer queries").await;
        index::update_collection_stats(&repo).await.unwrap();
        let scorer = Bm25Scorer::default();
        let terms = text::stem(&text::remove_stopwords(&text::tokenize("search engine")));
        let page = scorer.search(&repo, &terms, 1, 10).await.unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].doc_id, id);
        assert!(page.results[0].score > 0.0);
        let doc = repo.get_document(id).await.unwrap();
        let snip = snippet(&doc.clean_text, &terms, 250);
        assert!(snip.contains("search engines"));
    }

    #[tokio::test]
    async fn s2_shorter_document_scores_higher_at_equal_tf() {
        let repo = InMemoryRepository::new();
        let a = index_text(&repo, "the cat sat on the mat").await;
        let b = index_text(&repo, "the dog chased the cat").await;
        index::update_collection_stats(&repo).await.unwrap();
        let scorer = Bm25Scorer::default();
        let terms = text::stem(&text::remove_stopwords(&text::tokenize("cat")));
        let page = scorer.search(&repo, &terms, 1, 10).await.unwrap();
        assert_eq!(page.results.len(), 2);
        let score_a = page.results.iter().find(|r| r.doc_id == a).unwrap().score;
        let score_b = page.results.iter().find(|r| r.doc_id == b).unwrap().score;
        let stats_a = repo.document_stats(a).await.unwrap().unwrap();
        let stats_b = repo.document_stats(b).await.unwrap().unwrap();
        assert!(stats_b.total_terms >= stats_a.total_terms);
        assert!(score_a >= score_b);
    }

    #[tokio::test]
    async fn bm25_monotonicity_in_term_frequency() {
        // Property 3
        let repo = InMemoryRepository::new();
        let low = index_text(&repo, "cat dog bird fish").await;
        let high = index_text(&repo, "cat cat cat dog bird fish").await;
        index::update_collection_stats(&repo).await.unwrap();
        let scorer = Bm25Scorer::default();
        let terms = vec!["cat".to_string()];
        let page = scorer.search(&repo, &terms, 1, 10).await.unwrap();
        let low_score = page.results.iter().find(|r| r.doc_id == low).unwrap().score;
        let high_score = page.results.iter().find(|r| r.doc_id == high).unwrap().score;
        assert!(high_score >= low_score);
    }

    #[tokio::test]
    async fn idf_sanity_drops_ubiquitous_terms() {
        // Property 4
        let repo = InMemoryRepository::new();
        index_text(&repo, "common word appears here").await;
        index_text(&repo, "common word appears there").await;
        index::update_collection_stats(&repo).await.unwrap();
        let scorer = Bm25Scorer::default();
        let terms = vec!["common".to_string()];
        let page = scorer.search(&repo, &terms, 1, 10).await.unwrap();
        assert!(page.results.is_empty());
    }

    #[test]
    fn highlight_preserves_casing() {
        let out = highlight("Search Engines are great", &["search".to_string()]);
        assert_eq!(out, "<mark>Search</mark> Engines are great");
    }

    #[test]
    fn html_sanitization() {
        // Property 2
        let html = "<script>bad()</script><style>.x{}</style><p>Hello <b>world</b></p>";
        let text = text::html_to_text(html);
        let tag_re = regex::Regex::new(r"<[a-zA-Z/][^>]*>").unwrap();
        assert!(!tag_re.is_match(&text));
        assert!(!text.contains("bad()"));
        assert!(!text.contains(".x{}"));
    }
}
