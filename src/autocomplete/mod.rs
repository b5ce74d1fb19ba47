//! Autocomplete trie (C10): character-level prefix trie with frequency
//! ordering and a process-wide rebuild-on-demand lifecycle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use parking_lot::RwLock;

use crate::core::error::Result;
use crate::core::types::{AutocompleteTerm, TermOrigin};
use crate::repository::{DocumentRepository, FrequencyOp};

const TITLE_BASE_FREQUENCY: u64 = 5;
const QUERY_BASE_FREQUENCY: u64 = 1;

#[derive(Default)]
struct TrieNode {
    children: HashMap<char, TrieNode>,
    terminal: Option<(String, u64)>,
}

/// Character-level trie keyed by lowercased terms; each terminal stores the
/// original term and its aggregated frequency (spec §4.10).
#[derive(Default)]
pub struct AutocompleteTrie {
    root: TrieNode,
}

impl AutocompleteTrie {
    pub fn new() -> Self {
        AutocompleteTrie::default()
    }

    pub fn build(entries: impl IntoIterator<Item = (String, u64)>) -> Self {
        let mut trie = AutocompleteTrie::new();
        for (term, frequency) in entries {
            trie.insert(&term, frequency);
        }
        trie
    }

    /// Overwrites the terminal's stored frequency — the caller aggregates.
    pub fn insert(&mut self, term: &str, frequency: u64) {
        let lower = term.to_lowercase();
        let mut node = &mut self.root;
        for ch in lower.chars() {
            node = node.children.entry(ch).or_default();
        }
        node.terminal = Some((term.to_string(), frequency));
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Descends by lowercased prefix; DFS under that node, sorted by
    /// frequency descending then term ascending, truncated to `limit`.
    pub fn search_prefix(&self, prefix: &str, limit: usize) -> Vec<(String, u64)> {
        let lower = prefix.to_lowercase();
        let mut node = &self.root;
        for ch in lower.chars() {
            match node.children.get(&ch) {
                Some(next) => node = next,
                None => return Vec::new(),
            }
        }
        let mut out = Vec::new();
        collect(node, &mut out);
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out.truncate(limit);
        out
    }
}

fn collect(node: &TrieNode, out: &mut Vec<(String, u64)>) {
    if let Some((term, freq)) = &node.terminal {
        out.push((term.clone(), *freq));
    }
    for child in node.children.values() {
        collect(child, out);
    }
}

/// Process-wide singleton with lazy first-touch initialization, matching
/// the teacher's `parking_lot` singleton discipline and spec §4.10/§9's
/// "one rebuilder at a time, readers see the previous trie until swap".
pub struct AutocompleteSingleton {
    trie: RwLock<Option<AutocompleteTrie>>,
    dirty: AtomicBool,
}

static SINGLETON: OnceLock<AutocompleteSingleton> = OnceLock::new();

fn singleton() -> &'static AutocompleteSingleton {
    SINGLETON.get_or_init(|| AutocompleteSingleton {
        trie: RwLock::new(None),
        dirty: AtomicBool::new(true),
    })
}

/// Invalidates the process-wide trie; the next reader rebuilds it.
pub fn invalidate() {
    singleton().dirty.store(true, Ordering::SeqCst);
}

async fn ensure_built(repo: &dyn DocumentRepository, top_terms: usize) -> Result<()> {
    let needs_rebuild = singleton().dirty.swap(false, Ordering::SeqCst);
    if needs_rebuild || singleton().trie.read().is_none() {
        let terms = repo.top_autocomplete_terms(top_terms).await?;
        let trie = AutocompleteTrie::build(terms.into_iter().map(|t| (t.term, t.frequency)));
        *singleton().trie.write() = Some(trie);
    }
    Ok(())
}

/// `autocompleteSearch(prefix, limit)`: lazily builds the singleton trie
/// from the top `top_terms` persisted terms by frequency, falling back to a
/// persistent prefix lookup when the trie is empty after invalidation.
pub async fn autocomplete_search(
    repo: &dyn DocumentRepository,
    prefix: &str,
    limit: usize,
    top_terms: usize,
) -> Result<Vec<AutocompleteTerm>> {
    if prefix.trim().len() < 2 {
        return Ok(Vec::new());
    }
    ensure_built(repo, top_terms).await?;

    let hits = {
        let guard = singleton().trie.read();
        guard.as_ref().map(|t| t.search_prefix(prefix, limit)).unwrap_or_default()
    };

    if hits.is_empty() {
        return repo.autocomplete_prefix_fallback(prefix, limit).await;
    }

    Ok(hits
        .into_iter()
        .map(|(term, frequency)| AutocompleteTerm { term, frequency, origin: TermOrigin::Query })
        .collect())
}

/// Lowercases and trims; terms shorter than 2 characters are dropped.
/// Upserts with +1 frequency and invalidates the trie (spec §4.10
/// "Recording queries").
pub async fn record_query_term(repo: &dyn DocumentRepository, term: &str) -> Result<()> {
    let trimmed = term.trim().to_lowercase();
    if trimmed.len() < 2 {
        return Ok(());
    }
    repo.upsert_autocomplete_term(&trimmed, TermOrigin::Query, FrequencyOp::Increment(QUERY_BASE_FREQUENCY))
        .await?;
    invalidate();
    Ok(())
}

/// Document titles get inserted at a higher base frequency than ad hoc
/// query terms (supplemented from `original_source`, see SPEC_FULL §4.10).
pub async fn populate_from_title(repo: &dyn DocumentRepository, title: &str) -> Result<()> {
    let trimmed = title.trim().to_lowercase();
    if trimmed.len() < 2 {
        return Ok(());
    }
    repo.upsert_autocomplete_term(&trimmed, TermOrigin::Title, FrequencyOp::Increment(TITLE_BASE_FREQUENCY))
        .await?;
    invalidate();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s3_search_prefix_orders_by_frequency() {
        let trie = AutocompleteTrie::build(vec![
            ("search engine".to_string(), 10),
            ("search optimization".to_string(), 5),
            ("sorting algorithms".to_string(), 3),
        ]);
        let hits = trie.search_prefix("search", 5);
        assert_eq!(
            hits,
            vec![("search engine".to_string(), 10), ("search optimization".to_string(), 5)]
        );
    }

    #[test]
    fn trie_ordering_never_exceeds_limit_and_respects_prefix() {
        // Property 7
        let trie = AutocompleteTrie::build(vec![
            ("apple".to_string(), 1),
            ("application".to_string(), 5),
            ("apply".to_string(), 3),
            ("banana".to_string(), 9),
        ]);
        let hits = trie.search_prefix("app", 2);
        assert!(hits.len() <= 2);
        for (term, _) in &hits {
            assert!(term.to_lowercase().starts_with("app"));
        }
        let freqs: Vec<u64> = hits.iter().map(|(_, f)| *f).collect();
        let mut sorted = freqs.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(freqs, sorted);
    }

    #[test]
    fn missing_prefix_returns_empty() {
        let trie = AutocompleteTrie::build(vec![("hello".to_string(), 1)]);
        assert!(trie.search_prefix("zzz", 10).is_empty());
    }
}
