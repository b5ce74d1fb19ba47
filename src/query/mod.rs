//! Query processor (C4): normalizes a raw query into cleaned text, stemmed
//! tokens, raw stopword-filtered tokens, and a deterministic cache key.

use sha2::{Digest, Sha256};

use crate::text;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedQuery {
    pub original: String,
    pub cleaned: String,
    pub tokens: Vec<String>,
    pub raw_tokens: Vec<String>,
    pub cache_key: String,
}

/// `cacheKey` hashes the sorted, deduplicated stemmed token set with
/// `sha2::Sha256` so `"foo bar"`, `"bar foo"`, and `"bar bar foo"` collide
/// (spec §4.4/§8 Property 6). A cryptographic digest is used for the same
/// reason the original system uses one (determinism across runs/processes).
fn cache_key(tokens: &[String]) -> String {
    let mut unique: Vec<&str> = tokens.iter().map(String::as_str).collect();
    unique.sort_unstable();
    unique.dedup();
    let joined = unique.join(" ");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn process(query: &str) -> ProcessedQuery {
    let cleaned = query.split_whitespace().collect::<Vec<_>>().join(" ");
    let raw_tokens = text::remove_stopwords(&text::tokenize(&cleaned));
    let tokens = text::stem(&raw_tokens);
    let key = cache_key(&tokens);
    ProcessedQuery {
        original: query.to_string(),
        cleaned,
        tokens,
        raw_tokens,
        cache_key: key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_order_and_whitespace_invariant() {
        // Property 6
        let a = process("foo bar");
        let b = process("  bar   foo ");
        let c = process("bar bar foo");
        assert_eq!(a.cache_key, b.cache_key);
        assert_eq!(a.cache_key, c.cache_key);
    }

    #[test]
    fn cache_key_differs_for_disjoint_tokens() {
        let a = process("apples");
        let b = process("oranges");
        assert_ne!(a.cache_key, b.cache_key);
    }

    #[test]
    fn cleaned_collapses_whitespace() {
        let p = process("  search   engine  ");
        assert_eq!(p.cleaned, "search engine");
    }
}
