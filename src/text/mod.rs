//! Text processing pipeline: HTML stripping, tokenization, stopword removal,
//! stemming. Query-side and index-side search must call through this same
//! module so normalization never diverges (spec §4.1 invariant).

use ego_tree::NodeRef;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use scraper::{Html, Node};
use std::collections::HashSet;
use std::sync::OnceLock;

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

fn token_re() -> &'static Regex {
    TOKEN_RE.get_or_init(|| Regex::new(r"[a-zA-Z0-9]+").unwrap())
}

/// Tags stripped entirely (including their subtrees) before text extraction.
/// Exactly the six named in spec §4.1 — do not add `aside`.
const STRIPPED_TAGS: [&str; 6] = ["script", "style", "nav", "header", "footer", "noscript"];

// Reproduced from the stopword corpus `original_source` loads via NLTK; kept
// as a fixed static slice since the corpus is small and closed, avoiding a
// runtime download the Python version needs.
const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "aren't", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can't", "cannot", "could", "couldn't", "did", "didn't", "do", "does", "doesn't",
    "doing", "don't", "down", "during", "each", "few", "for", "from", "further", "had", "hadn't",
    "has", "hasn't", "have", "haven't", "having", "he", "he'd", "he'll", "he's", "her", "here",
    "here's", "hers", "herself", "him", "himself", "his", "how", "how's", "i", "i'd", "i'll",
    "i'm", "i've", "if", "in", "into", "is", "isn't", "it", "it's", "its", "itself", "let's",
    "me", "more", "most", "mustn't", "my", "myself", "no", "nor", "not", "of", "off", "on",
    "once", "only", "or", "other", "ought", "our", "ours", "ourselves", "out", "over", "own",
    "same", "shan't", "she", "she'd", "she'll", "she's", "should", "shouldn't", "so", "some",
    "such", "than", "that", "that's", "the", "their", "theirs", "them", "themselves", "then",
    "there", "there's", "these", "they", "they'd", "they'll", "they're", "they've", "this",
    "those", "through", "to", "too", "under", "until", "up", "very", "was", "wasn't", "we",
    "we'd", "we'll", "we're", "we've", "were", "weren't", "what", "what's", "when", "when's",
    "where", "where's", "which", "while", "who", "who's", "whom", "why", "why's", "with",
    "won't", "would", "wouldn't", "you", "you'd", "you'll", "you're", "you've", "your", "yours",
    "yourself", "yourselves",
];

fn stopword_set() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

/// Strips tags/scripts/styles, collapses whitespace, unescapes entities
/// (handled by the HTML parser itself). Empty input yields empty output.
pub fn html_to_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let document = Html::parse_document(html);
    let mut text = String::new();
    walk_text(document.tree.root(), &mut text);
    collapse_whitespace(&text)
}

fn walk_text(node: NodeRef<'_, Node>, out: &mut String) {
    if let Some(el) = node.value().as_element() {
        if STRIPPED_TAGS.contains(&el.name()) {
            return;
        }
    }
    if let Some(t) = node.value().as_text() {
        out.push_str(t);
        out.push(' ');
        return;
    }
    for child in node.children() {
        walk_text(child, out);
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase tokens matching `[a-zA-Z0-9]+`; length outside `[2, 50]` dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    token_re()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| t.len() >= 2 && t.len() <= 50)
        .collect()
}

pub fn remove_stopwords(tokens: &[String]) -> Vec<String> {
    let stop = stopword_set();
    tokens
        .iter()
        .filter(|t| !stop.contains(t.as_str()))
        .cloned()
        .collect()
}

pub fn stem(tokens: &[String]) -> Vec<String> {
    let stemmer = Stemmer::create(Algorithm::English);
    tokens.iter().map(|t| stemmer.stem(t).into_owned()).collect()
}

/// Stopword-filtered, optionally stemmed token sequence.
pub fn process(text: &str, do_stem: bool) -> Vec<String> {
    let tokens = tokenize(text);
    let filtered = remove_stopwords(&tokens);
    if do_stem {
        stem(&filtered)
    } else {
        filtered
    }
}

/// `(stemmed_token, original_position)` pairs where position indexes into
/// the raw tokenized sequence *before* stopword removal — required so
/// position lists stay meaningful against the unfiltered token stream.
pub fn process_with_positions(text: &str) -> Vec<(String, u32)> {
    let stemmer = Stemmer::create(Algorithm::English);
    let stop = stopword_set();
    tokenize(text)
        .into_iter()
        .enumerate()
        .filter(|(_, tok)| !stop.contains(tok.as_str()))
        .map(|(pos, tok)| (stemmer.stem(&tok).into_owned(), pos as u32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_to_text_strips_script_and_style() {
        let html = "<html><body><script>alert(1)</script><style>.x{}</style><p>Hello world</p></body></html>";
        let text = html_to_text(html);
        assert!(!text.contains("alert"));
        assert!(!text.contains(".x{}"));
        assert!(text.contains("Hello world"));
    }

    #[test]
    fn html_to_text_empty_input() {
        assert_eq!(html_to_text(""), "");
        assert_eq!(html_to_text("   "), "");
    }

    #[test]
    fn tokenize_drops_short_and_long_tokens() {
        let tokens = tokenize("a bb ccc ".to_string().repeat(1).as_str());
        assert_eq!(tokens, vec!["bb", "ccc"]);
        let long = "x".repeat(51);
        assert!(tokenize(&long).is_empty());
    }

    #[test]
    fn pipeline_equivalence() {
        // Property 1: processWithPositions and process(stem=true) agree on
        // the multiset of stemmed tokens.
        let text = "Search engines index the web and answer queries";
        let mut a: Vec<String> = process_with_positions(text).into_iter().map(|(t, _)| t).collect();
        let mut b = process(text, true);
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn query_and_index_side_use_same_normalization() {
        let indexed = process("Running runners run", true);
        let queried = process("running", true);
        assert!(indexed.contains(&queried[0]));
    }
}
