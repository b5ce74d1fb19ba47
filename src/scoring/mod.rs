pub mod bm25;

pub use bm25::{highlight, snippet, Bm25Page, Bm25Scorer, ScoredDocument};
