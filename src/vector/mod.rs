//! Vector indexer (C3): word-boundary chunking and embedding generation.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;
use crate::repository::{DocumentRepository, EmbeddingChunk};

/// Stands in for `sentence-transformers`/Ollama's embedding endpoint — the
/// out-of-scope external collaborator (spec §1). `embed` is async so a real
/// HTTP-backed implementation fits the same trait.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn dimension(&self) -> usize;
}

/// Deterministic stand-in for a real sentence-embedding model: hashes
/// character trigrams into a fixed-width vector and L2-normalizes. Keeps the
/// dimension and unit-norm contract testable without model weights.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        HashingEmbedder { dimension }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        HashingEmbedder::new(384)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::new(ErrorKind::EmbeddingFailure, "cannot embed empty text"));
        }
        let mut vec = vec![0f32; self.dimension];
        let chars: Vec<char> = text.to_lowercase().chars().collect();
        let trigram_len = 3usize.min(chars.len().max(1));
        if chars.len() < trigram_len {
            return Err(Error::new(ErrorKind::EmbeddingFailure, "text too short to embed"));
        }
        for window in chars.windows(trigram_len) {
            let gram: String = window.iter().collect();
            let mut hasher = Sha256::new();
            hasher.update(gram.as_bytes());
            let digest = hasher.finalize();
            let idx = (u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize)
                % self.dimension;
            let sign = if digest[4] % 2 == 0 { 1.0 } else { -1.0 };
            vec[idx] += sign;
        }
        l2_normalize(&mut vec);
        Ok(vec)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn l2_normalize(v: &mut [f32]) {
    let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Word-boundary chunks of `chunk_size` words with `chunk_overlap` words of
/// overlap. A document with at most `chunk_size` words is returned as one
/// chunk (spec §4.3).
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    if words.len() <= chunk_size {
        return vec![words.join(" ")];
    }
    let stride = chunk_size.saturating_sub(chunk_overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += stride;
    }
    chunks
}

/// Replaces all embeddings for a document atomically. Embedding failures are
/// logged and the document's previous vector set is left untouched (spec
/// §4.3/§7 `EmbeddingFailure`).
pub async fn index_document_vectors(
    repo: &dyn DocumentRepository,
    embedder: &dyn Embedder,
    doc_id: DocId,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<()> {
    let doc = repo.get_document(doc_id).await?;
    if doc.clean_text.trim().is_empty() {
        return Ok(());
    }
    let chunks = chunk_text(&doc.clean_text, chunk_size, chunk_overlap);
    let mut embedded = Vec::with_capacity(chunks.len());
    for (index, chunk_text) in chunks.into_iter().enumerate() {
        match embedder.embed(&chunk_text).await {
            Ok(vector) => embedded.push(EmbeddingChunk { doc_id, chunk_index: index, chunk_text, vector }),
            Err(err) => {
                warn!(?doc_id, error = %err, "embedding generation failed, keeping prior vectors");
                return Ok(());
            }
        }
    }
    repo.replace_embeddings(doc_id, embedded).await
}
