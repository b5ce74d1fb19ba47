use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex as PLMutex, RwLock};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::*;

#[derive(Debug, Clone)]
pub struct Posting {
    pub term: String,
    pub doc_id: DocId,
    pub term_freq: u32,
    pub positions: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct EmbeddingChunk {
    pub doc_id: DocId,
    pub chunk_index: usize,
    pub chunk_text: String,
    pub vector: Vec<f32>,
}

/// Either an aggregate increment (query-time term recording) or an
/// authoritative overwrite (`insert` in the trie's own vocabulary, spec §4.10
/// — "overwrites the terminal's stored frequency, the caller aggregates").
#[derive(Debug, Clone, Copy)]
pub enum FrequencyOp {
    Increment(u64),
    Set(u64),
}

/// The persistence seam every component in this crate reaches through.
/// Stands in for Postgres + pgvector in the external system this crate
/// models; a real deployment swaps this trait for a SQL-backed
/// implementation without touching any caller.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn insert_document(&self, doc: Document) -> Result<DocId>;
    async fn get_document(&self, id: DocId) -> Result<Document>;
    async fn get_document_by_url(&self, url: &str) -> Result<Option<Document>>;
    async fn all_document_ids(&self) -> Result<Vec<DocId>>;
    async fn mark_indexed(&self, id: DocId, at: DateTime<Utc>) -> Result<()>;

    /// Atomic delete-then-insert of a document's postings plus its stats;
    /// resolves spec §9's open question in favor of "atomic at the
    /// persistence layer."
    async fn replace_postings(
        &self,
        doc_id: DocId,
        postings: Vec<Posting>,
        stats: DocumentStats,
    ) -> Result<()>;
    async fn postings_for_term(&self, term: &str) -> Result<Vec<Posting>>;
    async fn document_frequency(&self, term: &str) -> Result<u64>;
    async fn document_stats(&self, doc_id: DocId) -> Result<Option<DocumentStats>>;
    async fn all_document_stats(&self) -> Result<Vec<DocumentStats>>;
    async fn collection_stats(&self) -> Result<CollectionStats>;
    async fn set_collection_stats(&self, stats: CollectionStats) -> Result<()>;

    async fn replace_embeddings(&self, doc_id: DocId, chunks: Vec<EmbeddingChunk>) -> Result<()>;
    async fn all_embeddings(&self) -> Result<Vec<EmbeddingChunk>>;

    async fn upsert_autocomplete_term(
        &self,
        term: &str,
        origin: TermOrigin,
        op: FrequencyOp,
    ) -> Result<()>;
    async fn top_autocomplete_terms(&self, limit: usize) -> Result<Vec<AutocompleteTerm>>;
    async fn autocomplete_prefix_fallback(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<AutocompleteTerm>>;

    async fn create_crawl_job(&self, job: CrawlJob) -> Result<Uuid>;
    async fn get_crawl_job(&self, id: Uuid) -> Result<CrawlJob>;
    async fn update_crawl_job(&self, job: CrawlJob) -> Result<()>;

    async fn log_query(&self, entry: QueryLogEntry) -> Result<()>;
    async fn log_click(&self, event: ClickEvent) -> Result<()>;

    /// Per-document async mutex so concurrent reindex attempts for the same
    /// document serialize (spec §3/§5).
    fn lock_document(&self, id: DocId) -> Arc<Mutex<()>>;
}

#[derive(Default)]
struct Inner {
    documents: HashMap<DocId, Document>,
    url_index: HashMap<String, DocId>,
    postings: HashMap<String, Vec<Posting>>,
    doc_stats: HashMap<DocId, DocumentStats>,
    collection_stats: CollectionStats,
    embeddings: HashMap<DocId, Vec<EmbeddingChunk>>,
    autocomplete: HashMap<String, AutocompleteTerm>,
    autocomplete_dirty: bool,
    crawl_jobs: HashMap<Uuid, CrawlJob>,
    query_log: Vec<QueryLogEntry>,
    click_log: Vec<ClickEvent>,
}

/// In-process reference implementation of `DocumentRepository`, used by
/// every test in this crate and as the default single-node collaborator.
pub struct InMemoryRepository {
    inner: RwLock<Inner>,
    doc_locks: PLMutex<HashMap<DocId, Arc<Mutex<()>>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        InMemoryRepository {
            inner: RwLock::new(Inner::default()),
            doc_locks: PLMutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryRepository {
    async fn insert_document(&self, doc: Document) -> Result<DocId> {
        let mut inner = self.inner.write();
        if inner.url_index.contains_key(&doc.url) {
            return Err(Error::new(
                ErrorKind::Conflict,
                format!("document with url {} already exists", doc.url),
            ));
        }
        let id = doc.id;
        inner.url_index.insert(doc.url.clone(), id);
        inner.documents.insert(id, doc);
        Ok(id)
    }

    async fn get_document(&self, id: DocId) -> Result<Document> {
        self.inner
            .read()
            .documents
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("document {:?} not found", id)))
    }

    async fn get_document_by_url(&self, url: &str) -> Result<Option<Document>> {
        let inner = self.inner.read();
        Ok(inner
            .url_index
            .get(url)
            .and_then(|id| inner.documents.get(id))
            .cloned())
    }

    async fn all_document_ids(&self) -> Result<Vec<DocId>> {
        Ok(self.inner.read().documents.keys().copied().collect())
    }

    async fn mark_indexed(&self, id: DocId, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.write();
        let doc = inner
            .documents
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("document {:?} not found", id)))?;
        doc.indexed_at = Some(at);
        Ok(())
    }

    async fn replace_postings(
        &self,
        doc_id: DocId,
        postings: Vec<Posting>,
        stats: DocumentStats,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        for list in inner.postings.values_mut() {
            list.retain(|p| p.doc_id != doc_id);
        }
        for posting in postings {
            inner.postings.entry(posting.term.clone()).or_default().push(posting);
        }
        inner.doc_stats.insert(doc_id, stats);
        Ok(())
    }

    async fn postings_for_term(&self, term: &str) -> Result<Vec<Posting>> {
        Ok(self.inner.read().postings.get(term).cloned().unwrap_or_default())
    }

    async fn document_frequency(&self, term: &str) -> Result<u64> {
        Ok(self
            .inner
            .read()
            .postings
            .get(term)
            .map(|p| p.len() as u64)
            .unwrap_or(0))
    }

    async fn document_stats(&self, doc_id: DocId) -> Result<Option<DocumentStats>> {
        Ok(self.inner.read().doc_stats.get(&doc_id).cloned())
    }

    async fn all_document_stats(&self) -> Result<Vec<DocumentStats>> {
        Ok(self.inner.read().doc_stats.values().cloned().collect())
    }

    async fn collection_stats(&self) -> Result<CollectionStats> {
        Ok(self.inner.read().collection_stats)
    }

    async fn set_collection_stats(&self, stats: CollectionStats) -> Result<()> {
        self.inner.write().collection_stats = stats;
        Ok(())
    }

    async fn replace_embeddings(&self, doc_id: DocId, chunks: Vec<EmbeddingChunk>) -> Result<()> {
        self.inner.write().embeddings.insert(doc_id, chunks);
        Ok(())
    }

    async fn all_embeddings(&self) -> Result<Vec<EmbeddingChunk>> {
        Ok(self
            .inner
            .read()
            .embeddings
            .values()
            .flat_map(|v| v.iter().cloned())
            .collect())
    }

    async fn upsert_autocomplete_term(
        &self,
        term: &str,
        origin: TermOrigin,
        op: FrequencyOp,
    ) -> Result<()> {
        let key = term.to_lowercase();
        let mut inner = self.inner.write();
        let entry = inner.autocomplete.entry(key.clone()).or_insert(AutocompleteTerm {
            term: key.clone(),
            frequency: 0,
            origin,
        });
        match op {
            FrequencyOp::Increment(n) => entry.frequency += n,
            FrequencyOp::Set(n) => entry.frequency = n,
        }
        inner.autocomplete_dirty = true;
        Ok(())
    }

    async fn top_autocomplete_terms(&self, limit: usize) -> Result<Vec<AutocompleteTerm>> {
        let inner = self.inner.read();
        let mut terms: Vec<AutocompleteTerm> = inner.autocomplete.values().cloned().collect();
        terms.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.term.cmp(&b.term)));
        terms.truncate(limit);
        Ok(terms)
    }

    async fn autocomplete_prefix_fallback(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<AutocompleteTerm>> {
        let prefix = prefix.to_lowercase();
        let inner = self.inner.read();
        let mut terms: Vec<AutocompleteTerm> = inner
            .autocomplete
            .values()
            .filter(|t| t.term.starts_with(&prefix))
            .cloned()
            .collect();
        terms.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.term.cmp(&b.term)));
        terms.truncate(limit);
        Ok(terms)
    }

    async fn create_crawl_job(&self, job: CrawlJob) -> Result<Uuid> {
        let id = job.id;
        self.inner.write().crawl_jobs.insert(id, job);
        Ok(id)
    }

    async fn get_crawl_job(&self, id: Uuid) -> Result<CrawlJob> {
        self.inner
            .read()
            .crawl_jobs
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("crawl job {} not found", id)))
    }

    async fn update_crawl_job(&self, job: CrawlJob) -> Result<()> {
        self.inner.write().crawl_jobs.insert(job.id, job);
        Ok(())
    }

    async fn log_query(&self, entry: QueryLogEntry) -> Result<()> {
        self.inner.write().query_log.push(entry);
        Ok(())
    }

    async fn log_click(&self, event: ClickEvent) -> Result<()> {
        self.inner.write().click_log.push(event);
        Ok(())
    }

    fn lock_document(&self, id: DocId) -> Arc<Mutex<()>> {
        let mut locks = self.doc_locks.lock();
        locks.entry(id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }
}
