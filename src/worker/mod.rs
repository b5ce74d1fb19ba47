//! Index worker (C13): background index/crawl tasks with bounded,
//! exponentially-backed-off retry. Stands in for Celery; `JobQueue` is the
//! trait boundary a real task-queue client would implement (spec §1, §6).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::config::EngineConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, SourceTag};
use crate::crawl::Crawler;
use crate::index;
use crate::orchestrator;
use crate::repository::DocumentRepository;
use crate::vector::{self, Embedder};

/// Retries `op` up to `retries` additional times (so `retries + 1` attempts
/// total) with a fixed countdown between attempts, per §7's per-kind retry
/// policy. Only `ErrorKind::is_retryable` errors are retried; anything else
/// fails fast.
pub async fn retry_with_backoff<F, Fut>(retries: u32, backoff: Duration, mut op: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(()) => return Ok(()),
            Err(err) if err.kind.is_retryable() && attempt < retries => {
                attempt += 1;
                warn!(attempt, max = retries, %err, "retrying after backoff");
                tokio::time::sleep(backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// `indexDocument` task: text processing -> postings -> vectors -> stats.
pub async fn index_document_task(
    repo: &dyn DocumentRepository,
    embedder: &dyn Embedder,
    config: &EngineConfig,
    doc_id: DocId,
) -> Result<()> {
    let backoff = Duration::from_secs(config.index_task_backoff_secs);
    retry_with_backoff(config.index_task_retries, backoff, || async {
        let lock = repo.lock_document(doc_id);
        let _guard = lock.lock().await;
        index::index_document(repo, doc_id).await?;
        vector::index_document_vectors(repo, embedder, doc_id, config.chunk_size, config.chunk_overlap).await?;
        index::update_collection_stats(repo).await
    })
    .await
}

/// `indexBatch` task: isolates per-document failures and continues, then
/// recomputes Collection Stats once at the end (spec §4.13).
pub async fn index_batch_task(
    repo: &dyn DocumentRepository,
    embedder: &dyn Embedder,
    config: &EngineConfig,
    doc_ids: &[DocId],
) -> Result<()> {
    let backoff = Duration::from_secs(config.index_task_backoff_secs);
    for &doc_id in doc_ids {
        let outcome = retry_with_backoff(config.index_task_retries, backoff, || async {
            let lock = repo.lock_document(doc_id);
            let _guard = lock.lock().await;
            index::index_document(repo, doc_id).await?;
            vector::index_document_vectors(repo, embedder, doc_id, config.chunk_size, config.chunk_overlap).await
        })
        .await;

        if let Err(err) = outcome {
            error!(?doc_id, %err, "index_batch: document failed, continuing batch");
        }
    }
    index::update_collection_stats(repo).await
}

/// `fullReindex` task: every known document, single stats update at the end.
pub async fn full_reindex_task(
    repo: &dyn DocumentRepository,
    embedder: &dyn Embedder,
    config: &EngineConfig,
) -> Result<()> {
    let ids = repo.all_document_ids().await?;
    info!(count = ids.len(), "starting full reindex");
    index_batch_task(repo, embedder, config, &ids).await
}

/// `crawl` task: runs an orchestrator job with the §7 crawl retry policy.
/// A failed job is retried from scratch (the orchestrator's dedup-by-URL
/// step makes re-running idempotent for already-persisted pages).
pub async fn crawl_task(
    repo: &dyn DocumentRepository,
    crawler: &dyn Crawler,
    config: &EngineConfig,
    job_id: Uuid,
    crawl_config: Value,
) -> Result<()> {
    let backoff = Duration::from_secs(config.crawl_task_backoff_secs);
    retry_with_backoff(config.crawl_task_retries, backoff, || {
        let crawl_config = crawl_config.clone();
        async move { orchestrator::run_crawl_job(repo, crawler, job_id, crawl_config).await }
    })
    .await
}

/// Stands in for the Celery broker (`celery_broker_url`, spec §6): accepts
/// work items and schedules them. The in-process implementation below runs
/// each submission on its own `tokio::spawn`ed task rather than publishing
/// to a real broker.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue_index_document(&self, doc_id: DocId) -> Result<()>;
    async fn enqueue_crawl(&self, source: SourceTag, config: Value) -> Result<Uuid>;
}

/// In-process `JobQueue`: every enqueue spawns a detached task running the
/// matching worker function against a shared repository/embedder/crawler
/// registry. Errors surface only via `tracing` events, matching how a real
/// Celery worker's failures are invisible to the enqueueing caller.
pub struct InProcessJobQueue {
    repo: Arc<dyn DocumentRepository>,
    embedder: Arc<dyn Embedder>,
    config: EngineConfig,
    crawlers: Vec<(SourceTag, Arc<dyn Crawler>)>,
}

impl InProcessJobQueue {
    pub fn new(
        repo: Arc<dyn DocumentRepository>,
        embedder: Arc<dyn Embedder>,
        config: EngineConfig,
        crawlers: Vec<(SourceTag, Arc<dyn Crawler>)>,
    ) -> Self {
        InProcessJobQueue { repo, embedder, config, crawlers }
    }

    fn crawler_for(&self, source: SourceTag) -> Option<Arc<dyn Crawler>> {
        self.crawlers.iter().find(|(s, _)| *s == source).map(|(_, c)| c.clone())
    }
}

#[async_trait]
impl JobQueue for InProcessJobQueue {
    async fn enqueue_index_document(&self, doc_id: DocId) -> Result<()> {
        let repo = self.repo.clone();
        let embedder = self.embedder.clone();
        let config = self.config.clone();
        tokio::spawn(async move {
            if let Err(err) = index_document_task(repo.as_ref(), embedder.as_ref(), &config, doc_id).await {
                error!(?doc_id, %err, "background index_document failed");
            }
        });
        Ok(())
    }

    async fn enqueue_crawl(&self, source: SourceTag, crawl_config: Value) -> Result<Uuid> {
        let crawler = self
            .crawler_for(source)
            .ok_or_else(|| Error::new(ErrorKind::BadConfig, format!("no crawler registered for {:?}", source)))?;

        let validated = crawler.validate_config(crawl_config)?;
        let job = crate::core::types::CrawlJob::new(source, validated.clone());
        let job_id = self.repo.create_crawl_job(job).await?;

        let repo = self.repo.clone();
        let config = self.config.clone();
        tokio::spawn(async move {
            if let Err(err) = crawl_task(repo.as_ref(), crawler.as_ref(), &config, job_id, validated).await {
                error!(%job_id, %err, "background crawl task failed");
            }
        });

        Ok(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::core::error::ErrorKind;

    #[tokio::test]
    async fn succeeds_without_retry() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_retryable_errors_up_to_the_limit() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(2, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::new(ErrorKind::RetryableRemote, "flaky")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(5, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::new(ErrorKind::BadConfig, "never retry this")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn index_document_task_runs_full_pipeline() {
        use crate::core::types::{Document, SourceTag};
        use crate::repository::InMemoryRepository;
        use crate::vector::HashingEmbedder;

        let repo = InMemoryRepository::new();
        let embedder = HashingEmbedder::default();
        let config = EngineConfig::default();

        let mut doc = Document::new("https://x/doc", SourceTag::Custom, "t");
        doc.clean_text = "the quick brown fox jumps over the lazy dog".to_string();
        let id = repo.insert_document(doc).await.unwrap();

        index_document_task(&repo, &embedder, &config, id).await.unwrap();

        assert!(repo.document_stats(id).await.unwrap().is_some());
        assert!(!repo.all_embeddings().await.unwrap().is_empty());
        assert_eq!(repo.collection_stats().await.unwrap().total_documents, 1);
    }
}
