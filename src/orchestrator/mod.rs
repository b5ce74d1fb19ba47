//! Crawl orchestrator (C12): drains a crawler's page stream, dedups by URL,
//! cleans HTML, persists documents, and tracks crawl job state.

use chrono::Utc;
use tokio_stream::StreamExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::error::Result;
use crate::core::types::{CrawlJob, CrawlJobState, Document};
use crate::crawl::Crawler;
use crate::repository::DocumentRepository;
use crate::text;

/// Pages whose cleaned text is shorter than this are treated as noise
/// (nav shells, paywalled stubs) and dropped rather than indexed.
const MIN_CLEAN_TEXT_LEN: usize = 50;

/// Job progress is checkpointed to the repository every this many pages
/// drained from the stream, so a crash mid-crawl loses at most one
/// checkpoint's worth of progress.
const CHECKPOINT_INTERVAL: u64 = 10;

/// Creates a `Pending` crawl job for `crawler`'s source and runs it to
/// completion, returning the job id. On failure the job is left `Failed`
/// with its partial counters intact rather than rolled back.
pub async fn start_crawl_job(
    repo: &dyn DocumentRepository,
    crawler: &dyn Crawler,
    config: serde_json::Value,
) -> Result<Uuid> {
    let config = crawler.validate_config(config)?;
    let job = CrawlJob::new(crawler.source(), config.clone());
    let job_id = repo.create_crawl_job(job).await?;
    run_crawl_job(repo, crawler, job_id, config).await?;
    Ok(job_id)
}

/// Runs an already-created job. Exposed separately from `start_crawl_job`
/// so a worker retrying a `Failed` job doesn't need to recreate it.
pub async fn run_crawl_job(
    repo: &dyn DocumentRepository,
    crawler: &dyn Crawler,
    job_id: Uuid,
    config: serde_json::Value,
) -> Result<()> {
    let mut job = repo.get_crawl_job(job_id).await?;
    job.state = CrawlJobState::Running;
    job.started_at = Some(Utc::now());
    repo.update_crawl_job(job.clone()).await?;

    let outcome = drain(repo, crawler, &mut job, config).await;

    job.completed_at = Some(Utc::now());
    match &outcome {
        Ok(()) => {
            job.state = CrawlJobState::Completed;
            info!(
                job_id = %job_id,
                found = job.documents_found,
                indexed = job.documents_indexed,
                "crawl job completed"
            );
        }
        Err(err) => {
            job.state = CrawlJobState::Failed;
            job.error_message = Some(err.to_string());
            warn!(job_id = %job_id, %err, "crawl job failed");
        }
    }
    repo.update_crawl_job(job).await?;
    outcome
}

async fn drain(
    repo: &dyn DocumentRepository,
    crawler: &dyn Crawler,
    job: &mut CrawlJob,
    config: serde_json::Value,
) -> Result<()> {
    let mut stream = crawler.crawl(config).await?;
    let mut since_checkpoint = 0u64;

    while let Some(page) = stream.next().await {
        job.documents_found += 1;
        since_checkpoint += 1;

        if repo.get_document_by_url(&page.url).await?.is_none() {
            let clean_text = text::html_to_text(&page.raw_html);
            if clean_text.len() >= MIN_CLEAN_TEXT_LEN {
                let mut doc = Document::new(page.url, page.source, page.title);
                doc.raw_html = page.raw_html;
                doc.word_count = clean_text.split_whitespace().count();
                doc.clean_text = clean_text;
                doc.metadata = page.metadata;
                repo.insert_document(doc).await?;
                job.documents_indexed += 1;
            }
        }

        if since_checkpoint >= CHECKPOINT_INTERVAL {
            repo.update_crawl_job(job.clone()).await?;
            since_checkpoint = 0;
        }
    }

    Ok(())
}
