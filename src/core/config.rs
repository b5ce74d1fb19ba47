/// Every key from spec §6's "Environment / configuration" list, plus the
/// algorithm parameters named throughout §4. Fields that this crate never
/// dials out on (`database_url`, `redis_url`, `celery_broker_url`,
/// `llm_base_url`) are carried as opaque strings so a real
/// `DocumentRepository`/`Cache`/`JobQueue`/`LlmClient` implementation has
/// somewhere to read them from.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database_url: String,
    pub redis_url: String,
    pub celery_broker_url: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub bm25_k1: f32,
    pub bm25_b: f32,
    pub rrf_k: u32,
    pub max_search_results: usize,
    pub crawl_delay_seconds: f64,
    pub max_crawl_depth: u32,
    pub user_agent: String,

    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    pub autocomplete_top_terms: usize,
    pub crawl_fetch_timeout_secs: u64,
    pub robots_fetch_timeout_secs: u64,
    pub index_task_retries: u32,
    pub index_task_backoff_secs: u64,
    pub crawl_task_retries: u32,
    pub crawl_task_backoff_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database_url: "postgres://localhost/hyperseek".to_string(),
            redis_url: "redis://localhost:6379".to_string(),
            celery_broker_url: "redis://localhost:6379/1".to_string(),
            llm_base_url: "http://localhost:11434".to_string(),
            llm_model: "llama3".to_string(),
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            embedding_dimension: 384,
            chunk_size: 512,
            chunk_overlap: 50,
            bm25_k1: 1.2,
            bm25_b: 0.75,
            rrf_k: 60,
            max_search_results: 100,
            crawl_delay_seconds: 1.0,
            max_crawl_depth: 3,
            user_agent: "hyperseek-engine/0.1".to_string(),

            cache_ttl_secs: 300,
            cache_capacity: 1024,
            autocomplete_top_terms: 50_000,
            crawl_fetch_timeout_secs: 25,
            robots_fetch_timeout_secs: 10,
            index_task_retries: 3,
            index_task_backoff_secs: 30,
            crawl_task_retries: 3,
            crawl_task_backoff_secs: 60,
        }
    }
}
