use tracing_subscriber::EnvFilter;

/// Initializes a process-wide `tracing` subscriber. Safe to call more than
/// once; later calls are no-ops (mirrors the teacher's one-shot singleton
/// discipline for the embedding model / autocomplete trie).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
