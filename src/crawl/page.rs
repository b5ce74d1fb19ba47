use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use serde_json::Value;
use tokio_stream::Stream;

use crate::core::error::Result;
use crate::core::types::SourceTag;

#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub title: String,
    pub raw_html: String,
    pub source: SourceTag,
    pub metadata: HashMap<String, String>,
}

pub type PageStream = Pin<Box<dyn Stream<Item = Page> + Send>>;

/// `Crawler` is a capability: validate an opaque config, then produce a
/// finite, lazily-produced sequence of pages so the orchestrator applies
/// backpressure naturally (spec §4.11, §9 lazy-sequence idiom).
#[async_trait]
pub trait Crawler: Send + Sync {
    fn source(&self) -> SourceTag;
    fn validate_config(&self, config: Value) -> Result<Value>;
    async fn crawl(&self, config: Value) -> Result<PageStream>;
}
