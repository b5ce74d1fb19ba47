use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub Uuid);

impl DocId {
    pub fn new() -> Self {
        DocId(Uuid::new_v4())
    }
}

impl Default for DocId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceTag {
    Wikipedia,
    Reddit,
    Hackernews,
    Custom,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Wikipedia => "wikipedia",
            SourceTag::Reddit => "reddit",
            SourceTag::Hackernews => "hackernews",
            SourceTag::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub url: String,
    pub source: SourceTag,
    pub title: String,
    pub raw_html: String,
    pub clean_text: String,
    pub metadata: HashMap<String, String>,
    pub language: String,
    pub word_count: usize,
    pub crawled_at: DateTime<Utc>,
    pub indexed_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(url: impl Into<String>, source: SourceTag, title: impl Into<String>) -> Self {
        Document {
            id: DocId::new(),
            url: url.into(),
            source,
            title: title.into(),
            raw_html: String::new(),
            clean_text: String::new(),
            metadata: HashMap::new(),
            language: "en".to_string(),
            word_count: 0,
            crawled_at: Utc::now(),
            indexed_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrawlJobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlJob {
    pub id: Uuid,
    pub source: SourceTag,
    pub state: CrawlJobState,
    pub config: serde_json::Value,
    pub documents_found: u64,
    pub documents_indexed: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl CrawlJob {
    pub fn new(source: SourceTag, config: serde_json::Value) -> Self {
        CrawlJob {
            id: Uuid::new_v4(),
            source,
            state: CrawlJobState::Pending,
            config,
            documents_found: 0,
            documents_indexed: 0,
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermOrigin {
    Query,
    Title,
    Content,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutocompleteTerm {
    pub term: String,
    pub frequency: u64,
    pub origin: TermOrigin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStats {
    pub doc_id: DocId,
    pub total_terms: u64,
    pub unique_terms: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total_documents: u64,
    pub avgdl: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub query: String,
    pub query_type: String,
    pub total_hits: usize,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickEvent {
    pub query: String,
    pub document_id: DocId,
    pub clicked_at: DateTime<Utc>,
}
