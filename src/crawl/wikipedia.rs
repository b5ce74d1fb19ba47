//! Wikipedia source: MediaWiki search API for candidate titles, then the
//! parse API per title for rendered HTML and categories (spec §4.11).

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::SourceTag;

use super::page::{Crawler, Page, PageStream};
use super::page_channel;

const MAX_PAGES_CEILING: u64 = 100;
const API_BASE: &str = "https://en.wikipedia.org/w/api.php";

#[derive(Debug, Clone, Deserialize)]
pub struct WikipediaConfig {
    pub query: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: u64,
}

fn default_max_pages() -> u64 {
    10
}

pub struct WikipediaCrawler {
    client: Client,
}

impl WikipediaCrawler {
    pub fn new(client: Client) -> Self {
        WikipediaCrawler { client }
    }

    async fn search_titles(&self, query: &str, limit: u64) -> Result<Vec<String>> {
        let resp: SearchResponse = self
            .client
            .get(API_BASE)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("format", "json"),
                ("srsearch", query),
                ("srlimit", &limit.to_string()),
            ])
            .send()
            .await?
            .json()
            .await?;
        Ok(resp.query.search.into_iter().map(|r| r.title).collect())
    }

    async fn fetch_page(&self, title: &str) -> Result<Page> {
        let resp: ParseResponse = self
            .client
            .get(API_BASE)
            .query(&[
                ("action", "parse"),
                ("format", "json"),
                ("prop", "text|categories"),
                ("page", title),
            ])
            .send()
            .await?
            .json()
            .await?;

        let mut metadata = HashMap::new();
        metadata.insert("page_id".to_string(), resp.parse.pageid.to_string());
        metadata.insert(
            "categories".to_string(),
            resp.parse.categories.iter().map(|c| c.title.clone()).collect::<Vec<_>>().join(", "),
        );

        Ok(Page {
            url: format!("https://en.wikipedia.org/wiki/{}", resp.parse.title.replace(' ', "_")),
            title: resp.parse.title,
            raw_html: resp.parse.text.value,
            source: SourceTag::Wikipedia,
            metadata,
        })
    }
}

#[async_trait]
impl Crawler for WikipediaCrawler {
    fn source(&self) -> SourceTag {
        SourceTag::Wikipedia
    }

    fn validate_config(&self, config: Value) -> Result<Value> {
        let mut cfg: WikipediaConfig = serde_json::from_value(config)
            .map_err(|e| Error::new(ErrorKind::BadConfig, format!("wikipedia config: {e}")))?;
        if cfg.query.trim().is_empty() {
            return Err(Error::bad_config("wikipedia config requires a non-empty query"));
        }
        cfg.max_pages = cfg.max_pages.clamp(1, MAX_PAGES_CEILING);
        Ok(serde_json::to_value(cfg).expect("serializable config"))
    }

    async fn crawl(&self, config: Value) -> Result<PageStream> {
        let cfg: WikipediaConfig = serde_json::from_value(self.validate_config(config)?)
            .expect("validated config round-trips");

        let titles = self.search_titles(&cfg.query, cfg.max_pages).await?;
        let (tx, stream) = page_channel();
        let client = self.client.clone();
        let crawler = WikipediaCrawler { client };

        tokio::spawn(async move {
            for title in titles {
                match crawler.fetch_page(&title).await {
                    Ok(page) => {
                        if tx.send(page).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!(%title, %err, "wikipedia: skipping page"),
                }
            }
        });

        Ok(stream)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: SearchQuery,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    search: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    parse: ParseResult,
}

#[derive(Debug, Deserialize)]
struct ParseResult {
    title: String,
    pageid: u64,
    text: ParseText,
    #[serde(default)]
    categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct ParseText {
    #[serde(rename = "*")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(rename = "*")]
    title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_query() {
        let crawler = WikipediaCrawler::new(Client::new());
        let err = crawler.validate_config(serde_json::json!({"query": ""})).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadConfig);
    }

    #[test]
    fn clamps_max_pages_to_ceiling() {
        let crawler = WikipediaCrawler::new(Client::new());
        let normalized = crawler.validate_config(serde_json::json!({"query": "rust", "max_pages": 500})).unwrap();
        assert_eq!(normalized["max_pages"], 100);
    }
}
