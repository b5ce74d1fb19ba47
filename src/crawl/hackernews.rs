//! Hacker News source: Algolia for keyword search, the Firebase API for
//! top/new/best lists, then a fetch of each story's external URL for page
//! HTML (spec §4.11).

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
const ALGOLIA_SEARCH: &str = "https://hn.algolia.com/api/v1/search";
const FIREBASE_BASE: &str = "https://hacker-news.firebaseio.com/v0";

#[derive(Debug, Clone, Deserialize)]
pub struct HackerNewsConfig {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default = "default_list_type")]
    pub list_type: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: u64,
}

fn default_list_type() -> String {
    "top".to_string()
}
fn default_max_pages() -> u64 {
    10
}

struct Story {
    id: u64,
    title: String,
    url: Option<String>,
    points: i64,
    author: String,
    num_comments: u64,
    created_at: i64,
}

pub struct HackerNewsCrawler {
    client: Client,
}

impl HackerNewsCrawler {
    pub fn new(client: Client) -> Self {
        HackerNewsCrawler { client }
    }

    async fn search_stories(&self, query: &str, limit: u64) -> Result<Vec<Story>> {
        let resp: AlgoliaResponse = self
            .client
            .get(ALGOLIA_SEARCH)
            .query(&[("query", query), ("tags", "story"), ("hitsPerPage", &limit.to_string())])
            .send()
            .await?
            .json()
            .await?;

        Ok(resp
            .hits
            .into_iter()
            .map(|h| Story {
                id: h.object_id.parse().unwrap_or(0),
                title: h.title.unwrap_or_default(),
                url: h.url,
                points: h.points.unwrap_or(0),
                author: h.author.unwrap_or_default(),
                num_comments: h.num_comments.unwrap_or(0),
                created_at: h.created_at_i.unwrap_or(0),
            })
            .collect())
    }

    async fn list_stories(&self, list_type: &str, limit: u64) -> Result<Vec<Story>> {
        let endpoint = match list_type {
            "new" => "newstories",
            "best" => "beststories",
            _ => "topstories",
        };
        let ids: Vec<u64> = self
            .client
            .get(format!("{FIREBASE_BASE}/{endpoint}.json"))
            .send()
            .await?
            .json()
            .await?;

        let mut stories = Vec::new();
        for id in ids.into_iter().take(limit as usize) {
            match self.fetch_item(id).await {
                Ok(item) => stories.push(item),
                Err(err) => warn!(id, %err, "hackernews: skipping item"),
            }
        }
        Ok(stories)
    }

    async fn fetch_item(&self, id: u64) -> Result<Story> {
        let item: Item = self.client.get(format!("{FIREBASE_BASE}/item/{id}.json")).send().await?.json().await?;
        Ok(Story {
            id: item.id,
            title: item.title.unwrap_or_default(),
            url: item.url,
            points: item.score.unwrap_or(0),
            author: item.by.unwrap_or_default(),
            num_comments: item.descendants.unwrap_or(0),
            created_at: item.time.unwrap_or(0),
        })
    }

    async fn to_page(&self, story: Story) -> Page {
        let hn_url = format!("https://news.ycombinator.com/item?id={}", story.id);
        let (page_url, raw_html) = match &story.url {
            Some(external) => match self.client.get(external).send().await {
                Ok(resp) => match resp.text().await {
                    Ok(body) => (external.clone(), body),
                    Err(_) => (hn_url.clone(), format!("<h1>{}</h1>", story.title)),
                },
                Err(_) => (hn_url.clone(), format!("<h1>{}</h1>", story.title)),
            },
            None => (hn_url.clone(), format!("<h1>{}</h1>", story.title)),
        };

        let mut metadata = HashMap::new();
        metadata.insert("hn_id".to_string(), story.id.to_string());
        metadata.insert("hn_url".to_string(), hn_url);
        metadata.insert("points".to_string(), story.points.to_string());
        metadata.insert("author".to_string(), story.author.clone());
        metadata.insert("num_comments".to_string(), story.num_comments.to_string());
        metadata.insert("created_at".to_string(), story.created_at.to_string());

        Page { url: page_url, title: story.title, raw_html, source: SourceTag::Hackernews, metadata }
    }
}

#[async_trait]
impl Crawler for HackerNewsCrawler {
    fn source(&self) -> SourceTag {
        SourceTag::Hackernews
    }

    fn validate_config(&self, config: Value) -> Result<Value> {
        let mut cfg: HackerNewsConfig = serde_json::from_value(config)
            .map_err(|e| Error::new(ErrorKind::BadConfig, format!("hackernews config: {e}")))?;
        if !matches!(cfg.list_type.as_str(), "top" | "new" | "best") {
            return Err(Error::bad_config("hackernews list_type must be top, new, or best"));
        }
        cfg.max_pages = cfg.max_pages.clamp(1, MAX_PAGES_CEILING);
        Ok(serde_json::to_value(cfg).expect("serializable config"))
    }

    async fn crawl(&self, config: Value) -> Result<PageStream> {
        let cfg: HackerNewsConfig =
            serde_json::from_value(self.validate_config(config)?).expect("validated config round-trips");

        let stories = match &cfg.query {
            Some(q) => self.search_stories(q, cfg.max_pages).await?,
            None => self.list_stories(&cfg.list_type, cfg.max_pages).await?,
        };

        let (tx, stream) = page_channel();
        let client = self.client.clone();
        let crawler = HackerNewsCrawler { client };

        tokio::spawn(async move {
            for story in stories {
                let page = crawler.to_page(story).await;
                if tx.send(page).await.is_err() {
                    break;
                }
            }
        });

        Ok(stream)
    }
}

#[derive(Debug, Deserialize)]
struct AlgoliaResponse {
    hits: Vec<AlgoliaHit>,
}

#[derive(Debug, Deserialize)]
struct AlgoliaHit {
    #[serde(rename = "objectID")]
    object_id: String,
    title: Option<String>,
    url: Option<String>,
    points: Option<i64>,
    author: Option<String>,
    num_comments: Option<u64>,
    created_at_i: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Item {
    id: u64,
    title: Option<String>,
    url: Option<String>,
    score: Option<i64>,
    by: Option<String>,
    descendants: Option<u64>,
    time: Option<i64>,
}
