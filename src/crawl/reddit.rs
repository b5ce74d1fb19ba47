//! Reddit source: public `.json` endpoints for a subreddit listing or a
//! site-wide search, synthesizing page HTML from the post plus its top
//! comments (spec §4.11).

use std::collections::HashMap;
use std::fmt::Write as _;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::SourceTag;

use super::page::{Crawler, Page, PageStream};
use super::page_channel;

const MAX_PAGES_CEILING: u64 = 100;
const TOP_COMMENTS: usize = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct RedditConfig {
    #[serde(default)]
    pub subreddit: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default = "default_max_pages")]
    pub max_pages: u64,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_time_filter")]
    pub time_filter: String,
}

fn default_max_pages() -> u64 {
    10
}
fn default_sort() -> String {
    "hot".to_string()
}
fn default_time_filter() -> String {
    "all".to_string()
}

pub struct RedditCrawler {
    client: Client,
}

impl RedditCrawler {
    pub fn new(client: Client) -> Self {
        RedditCrawler { client }
    }

    fn listing_url(cfg: &RedditConfig) -> String {
        match (&cfg.subreddit, &cfg.query) {
            (Some(sub), _) => {
                format!("https://www.reddit.com/r/{sub}/{}.json?limit={}", cfg.sort, cfg.max_pages)
            }
            (None, Some(q)) => {
                format!(
                    "https://www.reddit.com/search.json?q={}&sort={}&t={}&limit={}",
                    urlencoding_lite(q),
                    cfg.sort,
                    cfg.time_filter,
                    cfg.max_pages
                )
            }
            (None, None) => unreachable!("validate_config enforces at least one of subreddit/query"),
        }
    }

    fn to_page(post: &RedditPost) -> Page {
        let mut html = format!("<h1>{}</h1><p>{}</p>", post.title, post.selftext);
        for comment in post.top_comments.iter().take(TOP_COMMENTS) {
            let _ = write!(html, "<div class=\"comment\">{comment}</div>");
        }

        let mut metadata = HashMap::new();
        metadata.insert("subreddit".to_string(), post.subreddit.clone());
        metadata.insert("author".to_string(), post.author.clone());
        metadata.insert("score".to_string(), post.score.to_string());
        metadata.insert("num_comments".to_string(), post.num_comments.to_string());
        metadata.insert("created_utc".to_string(), post.created_utc.to_string());

        Page {
            url: format!("https://www.reddit.com{}", post.permalink),
            title: post.title.clone(),
            raw_html: html,
            source: SourceTag::Reddit,
            metadata,
        }
    }

    async fn fetch_listing(&self, cfg: &RedditConfig) -> Result<Vec<RedditPost>> {
        let url = Self::listing_url(cfg);
        let listing: Listing = self.client.get(&url).send().await?.json().await?;

        let mut posts = Vec::new();
        for child in listing.data.children {
            let data = child.data;
            let top_comments = self.fetch_top_comments(&data.subreddit, &data.id).await.unwrap_or_default();
            posts.push(RedditPost {
                title: data.title,
                selftext: data.selftext,
                subreddit: data.subreddit,
                author: data.author,
                score: data.score,
                num_comments: data.num_comments,
                created_utc: data.created_utc,
                permalink: data.permalink,
                top_comments,
            });
        }
        Ok(posts)
    }

    async fn fetch_top_comments(&self, subreddit: &str, post_id: &str) -> Result<Vec<String>> {
        let url = format!("https://www.reddit.com/r/{subreddit}/comments/{post_id}.json?limit={TOP_COMMENTS}");
        let resp: Vec<CommentsListing> = self.client.get(&url).send().await?.json().await?;
        let comments = resp
            .into_iter()
            .nth(1)
            .map(|listing| {
                listing
                    .data
                    .children
                    .into_iter()
                    .filter_map(|c| c.data.body)
                    .take(TOP_COMMENTS)
                    .collect()
            })
            .unwrap_or_default();
        Ok(comments)
    }
}

struct RedditPost {
    title: String,
    selftext: String,
    subreddit: String,
    author: String,
    score: i64,
    num_comments: u64,
    created_utc: f64,
    permalink: String,
    top_comments: Vec<String>,
}

fn urlencoding_lite(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_string() } else { format!("%{:02X}", c as u32) })
        .collect()
}

#[async_trait]
impl Crawler for RedditCrawler {
    fn source(&self) -> SourceTag {
        SourceTag::Reddit
    }

    fn validate_config(&self, config: Value) -> Result<Value> {
        let mut cfg: RedditConfig = serde_json::from_value(config)
            .map_err(|e| Error::new(ErrorKind::BadConfig, format!("reddit config: {e}")))?;
        if cfg.subreddit.is_none() && cfg.query.is_none() {
            return Err(Error::bad_config("reddit config requires subreddit or query"));
        }
        cfg.max_pages = cfg.max_pages.clamp(1, MAX_PAGES_CEILING);
        Ok(serde_json::to_value(cfg).expect("serializable config"))
    }

    async fn crawl(&self, config: Value) -> Result<PageStream> {
        let cfg: RedditConfig =
            serde_json::from_value(self.validate_config(config)?).expect("validated config round-trips");

        let posts = self.fetch_listing(&cfg).await?;
        let (tx, stream) = page_channel();

        tokio::spawn(async move {
            for post in posts {
                let page = RedditCrawler::to_page(&post);
                if tx.send(page).await.is_err() {
                    break;
                }
            }
        });

        Ok(stream)
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: PostData,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    title: String,
    #[serde(default)]
    selftext: String,
    subreddit: String,
    author: String,
    score: i64,
    num_comments: u64,
    created_utc: f64,
    permalink: String,
}

#[derive(Debug, Deserialize)]
struct CommentsListing {
    data: CommentsData,
}

#[derive(Debug, Deserialize)]
struct CommentsData {
    children: Vec<CommentChild>,
}

#[derive(Debug, Deserialize)]
struct CommentChild {
    data: CommentData,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    #[serde(default)]
    body: Option<String>,
}
