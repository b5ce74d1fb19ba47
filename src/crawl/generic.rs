//! Generic BFS source: same-domain breadth-first crawl from seed URLs,
//! gated by robots.txt and rate-limited between fetches (spec §4.11).

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::SourceTag;

use super::page::{Crawler, Page, PageStream};
use super::page_channel;
use super::robots::RobotsCache;

const MAX_PAGES_CEILING: u64 = 500;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustomConfig {
    pub urls: Vec<String>,
    #[serde(default = "default_max_pages")]
    pub max_pages: u64,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

fn default_max_pages() -> u64 {
    50
}
fn default_max_depth() -> u32 {
    2
}

pub struct GenericCrawler {
    client: Client,
    robots: Arc<RobotsCache>,
    user_agent: String,
    configured_max_depth: u32,
    crawl_delay: Duration,
}

impl GenericCrawler {
    pub fn new(
        client: Client,
        robots: Arc<RobotsCache>,
        user_agent: impl Into<String>,
        configured_max_depth: u32,
        crawl_delay: Duration,
    ) -> Self {
        GenericCrawler { client, robots, user_agent: user_agent.into(), configured_max_depth, crawl_delay }
    }
}

fn normalize(url: &Url) -> Url {
    let mut u = url.clone();
    u.set_fragment(None);
    u.set_query(None);
    u
}

fn same_domain(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str()
}

fn extract_links(base: &Url, html: &str) -> Vec<Url> {
    let selector = Selector::parse("a[href]").expect("static selector");
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .filter(|u| u.scheme() == "http" || u.scheme() == "https")
        .collect()
}

#[async_trait]
impl Crawler for GenericCrawler {
    fn source(&self) -> SourceTag {
        SourceTag::Custom
    }

    fn validate_config(&self, config: Value) -> Result<Value> {
        let mut cfg: CustomConfig = serde_json::from_value(config)
            .map_err(|e| Error::new(ErrorKind::BadConfig, format!("custom config: {e}")))?;
        if cfg.urls.is_empty() {
            return Err(Error::bad_config("custom config requires at least one seed url"));
        }
        for raw in &cfg.urls {
            Url::parse(raw).map_err(|e| Error::new(ErrorKind::BadConfig, format!("invalid seed url {raw}: {e}")))?;
        }
        cfg.max_pages = cfg.max_pages.clamp(1, MAX_PAGES_CEILING);
        cfg.max_depth = cfg.max_depth.clamp(1, self.configured_max_depth);
        Ok(serde_json::to_value(cfg).expect("serializable config"))
    }

    async fn crawl(&self, config: Value) -> Result<PageStream> {
        let cfg: CustomConfig =
            serde_json::from_value(self.validate_config(config)?).expect("validated config round-trips");

        let (tx, stream) = page_channel();
        let client = self.client.clone();
        let robots = self.robots.clone();
        let user_agent = self.user_agent.clone();
        let crawl_delay = self.crawl_delay;

        tokio::spawn(async move {
            let mut visited: HashSet<String> = HashSet::new();
            let mut queue: VecDeque<(Url, u32)> = VecDeque::new();

            for raw in &cfg.urls {
                if let Ok(url) = Url::parse(raw) {
                    let normalized = normalize(&url);
                    if visited.insert(normalized.to_string()) {
                        queue.push_back((normalized, 1));
                    }
                }
            }

            let mut fetched = 0u64;
            while let Some((url, depth)) = queue.pop_front() {
                if fetched >= cfg.max_pages {
                    break;
                }

                let allowed = robots.is_allowed(url.as_str(), url.path(), &user_agent).await;
                if !allowed {
                    continue;
                }

                tokio::time::sleep(crawl_delay).await;

                let resp = match client.get(url.clone()).send().await {
                    Ok(resp) => resp,
                    Err(err) => {
                        warn!(%url, %err, "generic crawl: fetch failed");
                        continue;
                    }
                };

                if !resp.status().is_success() {
                    warn!(%url, status = %resp.status(), "generic crawl: non-2xx response, skipping");
                    continue;
                }

                let is_html = resp
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|ct| ct.contains("text/html"));
                if !is_html {
                    continue;
                }

                let html = match resp.text().await {
                    Ok(body) => body,
                    Err(err) => {
                        warn!(%url, %err, "generic crawl: body read failed");
                        continue;
                    }
                };

                fetched += 1;
                let title = Html::parse_document(&html)
                    .select(&Selector::parse("title").expect("static selector"))
                    .next()
                    .map(|t| t.text().collect::<String>())
                    .unwrap_or_else(|| url.to_string());

                let page = Page {
                    url: url.to_string(),
                    title,
                    raw_html: html.clone(),
                    source: SourceTag::Custom,
                    metadata: Default::default(),
                };

                if tx.send(page).await.is_err() {
                    break;
                }

                if depth < cfg.max_depth {
                    for link in extract_links(&url, &html) {
                        let normalized = normalize(&link);
                        if same_domain(&url, &normalized) && visited.insert(normalized.to_string()) {
                            queue.push_back((normalized, depth + 1));
                        }
                    }
                }
            }
        });

        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crawler() -> GenericCrawler {
        GenericCrawler::new(
            Client::new(),
            Arc::new(RobotsCache::new(Duration::from_secs(5))),
            "test-agent",
            3,
            Duration::from_millis(0),
        )
    }

    #[test]
    fn rejects_empty_seed_list() {
        let err = crawler().validate_config(serde_json::json!({"urls": []})).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadConfig);
    }

    #[test]
    fn clamps_max_depth_to_configured_ceiling() {
        let normalized =
            crawler().validate_config(serde_json::json!({"urls": ["https://example.com"], "max_depth": 10})).unwrap();
        assert_eq!(normalized["max_depth"], 3);
    }

    #[test]
    fn normalize_strips_fragment_and_query() {
        let url = Url::parse("https://example.com/a?x=1#frag").unwrap();
        assert_eq!(normalize(&url).as_str(), "https://example.com/a");
    }
}
