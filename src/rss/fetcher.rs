//! Feed fetching: HTTP transport with timeout and a polite delay between
//! feeds. Per-feed failures are logged and skipped, never fatal.

use anyhow::{bail, Result};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use super::parser::parse_feed;
use super::util::is_valid_url;
use crate::types::Article;
use crate::TARGET_WEB_REQUEST;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const FETCH_DELAY: Duration = Duration::from_millis(300);
const USER_AGENT: &str = "Mozilla/5.0 SignalFeed/1.0";

/// Fetches and parses every configured feed, concatenating the articles.
pub async fn fetch_articles(feed_urls: &[String]) -> Result<Vec<Article>> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()?;

    let mut articles = Vec::new();
    for (i, feed_url) in feed_urls.iter().enumerate() {
        if feed_url.trim().is_empty() {
            continue;
        }
        if !is_valid_url(feed_url) {
            debug!(target: TARGET_WEB_REQUEST, "Skipping invalid feed URL: {}", feed_url);
            continue;
        }
        if i > 0 {
            sleep(FETCH_DELAY).await;
        }

        match fetch_feed(&client, feed_url).await {
            Ok(mut batch) => {
                info!(
                    target: TARGET_WEB_REQUEST,
                    "Fetched {} entries from {}",
                    batch.len(),
                    feed_url
                );
                articles.append(&mut batch);
            }
            Err(err) => {
                warn!(target: TARGET_WEB_REQUEST, "Failed to fetch {}: {}", feed_url, err);
            }
        }
    }

    info!(target: TARGET_WEB_REQUEST, "Fetched {} articles from {} feeds", articles.len(), feed_urls.len());
    Ok(articles)
}

async fn fetch_feed(client: &reqwest::Client, feed_url: &str) -> Result<Vec<Article>> {
    let response = client.get(feed_url).send().await?;
    if !response.status().is_success() {
        bail!("non-success status {}", response.status());
    }
    let bytes = response.bytes().await?;
    parse_feed(&bytes, feed_url)
}
