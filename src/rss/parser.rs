//! Maps parsed feed entries onto `Article` records.

use anyhow::{Context, Result};
use chrono::Utc;
use feed_rs::parser;
use tracing::debug;

use crate::types::{article_id, Article};
use crate::TARGET_WEB_REQUEST;

/// Summary length beyond which a feed without full content is still treated
/// as effectively full text.
const FULLTEXT_SUMMARY_CHARS: usize = 1000;

/// Parses RSS/Atom bytes into articles. Entries without a link are skipped;
/// identifiers are computed from the canonical link here, once, and never
/// regenerated downstream.
pub fn parse_feed(bytes: &[u8], feed_url: &str) -> Result<Vec<Article>> {
    let feed = parser::parse(bytes)
        .with_context(|| format!("failed to parse feed from {}", feed_url))?;

    let source_label = feed
        .title
        .map(|t| t.content)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    let mut articles = Vec::new();
    for entry in feed.entries {
        let link = match entry.links.first() {
            Some(link) if !link.href.trim().is_empty() => link.href.clone(),
            _ => {
                debug!(target: TARGET_WEB_REQUEST, "Skipping entry without link from {}", feed_url);
                continue;
            }
        };

        let title = entry
            .title
            .map(|t| t.content)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "No Title".to_string());

        let summary = entry.summary.map(|t| t.content).unwrap_or_default();

        // Feeds carrying a content body are full text by definition; a
        // summary-only feed gets the hint when its summary is long enough.
        let content_body = entry
            .content
            .and_then(|c| c.body)
            .filter(|body| !body.trim().is_empty());
        let (raw_body, is_fulltext_hint) = match content_body {
            Some(body) => (body, true),
            None => {
                let hint = summary.chars().count() > FULLTEXT_SUMMARY_CHARS;
                (summary.clone(), hint)
            }
        };

        articles.push(Article {
            id: article_id(&link),
            title,
            link,
            source_label: source_label.clone(),
            published_at: entry.published.or(entry.updated),
            fetched_at: Utc::now(),
            raw_body,
            raw_summary: summary,
            is_fulltext_hint,
            enrichment: None,
        });
    }

    Ok(articles)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_WITH_CONTENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Example Blog</title>
    <item>
      <title>Post One</title>
      <link>https://example.com/one</link>
      <description>short abstract</description>
      <content:encoded><![CDATA[<p>The full article body.</p>]]></content:encoded>
      <pubDate>Mon, 05 May 2025 10:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

    const RSS_SUMMARY_ONLY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Summary Feed</title>
    <item>
      <title>Post Two</title>
      <link>https://example.com/two</link>
      <description>only a short abstract here</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_content_encoded_marks_fulltext() {
        let articles = parse_feed(RSS_WITH_CONTENT.as_bytes(), "https://example.com/feed").unwrap();
        assert_eq!(articles.len(), 1);
        let article = &articles[0];
        assert_eq!(article.title, "Post One");
        assert_eq!(article.source_label, "Example Blog");
        assert!(article.is_fulltext_hint);
        assert!(article.raw_body.contains("full article body"));
        assert_eq!(article.raw_summary, "short abstract");
        assert!(article.published_at.is_some());
    }

    #[test]
    fn test_short_summary_feed_is_not_fulltext() {
        let articles = parse_feed(RSS_SUMMARY_ONLY.as_bytes(), "https://example.com/feed").unwrap();
        assert_eq!(articles.len(), 1);
        let article = &articles[0];
        assert!(!article.is_fulltext_hint);
        assert_eq!(article.raw_body, article.raw_summary);
    }

    #[test]
    fn test_identifier_derived_from_link() {
        let articles = parse_feed(RSS_WITH_CONTENT.as_bytes(), "https://example.com/feed").unwrap();
        assert_eq!(articles[0].id, article_id("https://example.com/one"));
    }

    #[test]
    fn test_garbage_input_is_an_error() {
        assert!(parse_feed(b"not xml at all", "https://example.com/feed").is_err());
    }
}
