//! Core data types shared across the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Which category of feed text was fed into the analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Fulltext,
    Summary,
}

impl SourceType {
    /// Provenance hint embedded in the analysis request.
    pub fn hint(&self) -> &'static str {
        match self {
            SourceType::Fulltext => "full text",
            SourceType::Summary => "summary",
        }
    }
}

/// One feed entry. Immutable after fetch except for the `enrichment` slot,
/// which is only ever replaced by a new successful enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub link: String,
    pub source_label: String,
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    pub raw_body: String,
    pub raw_summary: String,
    pub is_fulltext_hint: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Enrichment>,
}

/// Validated output of the analysis step, attached to exactly one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub tags: Vec<String>,
    pub summary: String,
    pub key_points: Vec<String>,
    pub analysis: Vec<String>,
    pub source_type: SourceType,
    pub input_char_count: usize,
    pub truncated: bool,
}

/// Stable identifier for an article, derived from its canonical link.
/// Computed once at fetch time and never regenerated.
pub fn article_id(link: &str) -> String {
    let digest = Sha256::digest(link.trim().as_bytes());
    format!("{:x}", digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_id_is_stable() {
        let a = article_id("https://example.com/post/1");
        let b = article_id("https://example.com/post/1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_article_id_ignores_surrounding_whitespace() {
        assert_eq!(
            article_id(" https://example.com/post/1 "),
            article_id("https://example.com/post/1")
        );
    }

    #[test]
    fn test_article_id_differs_per_link() {
        assert_ne!(
            article_id("https://example.com/post/1"),
            article_id("https://example.com/post/2")
        );
    }

    #[test]
    fn test_source_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SourceType::Fulltext).unwrap(),
            "\"fulltext\""
        );
        assert_eq!(
            serde_json::to_string(&SourceType::Summary).unwrap(),
            "\"summary\""
        );
    }
}
