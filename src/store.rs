//! The persisted corpus: every article seen across runs, keyed by
//! identifier, with enrichment attached where an attempt succeeded.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::types::Article;
use crate::TARGET_STORE;

/// Backing storage for the corpus. Injected so tests can run in memory.
pub trait CorpusStore: Send {
    fn load(&mut self) -> Result<Vec<Article>>;
    fn commit(&mut self, articles: &[Article]) -> Result<()>;
}

/// JSON file store. Commits write a temp file and rename over the target so
/// a crash mid-write never leaves a torn corpus.
pub struct JsonCorpusStore {
    path: PathBuf,
}

impl JsonCorpusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CorpusStore for JsonCorpusStore {
    fn load(&mut self) -> Result<Vec<Article>> {
        if !self.path.exists() {
            debug!(target: TARGET_STORE, "No corpus at {}, starting empty", self.path.display());
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read corpus {}", self.path.display()))?;
        let articles: Vec<Article> = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse corpus {}", self.path.display()))?;
        info!(target: TARGET_STORE, "Loaded corpus with {} articles", articles.len());
        Ok(articles)
    }

    fn commit(&mut self, articles: &[Article]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(articles).context("failed to encode corpus")?;
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp)
                .with_context(|| format!("failed to create {}", tmp.display()))?;
            file.write_all(json.as_bytes())
                .with_context(|| format!("failed to write {}", tmp.display()))?;
            file.sync_all()
                .with_context(|| format!("failed to flush {}", tmp.display()))?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace corpus {}", self.path.display()))?;
        debug!(target: TARGET_STORE, "Committed corpus with {} articles", articles.len());
        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryCorpusStore {
    articles: Vec<Article>,
}

impl MemoryCorpusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &[Article] {
        &self.articles
    }
}

impl CorpusStore for MemoryCorpusStore {
    fn load(&mut self) -> Result<Vec<Article>> {
        Ok(self.articles.clone())
    }

    fn commit(&mut self, articles: &[Article]) -> Result<()> {
        self.articles = articles.to_vec();
        Ok(())
    }
}

/// Merges a batch of attempted articles into the existing corpus.
///
/// Union semantics, last write wins per identifier. Existing entries keep
/// their relative order; new identifiers append in batch order. A batch entry
/// without enrichment refreshes the base article but carries forward any
/// enrichment a prior run attached, so a failed attempt never erases one.
pub fn merge_corpus(existing: Vec<Article>, batch: &[Article]) -> Vec<Article> {
    let mut merged = existing;
    let mut index: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, article)| (article.id.clone(), i))
        .collect();

    for article in batch {
        match index.get(&article.id) {
            Some(&i) => {
                let mut updated = article.clone();
                if updated.enrichment.is_none() {
                    updated.enrichment = merged[i].enrichment.take();
                }
                merged[i] = updated;
            }
            None => {
                index.insert(article.id.clone(), merged.len());
                merged.push(article.clone());
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Enrichment, SourceType};
    use chrono::Utc;

    fn article(id: &str, enriched: bool) -> Article {
        Article {
            id: id.to_string(),
            title: format!("title {}", id),
            link: format!("https://example.com/{}", id),
            source_label: "Example".to_string(),
            published_at: None,
            fetched_at: Utc::now(),
            raw_body: "body".to_string(),
            raw_summary: "summary".to_string(),
            is_fulltext_hint: false,
            enrichment: enriched.then(|| Enrichment {
                tags: vec!["AI/机器学习".to_string()],
                summary: "s".to_string(),
                key_points: vec![],
                analysis: vec![],
                source_type: SourceType::Summary,
                input_char_count: 4,
                truncated: false,
            }),
        }
    }

    fn ids(corpus: &[Article]) -> Vec<&str> {
        corpus.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_merge_unions_and_appends_in_order() {
        let existing = vec![article("a", true), article("b", false)];
        let batch = vec![article("c", true), article("d", false)];
        let merged = merge_corpus(existing, &batch);
        assert_eq!(ids(&merged), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_merge_overwrites_per_identifier() {
        let existing = vec![article("a", false)];
        let mut update = article("a", true);
        update.title = "updated".to_string();
        let merged = merge_corpus(existing, &[update]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "updated");
        assert!(merged[0].enrichment.is_some());
    }

    #[test]
    fn test_failed_attempt_keeps_prior_enrichment() {
        let existing = vec![article("a", true)];
        let mut refetched = article("a", false);
        refetched.title = "refetched".to_string();
        let merged = merge_corpus(existing, &[refetched]);
        assert_eq!(merged[0].title, "refetched");
        assert!(merged[0].enrichment.is_some());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = vec![article("a", true), article("b", false)];
        let batch = vec![article("b", true), article("c", false)];

        let once = merge_corpus(existing.clone(), &batch);
        let twice = merge_corpus(once.clone(), &batch);

        assert_eq!(ids(&once), ids(&twice));
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.title, b.title);
            assert_eq!(a.enrichment, b.enrichment);
        }
    }

    #[test]
    fn test_json_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");

        let mut store = JsonCorpusStore::new(&path);
        assert!(store.load().unwrap().is_empty());

        let corpus = vec![article("a", true), article("b", false)];
        store.commit(&corpus).unwrap();

        let mut reopened = JsonCorpusStore::new(&path);
        let loaded = reopened.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "a");
        assert!(loaded[0].enrichment.is_some());
        assert!(loaded[1].enrichment.is_none());
    }
}
