//! The incremental enrichment run: gates fetched articles through the
//! ledger, sends a bounded batch to the analysis collaborator, sanitizes
//! replies, and lands each attempt in the corpus and ledger as one unit.

use anyhow::{Context, Result};
use std::collections::HashSet;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::ledger::Ledger;
use crate::llm::Analyzer;
use crate::normalize::normalize;
use crate::prompt::enrichment_prompt;
use crate::sanitize::sanitize_response;
use crate::store::{merge_corpus, CorpusStore};
use crate::types::Article;
use crate::TARGET_LLM_REQUEST;

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub remaining: usize,
}

/// Runs one enrichment batch over freshly fetched articles.
///
/// Items already in the ledger are skipped; duplicates within the fetch
/// batch are filtered first, first occurrence winning. At most
/// `config.batch_size` items are attempted, sequentially, with
/// `config.call_delay` between analysis calls. Per item the corpus commit
/// lands before the ledger entry, so a crash between the two leaves the
/// identifier unmarked and the idempotent merge absorbs the redo on the
/// next run. Cancellation is honored between items only.
pub async fn run_enrichment<A: Analyzer>(
    fetched: Vec<Article>,
    ledger: &mut Ledger,
    corpus_store: &mut dyn CorpusStore,
    analyzer: &A,
    config: &PipelineConfig,
    cancel_rx: Option<&watch::Receiver<bool>>,
) -> Result<RunReport> {
    let mut seen_ids = HashSet::new();
    let unprocessed: Vec<Article> = fetched
        .into_iter()
        .filter(|article| seen_ids.insert(article.id.clone()))
        .filter(|article| !ledger.is_processed(&article.id))
        .collect();

    let eligible = unprocessed.len();
    let batch: Vec<Article> = unprocessed
        .into_iter()
        .take(config.batch_size)
        .collect();

    if batch.is_empty() {
        info!(target: TARGET_LLM_REQUEST, "No unprocessed articles, nothing to enrich");
        return Ok(RunReport::default());
    }

    info!(
        target: TARGET_LLM_REQUEST,
        "Enriching {} of {} unprocessed articles",
        batch.len(),
        eligible
    );

    let mut corpus = corpus_store.load().context("failed to load corpus")?;
    let mut report = RunReport::default();

    for (i, mut article) in batch.into_iter().enumerate() {
        if let Some(rx) = cancel_rx {
            if *rx.borrow() {
                info!(target: TARGET_LLM_REQUEST, "Cancellation requested, stopping between items");
                break;
            }
        }
        if i > 0 {
            sleep(config.call_delay).await;
        }

        let input = normalize(&article, config);
        let prompt = enrichment_prompt(
            &article.title,
            &article.source_label,
            input.source_type,
            &input.text,
            config,
        );
        debug!(
            target: TARGET_LLM_REQUEST,
            "Analyzing {} ({:?}, {} chars, truncated: {})",
            article.id,
            input.source_type,
            input.char_count,
            input.truncated
        );

        article.enrichment = match analyzer.analyze(&prompt).await {
            Some(raw) => sanitize_response(
                &raw,
                input.source_type,
                input.char_count,
                input.truncated,
                config,
            ),
            None => {
                warn!(target: TARGET_LLM_REQUEST, "No analysis reply for {}", article.id);
                None
            }
        };
        let succeeded = article.enrichment.is_some();

        // One logical unit per attempt: corpus first, ledger second.
        corpus = merge_corpus(corpus, std::slice::from_ref(&article));
        corpus_store
            .commit(&corpus)
            .context("failed to commit corpus")?;
        ledger.mark_processed(&article.id)?;

        report.attempted += 1;
        if succeeded {
            report.succeeded += 1;
            info!(target: TARGET_LLM_REQUEST, "Enriched {}: {}", article.id, article.title);
        } else {
            info!(target: TARGET_LLM_REQUEST, "Attempt failed for {}: {}", article.id, article.title);
        }
    }

    report.remaining = eligible - report.attempted;
    info!(
        target: TARGET_LLM_REQUEST,
        "Run complete: {} attempted, {} succeeded, {} remaining",
        report.attempted,
        report.succeeded,
        report.remaining
    );
    Ok(report)
}
