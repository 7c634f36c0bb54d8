//! Content normalization: turns raw feed HTML into plain analysis text and
//! classifies it as full text or summary.

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::PipelineConfig;
use crate::types::{Article, SourceType};

lazy_static! {
    static ref SCRIPT_STYLE: Regex =
        Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").unwrap();
    // Block-level boundaries survive as line breaks so structure is kept.
    static ref BLOCK_TAG: Regex = Regex::new(
        r"(?i)<(?:br\s*/?|/?p\b[^>]*|/?li\b[^>]*|/?h[1-6]\b[^>]*|/?div\b[^>]*|/?tr\b[^>]*|/?blockquote\b[^>]*)>"
    )
    .unwrap();
    static ref ANY_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref ENTITY: Regex = Regex::new(r"&(#x?[0-9a-fA-F]+|[a-zA-Z]+[0-9]*);").unwrap();
    static ref HORIZONTAL_WS: Regex = Regex::new(r"[ \t\r\u{a0}]+").unwrap();
    static ref NEWLINE_PADDING: Regex = Regex::new(r" ?\n ?").unwrap();
    static ref NEWLINE_RUNS: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Normalized analysis input for one article.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedInput {
    pub text: String,
    pub source_type: SourceType,
    pub truncated: bool,
    /// Characters actually sent to the analysis collaborator.
    pub char_count: usize,
}

/// Strips markup from raw feed HTML, leaving whitespace-collapsed plain text.
pub fn clean_html(raw: &str) -> String {
    let text = SCRIPT_STYLE.replace_all(raw, "");
    let text = BLOCK_TAG.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    let text = decode_entities(&text);
    let text = HORIZONTAL_WS.replace_all(&text, " ");
    let text = NEWLINE_PADDING.replace_all(&text, "\n");
    let text = NEWLINE_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Decodes numeric (`&#NNN;` / `&#xHH;`) and common named HTML entities in a
/// single pass. Unrecognized entities are left untouched.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let body = &caps[1];
            if let Some(numeric) = body.strip_prefix('#') {
                let parsed = if let Some(hex) = numeric
                    .strip_prefix('x')
                    .or_else(|| numeric.strip_prefix('X'))
                {
                    u32::from_str_radix(hex, 16).ok()
                } else {
                    numeric.parse::<u32>().ok()
                };
                return match parsed.and_then(char::from_u32) {
                    Some(c) => c.to_string(),
                    None => caps[0].to_string(),
                };
            }
            match body {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                "nbsp" => " ".to_string(),
                "ndash" => "\u{2013}".to_string(),
                "mdash" => "\u{2014}".to_string(),
                "lsquo" => "\u{2018}".to_string(),
                "rsquo" => "\u{2019}".to_string(),
                "ldquo" => "\u{201c}".to_string(),
                "rdquo" => "\u{201d}".to_string(),
                "hellip" => "\u{2026}".to_string(),
                "middot" => "\u{b7}".to_string(),
                _ => caps[0].to_string(),
            }
        })
        .to_string()
}

/// Cuts `text` at `budget` characters, never splitting a multi-byte character.
/// Returns the (possibly shortened) text and whether anything was cut.
pub fn truncate_chars(text: &str, budget: usize) -> (String, bool) {
    match text.char_indices().nth(budget) {
        Some((byte_idx, _)) => (text[..byte_idx].to_string(), true),
        None => (text.to_string(), false),
    }
}

/// Picks the analysis text for an article and classifies its provenance.
///
/// The cleaned body wins when it is at least `min_body_chars` long, otherwise
/// the cleaned summary is used. If the selection comes up empty the normalized
/// title stands in, classified as a summary. Pure function of its inputs.
pub fn normalize(article: &Article, config: &PipelineConfig) -> NormalizedInput {
    let body = clean_html(&article.raw_body);
    let summary = clean_html(&article.raw_summary);
    let body_chars = body.chars().count();

    let (selected, body_selected) = if body_chars >= config.min_body_chars {
        (body.clone(), true)
    } else if !summary.is_empty() {
        (summary, false)
    } else if !body.is_empty() {
        (body.clone(), true)
    } else {
        (clean_html(&article.title), false)
    };

    let source_type = if body_selected
        && (article.is_fulltext_hint || body_chars >= config.fulltext_threshold)
    {
        SourceType::Fulltext
    } else {
        SourceType::Summary
    };

    let (text, truncated) = truncate_chars(&selected, config.input_char_budget);
    let char_count = text.chars().count();

    NormalizedInput {
        text,
        source_type,
        truncated,
        char_count,
    }
}
