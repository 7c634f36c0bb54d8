//! Validation and cleanup of untrusted model output.
//!
//! The model may wrap its JSON in a fenced block or surround it with prose;
//! extraction scans for the first line holding an opening brace and the last
//! line holding a closing brace and parses only that span. Anything that
//! fails to parse or validates empty is rejected as a failed attempt, never
//! bubbled up as an error.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::normalize::truncate_chars;
use crate::types::{Enrichment, SourceType};
use crate::TARGET_LLM_REQUEST;

lazy_static! {
    static ref WHITESPACE_RUNS: Regex = Regex::new(r"\s+").unwrap();
    // Leading bullet or numbering markers the model sometimes prepends.
    static ref LIST_MARKER: Regex = Regex::new(r"^(?:[-*•]+|\d+[.)])\s*").unwrap();
}

/// Locates the candidate JSON span inside a raw model reply, discarding
/// fences and any prose outside the braces.
pub fn extract_json_span(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw.lines().collect();
    let start = lines.iter().position(|line| line.contains('{'))?;
    let end = lines.iter().rposition(|line| line.contains('}'))?;
    if end < start {
        return None;
    }
    Some(lines[start..=end].join("\n"))
}

fn normalize_ws(text: &str) -> String {
    WHITESPACE_RUNS.replace_all(text, " ").trim().to_string()
}

/// Coerces a JSON field into a list of strings: arrays keep their string
/// elements, a bare string becomes a one-element list, anything else is
/// an empty list.
fn coerce_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Cleans one list field: whitespace normalization, marker stripping,
/// case-insensitive dedup (first occurrence wins), then per-item and
/// per-list caps.
fn clean_items(items: Vec<String>, item_max_chars: usize, max_items: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let cleaned = normalize_ws(&LIST_MARKER.replace(item.trim(), ""));
        if cleaned.is_empty() {
            continue;
        }
        if !seen.insert(cleaned.to_lowercase()) {
            continue;
        }
        let (capped, _) = truncate_chars(&cleaned, item_max_chars);
        out.push(capped);
        if out.len() == max_items {
            break;
        }
    }
    out
}

/// Parses and validates a raw model reply. Returns `None` for anything
/// malformed or for a reply whose summary normalizes to empty; the caller
/// treats that as "no enrichment this attempt".
pub fn sanitize_response(
    raw: &str,
    source_type: SourceType,
    input_char_count: usize,
    truncated: bool,
    config: &PipelineConfig,
) -> Option<Enrichment> {
    let span = match extract_json_span(raw) {
        Some(span) => span,
        None => {
            warn!(target: TARGET_LLM_REQUEST, "No JSON object found in analysis reply");
            return None;
        }
    };

    let parsed: Value = match serde_json::from_str(&span) {
        Ok(value) => value,
        Err(err) => {
            let preview: String = span.chars().take(200).collect();
            warn!(
                target: TARGET_LLM_REQUEST,
                "Failed to parse analysis reply: {}. Candidate span: {}",
                err,
                preview
            );
            return None;
        }
    };

    let object = parsed.as_object()?;

    let summary_raw = object.get("summary").and_then(Value::as_str).unwrap_or("");
    let (summary, _) = truncate_chars(&normalize_ws(summary_raw), config.summary_max_chars);
    if summary.is_empty() {
        warn!(target: TARGET_LLM_REQUEST, "Analysis reply rejected: empty summary");
        return None;
    }

    let tags = clean_items(
        coerce_list(object.get("tags")),
        config.list_item_max_chars,
        config.max_tags,
    );
    let key_points = clean_items(
        coerce_list(object.get("key_points")),
        config.list_item_max_chars,
        config.max_key_points,
    );
    let analysis = clean_items(
        coerce_list(object.get("analysis")),
        config.list_item_max_chars,
        config.max_analysis,
    );

    debug!(
        target: TARGET_LLM_REQUEST,
        "Sanitized analysis reply: {} tags, {} key points, {} analysis items",
        tags.len(),
        key_points.len(),
        analysis.len()
    );

    Some(Enrichment {
        tags,
        summary,
        key_points,
        analysis,
        source_type,
        input_char_count,
        truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize(raw: &str) -> Option<Enrichment> {
        sanitize_response(raw, SourceType::Summary, 100, false, &PipelineConfig::default())
    }

    #[test]
    fn test_extracts_json_from_fenced_block() {
        let raw = "Here is the result:\n```json\n{\n  \"summary\": \"X\"\n}\n```\nDone.";
        let result = sanitize(raw).unwrap();
        assert_eq!(result.summary, "X");
    }

    #[test]
    fn test_plain_json_accepted() {
        let result = sanitize("{\"summary\": \"fine\", \"tags\": [\"安全\"]}").unwrap();
        assert_eq!(result.summary, "fine");
        assert_eq!(result.tags, vec!["安全"]);
    }

    #[test]
    fn test_unparsable_reply_is_invalid() {
        assert!(sanitize("{not json at all").is_none());
        assert!(sanitize("no braces here").is_none());
        assert!(sanitize("}{").is_none());
    }

    #[test]
    fn test_non_object_json_is_invalid() {
        assert!(sanitize("[{\"summary\": \"x\"}]").is_none());
        assert!(sanitize("[1, 2]").is_none());
    }

    #[test]
    fn test_missing_or_empty_summary_rejected() {
        assert!(sanitize("{\"tags\": [\"AI/机器学习\"]}").is_none());
        assert!(sanitize("{\"summary\": \"\"}").is_none());
        assert!(sanitize("{\"summary\": \"   \"}").is_none());
    }

    #[test]
    fn test_empty_lists_still_valid_with_summary() {
        let result = sanitize("{\"summary\": \"X\"}").unwrap();
        assert!(result.tags.is_empty());
        assert!(result.key_points.is_empty());
        assert!(result.analysis.is_empty());
    }

    #[test]
    fn test_bare_string_becomes_one_element_list() {
        let result = sanitize("{\"summary\": \"X\", \"tags\": \"DevOps\"}").unwrap();
        assert_eq!(result.tags, vec!["DevOps"]);
    }

    #[test]
    fn test_non_list_non_string_field_is_empty() {
        let result = sanitize("{\"summary\": \"X\", \"tags\": 42}").unwrap();
        assert!(result.tags.is_empty());
    }

    #[test]
    fn test_case_insensitive_dedup_first_occurrence_wins() {
        let result =
            sanitize("{\"summary\": \"X\", \"key_points\": [\"AI\", \"ai\", \" AI \"]}").unwrap();
        assert_eq!(result.key_points, vec!["AI"]);
    }

    #[test]
    fn test_duplicate_cjk_tags_collapse() {
        let result =
            sanitize("{\"summary\": \"X\", \"tags\": [\"AI/机器学习\", \"AI/机器学习\"]}").unwrap();
        assert_eq!(result.tags, vec!["AI/机器学习"]);
        assert_eq!(result.summary, "X");
    }

    #[test]
    fn test_bullet_markers_stripped() {
        let raw = "{\"summary\": \"X\", \"key_points\": [\"- first\", \"* second\", \"3. third\"]}";
        let result = sanitize(raw).unwrap();
        assert_eq!(result.key_points, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_list_caps_applied() {
        let raw = "{\"summary\": \"X\", \"tags\": [\"a\", \"b\", \"c\"], \
                   \"key_points\": [\"1a\", \"2b\", \"3c\", \"4d\"]}";
        let result = sanitize(raw).unwrap();
        assert_eq!(result.tags.len(), 2);
        assert_eq!(result.key_points.len(), 3);
    }

    #[test]
    fn test_summary_capped_at_limit() {
        let long = "s".repeat(500);
        let raw = format!("{{\"summary\": \"{}\"}}", long);
        let result = sanitize(&raw).unwrap();
        assert_eq!(result.summary.chars().count(), 220);
    }

    #[test]
    fn test_long_list_items_capped() {
        let long = "k".repeat(300);
        let raw = format!("{{\"summary\": \"X\", \"key_points\": [\"{}\"]}}", long);
        let result = sanitize(&raw).unwrap();
        assert_eq!(result.key_points[0].chars().count(), 120);
    }

    #[test]
    fn test_provenance_carried_through() {
        let config = PipelineConfig::default();
        let result =
            sanitize_response("{\"summary\": \"X\"}", SourceType::Fulltext, 1500, true, &config)
                .unwrap();
        assert_eq!(result.source_type, SourceType::Fulltext);
        assert_eq!(result.input_char_count, 1500);
        assert!(result.truncated);
    }
}
