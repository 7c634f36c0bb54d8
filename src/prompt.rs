//! Builds the analysis request sent to the external model.

use crate::config::PipelineConfig;
use crate::types::SourceType;

/// Renders the enrichment prompt for one normalized article. Deterministic
/// for identical inputs; the normalized text is embedded verbatim.
pub fn enrichment_prompt(
    title: &str,
    source_label: &str,
    source_type: SourceType,
    text: &str,
    config: &PipelineConfig,
) -> String {
    format!(
        "Analyze the following technology article and produce structured metadata.

Title: {title}
Source: {source_label}
Provided as: {provenance}

{text}

Respond with a single JSON object containing exactly these four fields:

{{
  \"tags\": [\"...\"],
  \"summary\": \"...\",
  \"key_points\": [\"...\"],
  \"analysis\": [\"...\"]
}}

Requirements:
1. tags: pick 1 to 2 labels from this taxonomy: {taxonomy}.
2. summary: two to three sentences capturing the core of the article.
3. key_points: at most {max_key_points} short strings, one key takeaway each.
4. analysis: at most {max_analysis} short observations about significance or \
impact; when only a summary is provided, fewer or none is fine.

Do not tell me what you're doing, do not add prose outside the JSON object.",
        title = title,
        source_label = source_label,
        provenance = source_type.hint(),
        text = text,
        taxonomy = config.taxonomy.join(", "),
        max_key_points = config.max_key_points,
        max_analysis = config.max_analysis,
    )
}
