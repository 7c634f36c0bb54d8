//! Static browsing page: a pure function from the persisted corpus to HTML.
//! Every interpolated string is escaped; enrichment fields arrive already
//! sanitized but are escaped again on the way out.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::normalize::{clean_html, truncate_chars};
use crate::types::Article;

const DESCRIPTION_PREVIEW_CHARS: usize = 200;

pub fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Renders the corpus as a single browsing page, newest first.
pub fn render_site(articles: &[Article]) -> String {
    let mut sorted: Vec<&Article> = articles.iter().collect();
    sorted.sort_by_key(|article| {
        std::cmp::Reverse(article.published_at.unwrap_or(DateTime::<Utc>::MIN_UTC))
    });

    let mut source_counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut tag_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for article in &sorted {
        *source_counts.entry(article.source_label.as_str()).or_insert(0) += 1;
        if let Some(enrichment) = &article.enrichment {
            for tag in &enrichment.tags {
                *tag_counts.entry(tag.as_str()).or_insert(0) += 1;
            }
        }
    }

    // Most frequent first, label as tie-breaker.
    let mut sources: Vec<(&str, usize)> = source_counts.into_iter().collect();
    sources.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    let mut tags: Vec<(&str, usize)> = tag_counts.into_iter().collect();
    tags.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    let generated_at = Utc::now().format("%Y-%m-%d %H:%M");
    let mut page = String::new();

    page.push_str("<!DOCTYPE html>\n<html lang=\"zh-CN\">\n<head>\n");
    page.push_str("    <meta charset=\"UTF-8\">\n");
    page.push_str("    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    page.push_str("    <title>SignalFeed</title>\n");
    page.push_str("    <link rel=\"stylesheet\" href=\"css/style.css\">\n");
    page.push_str("</head>\n<body>\n");
    page.push_str("    <header><div class=\"container\"><h1>SignalFeed</h1></div></header>\n");
    page.push_str("    <main class=\"container\">\n");
    page.push_str(&format!(
        "        <div class=\"stats\"><span>{} articles</span><span>updated {} UTC</span></div>\n",
        sorted.len(),
        generated_at
    ));

    page.push_str("        <section class=\"filters\">\n");
    page.push_str("            <select id=\"source-filter\">\n");
    page.push_str(&format!(
        "                <option value=\"all\">All sources ({})</option>\n",
        sorted.len()
    ));
    for (label, count) in &sources {
        page.push_str(&format!(
            "                <option value=\"{}\">{} ({})</option>\n",
            html_escape(label),
            html_escape(label),
            count
        ));
    }
    page.push_str("            </select>\n");
    page.push_str("            <div class=\"tag-chips\">\n");
    for (label, count) in &tags {
        page.push_str(&format!(
            "                <button class=\"tag-chip\" data-tag=\"{}\">{} ({})</button>\n",
            html_escape(label),
            html_escape(label),
            count
        ));
    }
    page.push_str("            </div>\n");
    page.push_str("        </section>\n");

    page.push_str("        <div class=\"articles\">\n");
    for article in &sorted {
        page.push_str(&render_card(article));
    }
    page.push_str("        </div>\n");
    page.push_str("    </main>\n");
    page.push_str("    <footer><div class=\"container\"><p>SignalFeed - Powered by RSS &amp; AI</p></div></footer>\n");
    page.push_str("    <script src=\"js/app.js\"></script>\n");
    page.push_str("</body>\n</html>\n");
    page
}

fn render_card(article: &Article) -> String {
    let mut card = String::new();
    card.push_str(&format!(
        "            <article class=\"article-card\" data-source=\"{}\">\n",
        html_escape(&article.source_label)
    ));
    card.push_str(&format!(
        "                <h2><a href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a></h2>\n",
        html_escape(&article.link),
        html_escape(&article.title)
    ));
    card.push_str(&format!(
        "                <div class=\"article-meta\"><span class=\"source\">{}</span>",
        html_escape(&article.source_label)
    ));
    if let Some(enrichment) = &article.enrichment {
        for tag in &enrichment.tags {
            card.push_str(&format!("<span class=\"tag\">{}</span>", html_escape(tag)));
        }
    }
    card.push_str("</div>\n");

    match &article.enrichment {
        Some(enrichment) => {
            card.push_str(&format!(
                "                <div class=\"ai-summary\">{}</div>\n",
                html_escape(&enrichment.summary)
            ));
            if !enrichment.key_points.is_empty() {
                card.push_str("                <ul class=\"key-points\">\n");
                for point in &enrichment.key_points {
                    card.push_str(&format!(
                        "                    <li>{}</li>\n",
                        html_escape(point)
                    ));
                }
                card.push_str("                </ul>\n");
            }
        }
        None => {
            // Unenriched entries fall back to a truncated feed summary.
            // The raw summary is feed HTML; strip it down to text first.
            let (preview, cut) =
                truncate_chars(&clean_html(&article.raw_summary), DESCRIPTION_PREVIEW_CHARS);
            if !preview.is_empty() {
                card.push_str(&format!(
                    "                <p class=\"description\">{}{}</p>\n",
                    html_escape(&preview),
                    if cut { "..." } else { "" }
                ));
            }
        }
    }
    card.push_str("            </article>\n");
    card
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Enrichment, SourceType};
    use chrono::TimeZone;

    fn article(id: &str, title: &str, enriched: bool) -> Article {
        Article {
            id: id.to_string(),
            title: title.to_string(),
            link: format!("https://example.com/{}", id),
            source_label: "Example".to_string(),
            published_at: Some(Utc.with_ymd_and_hms(2025, 5, 5, 0, 0, 0).unwrap()),
            fetched_at: Utc::now(),
            raw_body: String::new(),
            raw_summary: "plain feed summary".to_string(),
            is_fulltext_hint: false,
            enrichment: enriched.then(|| Enrichment {
                tags: vec!["安全".to_string()],
                summary: "an AI summary".to_string(),
                key_points: vec!["one point".to_string()],
                analysis: vec![],
                source_type: SourceType::Summary,
                input_char_count: 10,
                truncated: false,
            }),
        }
    }

    #[test]
    fn test_escapes_untrusted_text() {
        assert_eq!(
            html_escape("<script>\"&'</script>"),
            "&lt;script&gt;&quot;&amp;&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn test_enriched_card_shows_summary_and_tags() {
        let page = render_site(&[article("a", "Title <A>", true)]);
        assert!(page.contains("Title &lt;A&gt;"));
        assert!(page.contains("an AI summary"));
        assert!(page.contains("<span class=\"tag\">安全</span>"));
        assert!(page.contains("one point"));
    }

    #[test]
    fn test_unenriched_card_falls_back_to_description() {
        let page = render_site(&[article("a", "Title", false)]);
        assert!(page.contains("plain feed summary"));
        assert!(!page.contains("ai-summary"));
    }

    #[test]
    fn test_unenriched_preview_strips_feed_markup() {
        let mut item = article("a", "Title", false);
        item.raw_summary = "<p>Hello <b>world</b> &amp; more</p>".to_string();
        let page = render_site(&[item]);
        assert!(page.contains("<p class=\"description\">Hello world &amp; more</p>"));
        assert!(!page.contains("&lt;p&gt;"));
        assert!(!page.contains("&lt;b&gt;"));
    }

    #[test]
    fn test_newest_articles_render_first() {
        let mut older = article("old", "Older Post", false);
        older.published_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let newer = article("new", "Newer Post", false);

        let page = render_site(&[older, newer]);
        let newer_at = page.find("Newer Post").unwrap();
        let older_at = page.find("Older Post").unwrap();
        assert!(newer_at < older_at);
    }
}
