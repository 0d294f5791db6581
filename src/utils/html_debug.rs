// src/utils/html_debug.rs
use std::fs::File;
use std::io::Write;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extractors::amount::SERIES_LABEL;
use crate::extractors::ExtractionResult;
use crate::utils::error::AppError;

// Vocabulary worth seeing when a document yields nothing.
static TRIGGER_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?-u:\b)(?:underwriting|underwriters?|purchasers?)(?:['’]s|['’])?(?-u:\b)")
        .expect("Failed to compile TRIGGER_WORD_RE")
});

static SERIES_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(SERIES_LABEL).expect("Failed to compile SERIES_WORD_RE")
});

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Renders plain document text as HTML with the given byte ranges highlighted.
/// Ranges overlapping an earlier highlight are dropped.
pub fn render_debug_html(text: &str, highlights: &[(usize, usize, &str)]) -> String {
    let mut debug_html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<style>\n");

    // CSS for highlight colors
    debug_html.push_str("body { white-space: pre-wrap; font-family: monospace; }\n");
    debug_html.push_str(".highlight-amount { background-color: #90EE90; }\n");
    debug_html.push_str(".highlight-ambiguous { background-color: #FFA500; }\n");
    debug_html.push_str(".highlight-trigger { background-color: #FFFF00; }\n");
    debug_html.push_str(".highlight-series { background-color: #ADD8E6; }\n");
    debug_html.push_str(".highlight-custom { background-color: #FFC0CB; }\n");
    debug_html.push_str("</style>\n</head>\n<body>\n");

    let mut last_pos = 0;
    let mut sorted_highlights = highlights.to_vec();
    sorted_highlights.sort_by_key(|h| (h.0, std::cmp::Reverse(h.1)));

    for (start, end, highlight_type) in sorted_highlights {
        if start < last_pos || end > text.len() || start >= end {
            continue;
        }
        if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            continue;
        }

        debug_html.push_str(&escape_html(&text[last_pos..start]));

        let css_class = match highlight_type {
            "amount" => "highlight-amount",
            "ambiguous" => "highlight-ambiguous",
            "trigger" => "highlight-trigger",
            "series" => "highlight-series",
            _ => "highlight-custom",
        };

        debug_html.push_str(&format!(
            "<span class=\"{}\" title=\"Position: {}-{}, Type: {}\">",
            css_class, start, end, highlight_type
        ));
        debug_html.push_str(&escape_html(&text[start..end]));
        debug_html.push_str("</span>");

        last_pos = end;
    }

    if last_pos < text.len() {
        debug_html.push_str(&escape_html(&text[last_pos..]));
    }

    debug_html.push_str("\n</body>\n</html>");
    debug_html
}

/// Saves a debug view of `text` to `filename`, highlighting located amounts,
/// series labels and underwriter/purchaser vocabulary.
pub fn create_debug_html<P: AsRef<Path>>(
    text: &str,
    filename: P,
    result: &ExtractionResult,
) -> Result<(), AppError> {
    let mut highlights: Vec<(usize, usize, &str)> = result
        .iter()
        .map(|c| {
            let kind = if c.ambiguous { "ambiguous" } else { "amount" };
            (c.position.0, c.position.1, kind)
        })
        .collect();

    for mat in SERIES_WORD_RE.find_iter(text) {
        highlights.push((mat.start(), mat.end(), "series"));
    }
    for mat in TRIGGER_WORD_RE.find_iter(text) {
        highlights.push((mat.start(), mat.end(), "trigger"));
    }

    let path = filename.as_ref();
    let mut file = File::create(path)?;
    file.write_all(render_debug_html(text, &highlights).as_bytes())?;

    tracing::info!("Saved debug HTML to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::extract_fees;

    #[test]
    fn test_render_escapes_and_highlights() {
        let text = "a <b> $5 & more";
        let start = text.find('$').unwrap();
        let html = render_debug_html(text, &[(start, start + 2, "amount")]);
        assert!(html.contains("a &lt;b&gt; <span class=\"highlight-amount\""));
        assert!(html.contains(">$5</span> &amp; more"));
    }

    #[test]
    fn test_overlapping_highlights_are_dropped() {
        let text = "Underwriters fee";
        let html = render_debug_html(text, &[(0, 12, "trigger"), (5, 10, "custom")]);
        assert_eq!(html.matches("<span").count(), 1);
        assert!(!html.contains("highlight-custom\""));
    }

    #[test]
    fn test_create_debug_html_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotated.html");
        let text = "The City will pay the Series 2024A Underwriter a fee of $55,000.";
        let result = extract_fees(text);

        create_debug_html(text, &path, &result).unwrap();

        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("class=\"highlight-amount\""));
        assert!(html.contains("class=\"highlight-series\""));
        assert!(html.contains("class=\"highlight-trigger\""));
    }
}
