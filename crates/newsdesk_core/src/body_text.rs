use serde_json::Value;

use crate::model::NewsItem;

const FENCE: &str = "```";
const BACKGROUND_LINES: usize = 4;

/// Readable text from a scraped body that may be a fenced JSON block.
///
/// A `news_raw` string array is joined into blank-line separated
/// paragraphs; any other JSON is pretty-printed; non-JSON text is returned
/// with the fences removed.
pub fn extract_body_text(body_raw: &str) -> String {
    let cleaned = strip_fence(body_raw);
    if cleaned.is_empty() {
        return String::new();
    }
    let Ok(parsed) = serde_json::from_str::<Value>(&cleaned) else {
        return cleaned;
    };
    if let Some(lines) = parsed.get("news_raw").and_then(Value::as_array) {
        return lines
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
    }
    serde_json::to_string_pretty(&parsed).unwrap_or(cleaned)
}

fn strip_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(inner) = trimmed
        .strip_prefix(FENCE)
        .and_then(|rest| rest.strip_suffix(FENCE))
    {
        let inner = inner.trim_start();
        let inner = match inner.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &inner[4..],
            _ => inner,
        };
        return inner.trim().to_string();
    }
    trimmed.replace(FENCE, "").trim().to_string()
}

/// Locally synthesized background: the first few non-empty body lines.
pub fn initial_background(item: &NewsItem) -> String {
    let text = extract_body_text(&item.body_raw);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(BACKGROUND_LINES)
        .collect();
    if lines.is_empty() {
        return fallback_background(item);
    }
    lines.join("\n")
}

/// Placeholder bullet list used when the body has no usable text.
pub fn fallback_background(item: &NewsItem) -> String {
    let headline = if item.headline_raw.trim().is_empty() {
        "Unknown news"
    } else {
        item.headline_raw.as_str()
    };
    let mut lines = vec![format!("• Event: {headline}")];
    if let Some(host) = source_host(&item.source_url) {
        lines.push(format!("• Source: {host}"));
    }
    lines.push("• Context: add historical facts, figures and fan sentiment.".to_string());
    lines.join("\n")
}

fn source_host(source_url: &str) -> Option<String> {
    let parsed = url::Url::parse(source_url.trim()).ok()?;
    parsed.host_str().map(ToOwned::to_owned)
}
