use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub type NewsId = i64;

/// A scraped news record as stored by the backend inbox.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: NewsId,
    #[serde(default, deserialize_with = "lenient_string")]
    pub headline_raw: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub body_raw: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source_url: String,
    #[serde(default)]
    pub background: Option<String>,
    /// Alternate headline candidates, either an object or its JSON text.
    #[serde(default)]
    pub headlines: Option<Value>,
    /// Article payload as an object, a one-element array, or JSON text.
    #[serde(default)]
    pub article_payload: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
}

impl NewsItem {
    /// Background text when it is present and not blank.
    pub fn existing_background(&self) -> Option<&str> {
        self.background
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    /// Headline, or a collapsed snippet of the body when the headline is missing.
    pub fn title_or_snippet(&self) -> String {
        if !self.headline_raw.trim().is_empty() {
            return self.headline_raw.clone();
        }
        let collapsed = self.body_raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return "(untitled)".to_string();
        }
        if collapsed.chars().count() <= 80 {
            return collapsed;
        }
        let head: String = collapsed.chars().take(77).collect();
        format!("{head}...")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default = "paragraph_role", deserialize_with = "lenient_string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub opening_html_tag: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub closing_html_tag: String,
}

impl Paragraph {
    pub fn empty() -> Self {
        Self {
            role: paragraph_role(),
            opening_html_tag: "<p>".to_string(),
            content: String::new(),
            closing_html_tag: "</p>".to_string(),
        }
    }
}

/// Quote-style paragraph; each entry of `content` is one quoted line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteParagraph {
    #[serde(default = "quote_role", deserialize_with = "lenient_string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub opening_html_tag: String,
    #[serde(default, deserialize_with = "quote_lines")]
    pub content: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub closing_html_tag: String,
}

impl QuoteParagraph {
    pub fn empty() -> Self {
        Self {
            role: quote_role(),
            opening_html_tag: "<div class=\"quote-block\"><p>".to_string(),
            content: vec![String::new()],
            closing_html_tag: "</p></div>".to_string(),
        }
    }
}

/// Bullet list of background facts inside the article body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletList {
    #[serde(default, deserialize_with = "lenient_string")]
    pub opening_html_tag: String,
    #[serde(default, deserialize_with = "quote_lines")]
    pub items: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub closing_html_tag: String,
}

impl BulletList {
    pub fn empty() -> Self {
        Self {
            opening_html_tag: "<ul>".to_string(),
            items: Vec::new(),
            closing_html_tag: "</ul>".to_string(),
        }
    }
}

/// Structured article draft produced by the authoring pipeline.
///
/// Wire field names are kept as-is. Fields the backend adds that are not
/// modelled here survive a read-modify-write through `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArticlePayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub header: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub header_1: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub header_2: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub header_3: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub header_4: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_slot_number"
    )]
    pub selected_header_number: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anons: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_1: Option<Paragraph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_2: Option<QuoteParagraph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_3: Option<Paragraph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<BulletList>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sport_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn paragraph_role() -> String {
    "paragraph".to_string()
}

fn quote_role() -> String {
    "quote".to_string()
}

/// Renders a loosely typed JSON scalar as text; `null` becomes empty.
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(value_to_text).unwrap_or_default())
}

fn quote_lines<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(value_to_text).collect(),
        Some(other) => vec![value_to_text(&other)],
    })
}

fn lenient_slot_number<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_u64().and_then(|n| u8::try_from(n).ok()),
        Some(Value::String(text)) => text.trim().parse::<u8>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_headers_read_as_empty_strings() {
        let payload: ArticlePayload = serde_json::from_value(json!({
            "header": "Main",
            "header_1": "Main",
            "header_2": null,
            "selected_header_number": "1",
        }))
        .unwrap();
        assert_eq!(payload.header_2, "");
        assert_eq!(payload.selected_header_number, Some(1));
    }

    #[test]
    fn quote_accepts_plain_string_content() {
        let quote: QuoteParagraph =
            serde_json::from_value(json!({ "role": "quote", "content": "single line" })).unwrap();
        assert_eq!(quote.content, vec!["single line".to_string()]);
    }

    #[test]
    fn unknown_payload_fields_survive_roundtrip() {
        let payload: ArticlePayload =
            serde_json::from_value(json!({ "header": "A", "seo_title": "kept" })).unwrap();
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["seo_title"], "kept");
    }

    #[test]
    fn snippet_is_used_when_headline_missing() {
        let item = NewsItem {
            id: 1,
            body_raw: "  Body   text\nwith  spaces ".to_string(),
            ..NewsItem::default()
        };
        assert_eq!(item.title_or_snippet(), "Body text with spaces");
    }
}
