use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::ArticlePayload;

/// Outer JSON shape an article payload arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PayloadShape {
    #[default]
    Object,
    /// Single-element array wrapping the object.
    Array,
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("article payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("article payload has unexpected shape: {0}")]
    Shape(&'static str),
}

/// A decoded article payload together with the shape it was read in.
#[derive(Debug, Clone, PartialEq)]
pub struct WirePayload {
    pub shape: PayloadShape,
    pub payload: ArticlePayload,
}

impl WirePayload {
    /// Normalizes any accepted wire form into a payload.
    ///
    /// Strings are parsed as JSON first. `null`, an empty string and an empty
    /// array mean "no payload yet" and yield `Ok(None)`.
    pub fn decode(raw: &Value) -> Result<Option<Self>, PayloadError> {
        match raw {
            Value::Null => Ok(None),
            Value::String(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                let parsed: Value = serde_json::from_str(trimmed)?;
                if parsed.is_string() {
                    return Err(PayloadError::Shape("doubly encoded string"));
                }
                Self::decode(&parsed)
            }
            Value::Array(items) => match items.first() {
                None | Some(Value::Null) => Ok(None),
                Some(first @ Value::Object(_)) => Ok(Some(Self {
                    shape: PayloadShape::Array,
                    payload: serde_json::from_value(first.clone())?,
                })),
                Some(_) => Err(PayloadError::Shape("array element is not an object")),
            },
            Value::Object(_) => Ok(Some(Self {
                shape: PayloadShape::Object,
                payload: serde_json::from_value(raw.clone())?,
            })),
            _ => Err(PayloadError::Shape("expected an object or an array")),
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        encode_payload(&self.payload, self.shape)
    }
}

/// Serializes `payload` in the given outer shape.
pub fn encode_payload(
    payload: &ArticlePayload,
    shape: PayloadShape,
) -> Result<String, serde_json::Error> {
    match shape {
        PayloadShape::Object => serde_json::to_string(payload),
        PayloadShape::Array => serde_json::to_string(&[payload]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn array_shape_is_remembered_and_written_back() {
        let raw = json!([{ "header": "A", "header_1": "A", "selected_header_number": 1 }]);
        let wire = WirePayload::decode(&raw).unwrap().unwrap();
        assert_eq!(wire.shape, PayloadShape::Array);
        let written: Value = serde_json::from_str(&wire.encode().unwrap()).unwrap();
        assert!(written.is_array());
        assert_eq!(written[0]["header"], "A");
    }

    #[test]
    fn json_text_is_parsed_before_shape_detection() {
        let raw = Value::String(r#"{"header":"From text"}"#.to_string());
        let wire = WirePayload::decode(&raw).unwrap().unwrap();
        assert_eq!(wire.shape, PayloadShape::Object);
        assert_eq!(wire.payload.header, "From text");
    }

    #[test]
    fn empty_forms_mean_no_payload() {
        assert!(WirePayload::decode(&Value::Null).unwrap().is_none());
        assert!(WirePayload::decode(&json!([])).unwrap().is_none());
        assert!(WirePayload::decode(&json!("  ")).unwrap().is_none());
    }

    #[test]
    fn scalars_are_rejected() {
        assert!(matches!(
            WirePayload::decode(&json!(17)),
            Err(PayloadError::Shape(_))
        ));
    }
}
