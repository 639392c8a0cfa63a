use std::fmt;

use newsdesk_core::{JobFailure, NewsId, PublishTarget};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::settings::PublishSettings;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Decode,
    Network,
    Cancelled,
    /// The publication exists but its article payload is null.
    PayloadAssemblyFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Decode => write!(f, "unexpected response body"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::PayloadAssemblyFailed => write!(f, "payload assembly failed"),
        }
    }
}

impl From<ApiError> for JobFailure {
    fn from(err: ApiError) -> Self {
        match err.kind {
            FailureKind::Cancelled => JobFailure::Aborted,
            FailureKind::Timeout => JobFailure::TimedOut,
            FailureKind::PayloadAssemblyFailed => JobFailure::PayloadAssemblyFailed,
            _ => JobFailure::Failed(err.to_string()),
        }
    }
}

/// Body of the publish call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishRequest {
    pub inbox_ids: Vec<NewsId>,
    pub specific_ids: Vec<i64>,
    pub limit: u32,
    pub timeout: u32,
    pub retry_failed: bool,
    pub production: bool,
}

impl PublishRequest {
    /// Publishes exactly one inbox record.
    pub fn single(news_id: NewsId, target: PublishTarget, settings: &PublishSettings) -> Self {
        Self {
            inbox_ids: vec![news_id],
            specific_ids: Vec::new(),
            limit: settings.limit,
            timeout: settings.backend_timeout_secs,
            retry_failed: false,
            production: target.is_production(),
        }
    }
}

/// Latest publication attempt for an inbox record.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PublicationRecord {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub external_id: Option<String>,
    /// `None` when the field is absent, `Some(Value::Null)` when it is null.
    #[serde(default, deserialize_with = "present_value")]
    pub article_payload: Option<Value>,
}

impl PublicationRecord {
    pub fn is_failed(&self) -> bool {
        self.status.as_deref() == Some("failed")
    }

    pub fn payload_missing(&self) -> bool {
        matches!(self.article_payload, Some(Value::Null))
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PublicationPage {
    #[serde(default)]
    pub records: Vec<PublicationRecord>,
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
