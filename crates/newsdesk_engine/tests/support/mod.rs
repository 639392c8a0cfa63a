#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Mutex, Once};
use std::time::Duration;

use newsdesk_core::{NewsId, NewsItem};
use newsdesk_engine::{ApiError, FailureKind, NewsApi, PublicationRecord, PublishRequest};
use serde_json::{json, Value};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(newsdesk_logging::initialize_for_tests);
}

pub fn http_error(code: u16) -> ApiError {
    ApiError {
        kind: FailureKind::HttpStatus(code),
        message: format!("status {code}"),
    }
}

pub fn published(external_id: &str) -> PublicationRecord {
    PublicationRecord {
        status: Some("published".to_string()),
        external_id: Some(external_id.to_string()),
        article_payload: Some(json!({ "header": "x" })),
    }
}

pub fn pending() -> PublicationRecord {
    PublicationRecord {
        status: Some("pending".to_string()),
        external_id: None,
        article_payload: None,
    }
}

/// Scripted in-memory backend.
#[derive(Default)]
pub struct FakeBackend {
    pub item: NewsItem,
    pub background: Option<String>,
    pub fail_background: bool,
    pub headlines_response: Value,
    /// Written to the item's `headlines` when headlines are generated.
    pub stored_headlines: Option<Value>,
    pub fail_headlines: bool,
    pub headlines_delay: Option<Duration>,
    pub article_payload: Option<Value>,
    pub fail_article_payload: bool,
    pub fail_payload_save: bool,
    /// One record per poll; the last one repeats.
    pub publications: VecDeque<Option<PublicationRecord>>,
    pub poll_delay: Option<Duration>,
    pub calls: Vec<String>,
    pub saved_backgrounds: Vec<String>,
    pub saved_payloads: Vec<String>,
    pub publish_requests: Vec<PublishRequest>,
    pub notifications: Vec<(String, String)>,
}

pub struct FakeApi {
    pub backend: Mutex<FakeBackend>,
}

impl FakeApi {
    pub fn new(backend: FakeBackend) -> Self {
        Self {
            backend: Mutex::new(backend),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeBackend) -> R) -> R {
        f(&mut self.backend.lock().unwrap())
    }

    pub fn calls(&self) -> Vec<String> {
        self.with(|backend| backend.calls.clone())
    }

    fn record(&self, call: &str) {
        self.with(|backend| backend.calls.push(call.to_string()));
    }
}

#[async_trait::async_trait]
impl NewsApi for FakeApi {
    async fn fetch_item(&self, _news_id: NewsId) -> Result<NewsItem, ApiError> {
        self.record("fetch_item");
        Ok(self.with(|backend| backend.item.clone()))
    }

    async fn generate_background(&self, _news_id: NewsId) -> Result<Option<String>, ApiError> {
        self.record("generate_background");
        self.with(|backend| {
            if backend.fail_background {
                return Err(http_error(502));
            }
            backend.item.background = backend.background.clone();
            Ok(backend.background.clone())
        })
    }

    async fn generate_headlines(&self, _news_id: NewsId) -> Result<Value, ApiError> {
        self.record("generate_headlines");
        let delay = self.with(|backend| backend.headlines_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.with(|backend| {
            if backend.fail_headlines {
                return Err(http_error(500));
            }
            if let Some(stored) = backend.stored_headlines.clone() {
                backend.item.headlines = Some(stored);
            }
            Ok(backend.headlines_response.clone())
        })
    }

    async fn generate_article_payload(
        &self,
        _news_id: NewsId,
    ) -> Result<Option<Value>, ApiError> {
        self.record("generate_article_payload");
        self.with(|backend| {
            if backend.fail_article_payload {
                return Err(http_error(500));
            }
            Ok(backend.article_payload.clone())
        })
    }

    async fn update_background(&self, _news_id: NewsId, text: &str) -> Result<(), ApiError> {
        self.record("update_background");
        self.with(|backend| {
            backend.saved_backgrounds.push(text.to_string());
            backend.item.background = Some(text.to_string());
        });
        Ok(())
    }

    async fn update_article_payload(
        &self,
        _news_id: NewsId,
        serialized: &str,
    ) -> Result<(), ApiError> {
        self.record("update_article_payload");
        self.with(|backend| {
            if backend.fail_payload_save {
                return Err(http_error(500));
            }
            backend.saved_payloads.push(serialized.to_string());
            Ok(())
        })
    }

    async fn publish(&self, request: &PublishRequest) -> Result<(), ApiError> {
        self.record("publish");
        self.with(|backend| backend.publish_requests.push(request.clone()));
        Ok(())
    }

    async fn latest_publication(
        &self,
        _news_id: NewsId,
    ) -> Result<Option<PublicationRecord>, ApiError> {
        self.record("latest_publication");
        let delay = self.with(|backend| backend.poll_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.with(|backend| {
            if backend.publications.len() > 1 {
                backend.publications.pop_front().flatten()
            } else {
                backend.publications.front().cloned().flatten()
            }
        }))
    }

    async fn send_notification(&self, channel_id: &str, text: &str) -> Result<(), ApiError> {
        self.record("send_notification");
        self.with(|backend| {
            backend
                .notifications
                .push((channel_id.to_string(), text.to_string()))
        });
        Ok(())
    }
}
