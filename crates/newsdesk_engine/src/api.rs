use newsdesk_core::{NewsId, NewsItem};
use serde_json::Value;

use crate::types::{ApiError, PublicationRecord, PublishRequest};

/// Backend capabilities used by both the writer and the unattended runner.
#[async_trait::async_trait]
pub trait NewsApi: Send + Sync {
    async fn fetch_item(&self, news_id: NewsId) -> Result<NewsItem, ApiError>;

    /// Returns the generated text when the response carries one.
    async fn generate_background(&self, news_id: NewsId) -> Result<Option<String>, ApiError>;

    /// Raw response; candidates may be nested anywhere inside it.
    async fn generate_headlines(&self, news_id: NewsId) -> Result<Value, ApiError>;

    /// The generated payload in whatever wire form the backend used.
    async fn generate_article_payload(&self, news_id: NewsId)
        -> Result<Option<Value>, ApiError>;

    async fn update_background(&self, news_id: NewsId, text: &str) -> Result<(), ApiError>;

    /// `serialized` is sent verbatim so the stored shape is preserved.
    async fn update_article_payload(
        &self,
        news_id: NewsId,
        serialized: &str,
    ) -> Result<(), ApiError>;

    /// Accepts the publish job. The result has to be polled.
    async fn publish(&self, request: &PublishRequest) -> Result<(), ApiError>;

    async fn latest_publication(
        &self,
        news_id: NewsId,
    ) -> Result<Option<PublicationRecord>, ApiError>;

    async fn send_notification(&self, channel_id: &str, text: &str) -> Result<(), ApiError>;
}
