use newsdesk_core::{NewsId, NewsItem};
use newsdesk_logging::desk_debug;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;

use crate::api::NewsApi;
use crate::settings::ApiSettings;
use crate::types::{ApiError, FailureKind, PublicationPage, PublicationRecord, PublishRequest};

const API_PREFIX: &str = "autonews_api/v1";

/// [`NewsApi`] over the autonews REST endpoints.
#[derive(Debug, Clone)]
pub struct ReqwestNewsApi {
    settings: ApiSettings,
    client: reqwest::Client,
}

impl ReqwestNewsApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.settings.base_url.trim_end_matches('/');
        Url::parse(&format!("{base}/{API_PREFIX}/{path}"))
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::new(
            FailureKind::HttpStatus(status.as_u16()),
            format!("{status} {body}").trim().to_string(),
        ))
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        desk_debug!("POST {}", url);
        let response = self.send(self.client.post(url).json(&body)).await?;
        response.json::<T>().await.map_err(map_reqwest_error)
    }

    async fn patch_json(&self, path: &str, body: Value) -> Result<(), ApiError> {
        let url = self.endpoint(path)?;
        desk_debug!("PATCH {}", url);
        self.send(self.client.patch(url).json(&body)).await?;
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        desk_debug!("GET {}", url);
        let response = self.send(self.client.get(url)).await?;
        response.json::<T>().await.map_err(map_reqwest_error)
    }
}

#[async_trait::async_trait]
impl NewsApi for ReqwestNewsApi {
    async fn fetch_item(&self, news_id: NewsId) -> Result<NewsItem, ApiError> {
        let url = self.endpoint(&format!("inbox/{news_id}"))?;
        self.get_json(url).await
    }

    async fn generate_background(&self, news_id: NewsId) -> Result<Option<String>, ApiError> {
        let body = json!({
            "inbox_id": news_id,
            "gpt_prompt_id": self.settings.prompts.background,
        });
        let response: Value = self.post_json("background", body).await?;
        Ok(response
            .get("background")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(ToOwned::to_owned))
    }

    async fn generate_headlines(&self, news_id: NewsId) -> Result<Value, ApiError> {
        let body = json!({
            "inbox_id": news_id,
            "gpt_prompt_id": self.settings.prompts.headlines,
        });
        self.post_json("generate_headlines", body).await
    }

    async fn generate_article_payload(
        &self,
        news_id: NewsId,
    ) -> Result<Option<Value>, ApiError> {
        let body = json!({
            "inbox_id": news_id,
            "gpt_prompt_id": self.settings.prompts.article_payload,
        });
        let mut response: Value = self.post_json("article-payload", body).await?;
        Ok(response
            .get_mut("article_payload")
            .map(Value::take)
            .filter(|payload| !payload.is_null()))
    }

    async fn update_background(&self, news_id: NewsId, text: &str) -> Result<(), ApiError> {
        self.patch_json(
            &format!("inbox/{news_id}/background"),
            json!({ "background": text }),
        )
        .await
    }

    async fn update_article_payload(
        &self,
        news_id: NewsId,
        serialized: &str,
    ) -> Result<(), ApiError> {
        self.patch_json(
            &format!("inbox/{news_id}/article_payload"),
            json!({ "article_payload": serialized }),
        )
        .await
    }

    async fn publish(&self, request: &PublishRequest) -> Result<(), ApiError> {
        let body = serde_json::to_value(request)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?;
        let _: Value = self.post_json("publish", body).await?;
        Ok(())
    }

    async fn latest_publication(
        &self,
        news_id: NewsId,
    ) -> Result<Option<PublicationRecord>, ApiError> {
        let mut url = self.endpoint("publications")?;
        url.query_pairs_mut()
            .append_pair("inbox_id", &news_id.to_string())
            .append_pair("page", "1")
            .append_pair("page_size", "1")
            .append_pair("sort_by", "id")
            .append_pair("sort_order", "desc");
        let page: PublicationPage = self.get_json(url).await?;
        Ok(page.records.into_iter().next())
    }

    async fn send_notification(&self, channel_id: &str, text: &str) -> Result<(), ApiError> {
        let body = json!({ "channel_id": channel_id, "text": text });
        let _: Value = self.post_json("slack_reports", body).await?;
        Ok(())
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Decode, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
