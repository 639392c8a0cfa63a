use newsdesk_core::{NewsId, PublicationState, PublishTarget};
use newsdesk_logging::{desk_debug, desk_info, desk_warn};

use crate::api::NewsApi;
use crate::settings::PublishSettings;
use crate::types::{ApiError, FailureKind, PublishRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// `Pending` means polling ran out of time.
    Settled {
        state: PublicationState,
        external_id: Option<String>,
    },
    /// The caller's run was replaced while polling; nothing may be applied.
    Superseded,
}

/// Polls the latest publication record until it has an external id, fails,
/// or the poll timeout passes.
///
/// `still_current` is checked before each request and before each result is
/// looked at.
pub async fn wait_for_publication<F>(
    api: &dyn NewsApi,
    news_id: NewsId,
    settings: &PublishSettings,
    still_current: F,
) -> Result<PollOutcome, ApiError>
where
    F: Fn() -> bool + Send + Sync,
{
    let started = tokio::time::Instant::now();
    let mut attempts = 0u32;
    while started.elapsed() < settings.poll_timeout {
        if !still_current() {
            return Ok(PollOutcome::Superseded);
        }
        attempts += 1;
        let record = api.latest_publication(news_id).await?;
        if !still_current() {
            return Ok(PollOutcome::Superseded);
        }

        if let Some(record) = record {
            if record.payload_missing() {
                return Err(ApiError::new(
                    FailureKind::PayloadAssemblyFailed,
                    format!("publication for news {news_id} has no article payload"),
                ));
            }
            if record.is_failed() {
                desk_warn!("Publication of news {} failed after {} polls", news_id, attempts);
                return Ok(PollOutcome::Settled {
                    state: PublicationState::Failed,
                    external_id: record.external_id,
                });
            }
            if record.external_id.is_some() {
                desk_info!(
                    "News {} published as {:?} after {} polls",
                    news_id,
                    record.external_id,
                    attempts
                );
                return Ok(PollOutcome::Settled {
                    state: PublicationState::Published,
                    external_id: record.external_id,
                });
            }
            desk_debug!("News {} publication status {:?}", news_id, record.status);
        }
        tokio::time::sleep(settings.poll_interval).await;
    }

    desk_warn!("Publication of news {} still pending after {:?}", news_id, settings.poll_timeout);
    Ok(PollOutcome::Settled {
        state: PublicationState::Pending,
        external_id: None,
    })
}

/// Submits a single-item publish job and waits for its outcome.
pub async fn publish_and_wait<F>(
    api: &dyn NewsApi,
    news_id: NewsId,
    target: PublishTarget,
    settings: &PublishSettings,
    still_current: F,
) -> Result<PollOutcome, ApiError>
where
    F: Fn() -> bool + Send + Sync,
{
    api.publish(&PublishRequest::single(news_id, target, settings))
        .await?;
    wait_for_publication(api, news_id, settings, still_current).await
}
