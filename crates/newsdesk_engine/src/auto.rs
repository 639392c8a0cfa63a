use std::sync::Arc;

use newsdesk_core::{
    completion_report, extract_candidates, parse_inbox_headlines, ArticlePayload,
    CompletionReport, HeaderOptions, HeaderSlot, NewsId, NewsItem, PipelineStep,
    ProcessingUpdate, PublishTarget, WirePayload,
};
use newsdesk_logging::{desk_error, desk_info, desk_warn};

use crate::api::NewsApi;
use crate::clock::Clock;
use crate::publication::{publish_and_wait, PollOutcome};
use crate::registry::{ProcessingRegistry, RunToken};
use crate::settings::AutoSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// All five steps ran; the entry was removed and a report sent.
    Completed {
        external_id: Option<String>,
        report: String,
    },
    /// The run stopped. The message is meant for the user.
    Failed { message: String },
    /// A newer run of the same item took over; nothing was applied.
    Superseded,
}

/// Runs the authoring pipeline for one item without human checkpoints.
#[derive(Clone)]
pub struct AutoRunner {
    api: Arc<dyn NewsApi>,
    registry: ProcessingRegistry,
    clock: Arc<dyn Clock>,
    settings: AutoSettings,
}

struct Superseded;

impl AutoRunner {
    pub fn new(
        api: Arc<dyn NewsApi>,
        registry: ProcessingRegistry,
        clock: Arc<dyn Clock>,
        settings: AutoSettings,
    ) -> Self {
        Self {
            api,
            registry,
            clock,
            settings,
        }
    }

    pub fn registry(&self) -> &ProcessingRegistry {
        &self.registry
    }

    pub async fn run(&self, news_id: NewsId) -> RunOutcome {
        let item = match self.api.fetch_item(news_id).await {
            Ok(item) => item,
            Err(err) => {
                desk_error!("Cannot start run for news {}: {}", news_id, err);
                return RunOutcome::Failed {
                    message: format!("Could not load news #{news_id}: {err}"),
                };
            }
        };

        let token = self.registry.start(news_id);
        let started_ms = self.clock.now_ms();
        match self.run_steps(&token, item, started_ms).await {
            Ok(outcome) => outcome,
            Err(Superseded) => {
                desk_info!("Run {} for news {} was superseded", token.epoch, news_id);
                RunOutcome::Superseded
            }
        }
    }

    async fn run_steps(
        &self,
        token: &RunToken,
        item: NewsItem,
        started_ms: u64,
    ) -> Result<RunOutcome, Superseded> {
        let news_id = token.news_id;

        self.advance(token, PipelineStep::Background)?;
        if item.existing_background().is_none() {
            self.generate_background(news_id).await;
        }

        self.advance(token, PipelineStep::Headlines)?;
        let options = self.generate_headlines(&item).await;

        self.advance(token, PipelineStep::ArticleText)?;
        let mut wire = match self.generate_payload(news_id).await {
            Ok(wire) => wire,
            Err(message) => {
                desk_error!("News {}: {}", news_id, message);
                let elapsed = self.clock.now_ms().saturating_sub(started_ms);
                if !self
                    .registry
                    .update(token, ProcessingUpdate::failed(&message).with_elapsed(elapsed))
                {
                    return Err(Superseded);
                }
                return Ok(RunOutcome::Failed { message });
            }
        };

        self.advance(token, PipelineStep::HeadlineProcessing)?;
        if options.is_empty_at(second_slot()) {
            desk_warn!("News {}: publishing with slot 2 although it has no candidate", news_id);
        }
        apply_forced_headlines(&mut wire.payload, &options, &item.headline_raw);
        match wire.encode() {
            Ok(serialized) => {
                if let Err(err) = self.api.update_article_payload(news_id, &serialized).await {
                    desk_warn!("News {}: saving article payload failed: {}", news_id, err);
                }
            }
            Err(err) => desk_warn!("News {}: cannot serialize article payload: {}", news_id, err),
        }

        self.advance(token, PipelineStep::Publication)?;
        let registry = self.registry.clone();
        let current = *token;
        let external_id = match publish_and_wait(
            self.api.as_ref(),
            news_id,
            PublishTarget::Production,
            &self.settings.publish,
            move || registry.is_current(&current),
        )
        .await
        {
            Ok(PollOutcome::Settled { external_id, .. }) => external_id,
            Ok(PollOutcome::Superseded) => return Err(Superseded),
            Err(err) => {
                desk_warn!("News {}: publication did not complete: {}", news_id, err);
                None
            }
        };
        if !self.registry.is_current(token) {
            return Err(Superseded);
        }

        let report = completion_report(&CompletionReport {
            news_id,
            requester: self.settings.requester.clone(),
            elapsed_ms: self.clock.now_ms().saturating_sub(started_ms),
            admin_link: external_id
                .as_deref()
                .map(|id| self.settings.admin_links.edit_link(PublishTarget::Production, id)),
        });
        if let Err(err) = self
            .api
            .send_notification(&self.settings.report_channel, &report)
            .await
        {
            desk_warn!("News {}: notification failed: {}", news_id, err);
        }

        if !self.registry.remove(token) {
            return Err(Superseded);
        }
        desk_info!("News {} completed, external id {:?}", news_id, external_id);
        Ok(RunOutcome::Completed {
            external_id,
            report,
        })
    }

    fn advance(&self, token: &RunToken, step: PipelineStep) -> Result<(), Superseded> {
        if self.registry.update(token, ProcessingUpdate::step(step)) {
            Ok(())
        } else {
            Err(Superseded)
        }
    }

    async fn generate_background(&self, news_id: NewsId) {
        if let Err(err) = self.api.generate_background(news_id).await {
            desk_warn!("News {}: background generation failed, continuing: {}", news_id, err);
            return;
        }
        if let Err(err) = self.api.fetch_item(news_id).await {
            desk_warn!("News {}: refresh after background failed: {}", news_id, err);
        }
    }

    async fn generate_headlines(&self, item: &NewsItem) -> HeaderOptions {
        let response = match self.api.generate_headlines(item.id).await {
            Ok(response) => response,
            Err(err) => {
                desk_warn!("News {}: headline generation failed, continuing: {}", item.id, err);
                return HeaderOptions::with_original(&item.headline_raw);
            }
        };
        let inbox = match self.api.fetch_item(item.id).await {
            Ok(snapshot) => parse_inbox_headlines(snapshot.headlines.as_ref()),
            Err(err) => {
                desk_warn!("News {}: inbox snapshot unavailable: {}", item.id, err);
                None
            }
        };
        let from_response = extract_candidates(&response);
        HeaderOptions::resolve(&item.headline_raw, inbox.as_ref(), Some(&from_response))
    }

    /// Prefers the stored payload over the generation response.
    async fn generate_payload(&self, news_id: NewsId) -> Result<WirePayload, String> {
        let generated = self
            .api
            .generate_article_payload(news_id)
            .await
            .map_err(|err| format!("Article text generation failed: {err}"))?;
        let stored = match self.api.fetch_item(news_id).await {
            Ok(item) => item.article_payload,
            Err(err) => {
                desk_warn!("News {}: refresh after article text failed: {}", news_id, err);
                None
            }
        };
        for raw in [stored, generated].into_iter().flatten() {
            match WirePayload::decode(&raw) {
                Ok(Some(wire)) => return Ok(wire),
                Ok(None) => {}
                Err(err) => desk_warn!("News {}: unreadable article payload: {}", news_id, err),
            }
        }
        Err("No article payload was received".to_string())
    }
}

fn second_slot() -> HeaderSlot {
    HeaderSlot::SELECTABLE[0]
}

/// Slot 2 becomes the published headline and slots 3 and 4 are listed on top
/// of the first paragraph.
fn apply_forced_headlines(payload: &mut ArticlePayload, options: &HeaderOptions, headline_raw: &str) {
    let [_, third, fourth] = HeaderSlot::SELECTABLE;
    payload.force_published_header(options, headline_raw);
    payload.prepend_alternative_headlines(options.get(third), options.get(fourth));
}
