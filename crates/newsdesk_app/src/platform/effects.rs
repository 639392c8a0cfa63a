use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use newsdesk_core::{ConfirmPrompt, Effect, Job, JobOutput, Msg, NewsId, NewsItem, RequestId};
use newsdesk_engine::{EngineEvent, EngineHandle, NewsApi, ReqwestNewsApi, SystemClock};
use newsdesk_logging::{desk_debug, desk_warn};

use super::AppConfig;

/// Request id reserved for the initial item load; the writer numbers its
/// own requests from 1.
const LOAD_REQUEST: RequestId = 0;

/// Effects the terminal has to act on itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UiEffect {
    Alert(String),
    Confirm(ConfirmPrompt),
    Closed,
}

pub(crate) struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub(crate) fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let api = ReqwestNewsApi::new(config.api.clone()).context("backend client")?;
        let engine = EngineHandle::new(
            Arc::new(api) as Arc<dyn NewsApi>,
            Arc::new(SystemClock),
            config.publish.clone(),
        )
        .context("engine runtime")?;
        Ok(Self { engine })
    }

    /// Blocks until the item is fetched. Used once, before the writer exists.
    pub(crate) fn load_item(&self, news_id: NewsId, timeout: Duration) -> anyhow::Result<NewsItem> {
        self.engine.run(LOAD_REQUEST, Job::LoadItem { news_id });
        loop {
            match self.engine.recv_timeout(timeout) {
                Some(EngineEvent::JobFinished {
                    request: LOAD_REQUEST,
                    result,
                }) => {
                    return match result {
                        Ok(JobOutput::Item(item)) => Ok(item),
                        Ok(other) => Err(anyhow!("unexpected load result: {other:?}")),
                        Err(failure) => Err(anyhow!("could not load news #{news_id}: {failure}")),
                    };
                }
                Some(other) => desk_debug!("Ignoring event before load: {:?}", other),
                None => return Err(anyhow!("timed out loading news #{news_id}")),
            }
        }
    }

    /// Hands engine work to the engine and returns what the terminal must do.
    pub(crate) fn apply(&self, effects: Vec<Effect>) -> Vec<UiEffect> {
        let mut ui = Vec::new();
        for effect in effects {
            match effect {
                Effect::Run { request, job } => self.engine.run(request, job),
                Effect::Cancel { request } => self.engine.cancel(request),
                Effect::Schedule { timer, after_ms } => self.engine.schedule(timer, after_ms),
                Effect::Alert(message) => {
                    desk_warn!("Alert: {}", message);
                    ui.push(UiEffect::Alert(message));
                }
                Effect::Confirm(prompt) => ui.push(UiEffect::Confirm(prompt)),
                Effect::Closed => ui.push(UiEffect::Closed),
            }
        }
        ui
    }

    /// Next engine completion or timer, as a writer message.
    pub(crate) fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(EngineEvent::into_msg)
    }
}
