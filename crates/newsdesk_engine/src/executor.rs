use std::collections::HashMap;
use std::io;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use newsdesk_core::{
    Job, JobFailure, JobOutput, Msg, PublicationOutcome, RequestId, TimerId,
};
use newsdesk_logging::{desk_debug, desk_info, desk_warn};
use tokio_util::sync::CancellationToken;

use crate::api::NewsApi;
use crate::clock::Clock;
use crate::publication::{publish_and_wait, PollOutcome};
use crate::settings::PublishSettings;

/// What the executor reports back to the writer loop.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    JobFinished {
        request: RequestId,
        result: Result<JobOutput, JobFailure>,
    },
    TimerFired {
        timer: TimerId,
        now_ms: u64,
    },
}

impl EngineEvent {
    pub fn into_msg(self) -> Msg {
        match self {
            EngineEvent::JobFinished { request, result } => Msg::JobFinished { request, result },
            EngineEvent::TimerFired { timer, now_ms } => Msg::TimerFired { timer, now_ms },
        }
    }
}

enum EngineCommand {
    Run { request: RequestId, job: Job },
    Cancel { request: RequestId },
    Schedule { timer: TimerId, after_ms: u64 },
}

type TokenMap = Arc<Mutex<HashMap<RequestId, CancellationToken>>>;

/// Runs writer jobs and timers on a dedicated runtime thread.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(
        api: Arc<dyn NewsApi>,
        clock: Arc<dyn Clock>,
        publish: PublishSettings,
    ) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let context = Arc::new(JobContext {
            api,
            clock,
            publish,
        });

        thread::Builder::new()
            .name("newsdesk-engine".to_string())
            .spawn(move || {
                let tokens: TokenMap = Arc::new(Mutex::new(HashMap::new()));
                while let Ok(command) = cmd_rx.recv() {
                    handle_command(&runtime, &context, &tokens, command, &event_tx);
                }
                desk_debug!("Engine command channel closed");
            })?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn run(&self, request: RequestId, job: Job) {
        let _ = self.cmd_tx.send(EngineCommand::Run { request, job });
    }

    pub fn cancel(&self, request: RequestId) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { request });
    }

    pub fn schedule(&self, timer: TimerId, after_ms: u64) {
        let _ = self.cmd_tx.send(EngineCommand::Schedule { timer, after_ms });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

struct JobContext {
    api: Arc<dyn NewsApi>,
    clock: Arc<dyn Clock>,
    publish: PublishSettings,
}

fn handle_command(
    runtime: &tokio::runtime::Runtime,
    context: &Arc<JobContext>,
    tokens: &TokenMap,
    command: EngineCommand,
    event_tx: &mpsc::Sender<EngineEvent>,
) {
    match command {
        EngineCommand::Run { request, job } => {
            desk_info!("Run request={} job={} news={}", request, job.name(), job.news_id());
            let token = CancellationToken::new();
            lock(tokens).insert(request, token.clone());
            let context = context.clone();
            let tokens = tokens.clone();
            let event_tx = event_tx.clone();
            runtime.spawn(async move {
                let result = tokio::select! {
                    _ = token.cancelled() => Err(JobFailure::Aborted),
                    result = execute(&context, job) => result,
                };
                lock(&tokens).remove(&request);
                if let Err(failure) = &result {
                    if *failure != JobFailure::Aborted {
                        desk_warn!("Request {} failed: {}", request, failure);
                    }
                }
                let _ = event_tx.send(EngineEvent::JobFinished { request, result });
            });
        }
        EngineCommand::Cancel { request } => {
            if let Some(token) = lock(tokens).remove(&request) {
                desk_debug!("Cancelling request {}", request);
                token.cancel();
            }
        }
        EngineCommand::Schedule { timer, after_ms } => {
            let clock = context.clock.clone();
            let event_tx = event_tx.clone();
            runtime.spawn(async move {
                tokio::time::sleep(Duration::from_millis(after_ms)).await;
                let now_ms = clock.now_ms();
                let _ = event_tx.send(EngineEvent::TimerFired { timer, now_ms });
            });
        }
    }
}

fn lock(tokens: &TokenMap) -> std::sync::MutexGuard<'_, HashMap<RequestId, CancellationToken>> {
    tokens.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn execute(context: &JobContext, job: Job) -> Result<JobOutput, JobFailure> {
    let api = context.api.as_ref();
    match job {
        Job::GenerateBackground { news_id } => {
            let generated = api.generate_background(news_id).await?;
            let refreshed = match api.fetch_item(news_id).await {
                Ok(item) => item.existing_background().map(ToOwned::to_owned),
                Err(err) => {
                    desk_warn!("News {}: refresh after background failed: {}", news_id, err);
                    None
                }
            };
            Ok(JobOutput::Background {
                generated,
                refreshed,
            })
        }
        Job::SaveBackground { news_id, text } => {
            api.update_background(news_id, &text).await?;
            Ok(JobOutput::Saved)
        }
        Job::GenerateHeadlines {
            news_id,
            timeout_ms,
        } => {
            let generate = async {
                let response = api.generate_headlines(news_id).await?;
                let snapshot = match api.fetch_item(news_id).await {
                    Ok(item) => Some(item),
                    Err(err) => {
                        desk_warn!("News {}: inbox snapshot unavailable: {}", news_id, err);
                        None
                    }
                };
                Ok::<_, JobFailure>(JobOutput::Headlines { response, snapshot })
            };
            tokio::time::timeout(Duration::from_millis(timeout_ms), generate)
                .await
                .map_err(|_| JobFailure::TimedOut)?
        }
        Job::SavePayload {
            news_id,
            serialized,
        } => {
            api.update_article_payload(news_id, &serialized).await?;
            Ok(JobOutput::Saved)
        }
        Job::GenerateDraft { news_id } => Ok(JobOutput::Draft {
            article_payload: api.generate_article_payload(news_id).await?,
        }),
        Job::Publish { news_id, target } => {
            match publish_and_wait(api, news_id, target, &context.publish, || true).await? {
                PollOutcome::Settled { state, external_id } => {
                    Ok(JobOutput::Published(PublicationOutcome {
                        state,
                        external_id,
                        completed_at_ms: context.clock.now_ms(),
                    }))
                }
                PollOutcome::Superseded => Err(JobFailure::Aborted),
            }
        }
        Job::LoadItem { news_id } => Ok(JobOutput::Item(api.fetch_item(news_id).await?)),
    }
}
