use std::fmt;

use serde_json::Value;

use crate::model::{NewsId, NewsItem};
use crate::settings::PublishTarget;
use crate::stage::Stage;

pub type RequestId = u64;
pub type TimerId = u64;

/// A backend call sequence for one stage step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Generate, then re-fetch the item to pick up server-side changes.
    GenerateBackground { news_id: NewsId },
    SaveBackground { news_id: NewsId, text: String },
    /// Generate under a client timeout, then re-fetch the inbox snapshot.
    GenerateHeadlines { news_id: NewsId, timeout_ms: u64 },
    /// `serialized` is the exact wire text, already in the remembered shape.
    SavePayload { news_id: NewsId, serialized: String },
    GenerateDraft { news_id: NewsId },
    /// Publish, then poll the publication status until it settles.
    Publish { news_id: NewsId, target: PublishTarget },
    LoadItem { news_id: NewsId },
}

impl Job {
    pub fn news_id(&self) -> NewsId {
        match self {
            Job::GenerateBackground { news_id }
            | Job::SaveBackground { news_id, .. }
            | Job::GenerateHeadlines { news_id, .. }
            | Job::SavePayload { news_id, .. }
            | Job::GenerateDraft { news_id }
            | Job::Publish { news_id, .. }
            | Job::LoadItem { news_id } => *news_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Job::GenerateBackground { .. } => "generate-background",
            Job::SaveBackground { .. } => "save-background",
            Job::GenerateHeadlines { .. } => "generate-headlines",
            Job::SavePayload { .. } => "save-payload",
            Job::GenerateDraft { .. } => "generate-draft",
            Job::Publish { .. } => "publish",
            Job::LoadItem { .. } => "load-item",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationState {
    Published,
    Failed,
    /// Polling gave up before the record settled.
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationOutcome {
    pub state: PublicationState,
    pub external_id: Option<String>,
    /// Wall-clock time the outcome was observed, epoch milliseconds.
    pub completed_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutput {
    Background {
        generated: Option<String>,
        refreshed: Option<String>,
    },
    Saved,
    Headlines {
        response: Value,
        snapshot: Option<NewsItem>,
    },
    /// Raw generated payload; may be an object, an array or null.
    Draft { article_payload: Option<Value> },
    Published(PublicationOutcome),
    Item(NewsItem),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFailure {
    /// Cancelled on request; never surfaced.
    Aborted,
    TimedOut,
    /// The publication was generated but its payload is null.
    PayloadAssemblyFailed,
    Failed(String),
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobFailure::Aborted => write!(f, "aborted"),
            JobFailure::TimedOut => write!(f, "timed out"),
            JobFailure::PayloadAssemblyFailed => {
                write!(f, "publication generated but payload assembly failed")
            }
            JobFailure::Failed(message) => write!(f, "{message}"),
        }
    }
}

/// Questions that need a yes/no answer before the writer proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmPrompt {
    /// Regenerating would overwrite hand-edited headlines.
    DiscardHeadlines,
    /// A stage is loading; navigating aborts it.
    InterruptAndNavigate(Stage),
    /// A stage is loading; closing aborts it.
    Close,
}

impl ConfirmPrompt {
    pub fn question(self) -> String {
        match self {
            ConfirmPrompt::DiscardHeadlines => {
                "Headlines were edited by hand. Regenerate and discard the edits?".to_string()
            }
            ConfirmPrompt::InterruptAndNavigate(stage) => format!(
                "A request is still running. Abort it and go to {}?",
                stage.label()
            ),
            ConfirmPrompt::Close => "A request is still running. Close anyway?".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Run { request: RequestId, job: Job },
    Cancel { request: RequestId },
    /// Answer with `Msg::TimerFired` after `after_ms`.
    Schedule { timer: TimerId, after_ms: u64 },
    Alert(String),
    Confirm(ConfirmPrompt),
    Closed,
}
