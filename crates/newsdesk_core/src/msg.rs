use crate::effect::{ConfirmPrompt, JobFailure, JobOutput, RequestId, TimerId};
use crate::headlines::HeaderSlot;
use crate::settings::PublishTarget;
use crate::stage::Stage;

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// The writer was opened for its item.
    Opened,
    /// User changed the background text.
    BackgroundEdited(String),
    /// Stop the review countdown of the active stage.
    Hold,
    RegenerateBackground,
    /// Persist the background and start headline generation now.
    LaunchHeadlines,
    RegenerateHeadlines,
    HeadlineEdited { slot: HeaderSlot, text: String },
    /// User picked a candidate; persists and starts the draft.
    HeadlineSelected(HeaderSlot),
    DraftEdited(DraftEdit),
    RegenerateDraft,
    Publish(PublishTarget),
    AbortPublish,
    NavigateTo(Stage),
    CloseRequested,
    /// Answer to an `Effect::Confirm`.
    Confirmed { prompt: ConfirmPrompt, accepted: bool },
    /// Engine completion for a job.
    JobFinished {
        request: RequestId,
        result: Result<JobOutput, JobFailure>,
    },
    TimerFired { timer: TimerId, now_ms: u64 },
    /// Fallback for placeholder wiring.
    NoOp,
}

/// Free-form edits of the draft body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftEdit {
    Anons(String),
    Paragraph1(String),
    /// Quote blocks separated by a blank line.
    Quote(String),
    Paragraph3(String),
    BackgroundItem { index: usize, text: String },
    AddBackgroundItem,
    RemoveBackgroundItem(usize),
}
