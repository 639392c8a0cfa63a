//! Newsdesk core: pure authoring state machine, domain model and helpers.
//!
//! Nothing in this crate performs IO. Backend work is requested through
//! [`Effect`]s and answered with [`Msg`]s.
mod body_text;
mod effect;
mod headlines;
mod model;
mod msg;
mod payload;
mod processing;
mod report;
mod settings;
mod stage;
mod state;
mod update;
mod view_model;
mod wire;

pub use body_text::{extract_body_text, fallback_background, initial_background};
pub use effect::{
    ConfirmPrompt, Effect, Job, JobFailure, JobOutput, PublicationOutcome, PublicationState,
    RequestId, TimerId,
};
pub use headlines::{
    extract_candidates, parse_inbox_headlines, HeaderOptions, HeaderSlot, HeadlineCandidates,
    CANDIDATE_SEARCH_MAX_DEPTH,
};
pub use model::{ArticlePayload, BulletList, NewsId, NewsItem, Paragraph, QuoteParagraph};
pub use msg::{DraftEdit, Msg};
pub use processing::{
    PipelineStep, ProcessingEntry, ProcessingMap, ProcessingStatus, ProcessingUpdate,
};
pub use report::{completion_report, CompletionReport, LINK_NOT_OBTAINED, UNKNOWN_REQUESTER};
pub use settings::{AdminLinks, PublishTarget, WriterSettings};
pub use stage::{Stage, StageStatus, StageStatuses};
pub use state::WriterState;
pub use update::update;
pub use view_model::{HeadlineOptionView, WriterView};
pub use wire::{encode_payload, PayloadError, PayloadShape, WirePayload};
