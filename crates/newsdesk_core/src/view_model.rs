use crate::headlines::HeaderSlot;
use crate::model::{ArticlePayload, NewsId};
use crate::settings::PublishTarget;
use crate::stage::{Stage, StageStatuses};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlineOptionView {
    pub slot: HeaderSlot,
    pub text: String,
    pub selected: bool,
}

/// Render-ready snapshot of the writer.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterView {
    pub news_id: NewsId,
    pub title: String,
    pub active: Stage,
    pub statuses: StageStatuses,
    pub background: String,
    pub headline_options: Vec<HeadlineOptionView>,
    pub selected_headline: Option<String>,
    pub headlines_edited: bool,
    pub payload: ArticlePayload,
    /// Seconds left before the active stage auto-advances.
    pub countdown_secs: Option<u32>,
    pub publish_remaining_secs: Option<u32>,
    pub publish_target: Option<PublishTarget>,
    pub admin_link: Option<String>,
    pub stage_error: Option<String>,
    pub status_message: Option<String>,
    pub can_regenerate_background: bool,
    pub can_regenerate_headlines: bool,
    pub can_regenerate_draft: bool,
    pub can_publish: bool,
    pub closed: bool,
    pub dirty: bool,
}
