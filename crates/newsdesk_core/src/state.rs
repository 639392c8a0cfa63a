use newsdesk_logging::desk_warn;

use crate::effect::{Effect, Job, RequestId, TimerId};
use crate::headlines::{HeaderOptions, HeaderSlot};
use crate::model::{ArticlePayload, NewsItem};
use crate::settings::{PublishTarget, WriterSettings};
use crate::stage::{Stage, StageStatus, StageStatuses};
use crate::view_model::{HeadlineOptionView, WriterView};
use crate::wire::{encode_payload, PayloadShape, WirePayload};

/// Work a stage is waiting on, resumed when its request finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Pending {
    GenerateBackground,
    SaveBackground {
        text: String,
        then: AfterBackgroundSave,
    },
    GenerateHeadlines {
        regenerate: bool,
    },
    SaveSelection {
        serialized: String,
    },
    GenerateDraft {
        regenerate: bool,
    },
    SaveDraft {
        serialized: String,
    },
    SaveBeforePublish {
        serialized: String,
        target: PublishTarget,
    },
    Publish(PublishTarget),
    LoadDraft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AfterBackgroundSave {
    LaunchHeadlines,
    NavigateDraft,
}

/// One in-flight request and one live timer per stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct StageSlot {
    pub(crate) request: Option<(RequestId, Pending)>,
    pub(crate) timer: Option<TimerId>,
}

/// Review countdown, decremented by one-second timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Countdown {
    pub(crate) stage: Stage,
    pub(crate) remaining_secs: u32,
}

/// Minimum-display phase after a successful publish, driven by a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PublishDisplay {
    pub(crate) deadline_ms: u64,
    pub(crate) remaining_ms: u64,
}

/// Everything the manual writer knows about one news item.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterState {
    pub(crate) item: NewsItem,
    pub(crate) settings: WriterSettings,
    pub(crate) active: Stage,
    pub(crate) statuses: StageStatuses,
    pub(crate) slots: [StageSlot; 4],
    next_handle: u64,
    pub(crate) background_draft: String,
    pub(crate) last_saved_background: Option<String>,
    pub(crate) background_regenerable: bool,
    pub(crate) options: HeaderOptions,
    pub(crate) selected: Option<HeaderSlot>,
    pub(crate) headlines_edited: bool,
    pub(crate) payload: ArticlePayload,
    /// Wire shape fixed by the first payload read; `None` until then.
    pub(crate) shape: Option<PayloadShape>,
    pub(crate) last_saved_payload: Option<String>,
    pub(crate) draft_regenerated: bool,
    pub(crate) stage_errors: [Option<String>; 4],
    pub(crate) countdown: Option<Countdown>,
    pub(crate) publish_display: Option<PublishDisplay>,
    pub(crate) publish_target: Option<PublishTarget>,
    pub(crate) external_id: Option<String>,
    pub(crate) status_message: Option<String>,
    pub(crate) closed: bool,
    dirty: bool,
}

impl WriterState {
    pub fn new(item: NewsItem, settings: WriterSettings) -> Self {
        let options = HeaderOptions::with_original(&item.headline_raw);
        let payload = ArticlePayload::fallback(&item);
        Self {
            item,
            settings,
            active: Stage::Background,
            statuses: StageStatuses::default(),
            slots: Default::default(),
            next_handle: 1,
            background_draft: String::new(),
            last_saved_background: None,
            background_regenerable: false,
            options,
            selected: None,
            headlines_edited: false,
            payload,
            shape: None,
            last_saved_payload: None,
            draft_regenerated: false,
            stage_errors: Default::default(),
            countdown: None,
            publish_display: None,
            publish_target: None,
            external_id: None,
            status_message: None,
            closed: false,
            dirty: false,
        }
    }

    pub fn item(&self) -> &NewsItem {
        &self.item
    }

    pub fn payload(&self) -> &ArticlePayload {
        &self.payload
    }

    pub fn status(&self, stage: Stage) -> StageStatus {
        self.statuses.get(stage)
    }

    pub fn active_stage(&self) -> Stage {
        self.active
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// True while any stage waits on the backend.
    pub fn is_busy(&self) -> bool {
        self.statuses.any_loading()
    }

    pub fn view(&self) -> WriterView {
        let headline_options = HeaderSlot::ALL
            .into_iter()
            .map(|slot| HeadlineOptionView {
                slot,
                text: self.options.get(slot).to_string(),
                selected: self.selected == Some(slot),
            })
            .collect();
        let admin_link = match (self.publish_target, &self.external_id) {
            (Some(target), Some(id)) if self.status(Stage::Publish) == StageStatus::Complete => {
                Some(self.settings.admin_links.edit_link(target, id))
            }
            _ => None,
        };
        let idle = !self.is_busy() && !self.closed;
        WriterView {
            news_id: self.item.id,
            title: self.item.title_or_snippet(),
            active: self.active,
            statuses: self.statuses,
            background: self.background_draft.clone(),
            headline_options,
            selected_headline: self.selected.map(|slot| self.options.get(slot).to_string()),
            headlines_edited: self.headlines_edited,
            payload: self.payload.clone(),
            countdown_secs: self.countdown.map(|c| c.remaining_secs),
            publish_remaining_secs: self
                .publish_display
                .map(|d| u32::try_from(d.remaining_ms.div_ceil(1000)).unwrap_or(u32::MAX)),
            publish_target: self.publish_target,
            admin_link,
            stage_error: self.stage_errors[self.active.index()].clone(),
            status_message: self.status_message.clone(),
            can_regenerate_background: idle
                && self.active == Stage::Background
                && self.background_regenerable,
            can_regenerate_headlines: idle
                && self.active == Stage::Headlines
                && self.status(Stage::Headlines) != StageStatus::Locked,
            can_regenerate_draft: idle
                && self.active == Stage::Draft
                && self.draft_regenerable(),
            can_publish: idle && self.active == Stage::Draft && self.draft_publishable(),
            closed: self.closed,
            dirty: self.dirty,
        }
    }

    /// Returns and clears the "needs redraw" flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_status(&mut self, stage: Stage, status: StageStatus) {
        self.statuses.set(stage, status);
        self.dirty = true;
    }

    pub(crate) fn set_message(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.dirty = true;
    }

    pub(crate) fn set_stage_error(&mut self, stage: Stage, message: Option<String>) {
        self.stage_errors[stage.index()] = message;
        self.dirty = true;
    }

    fn next_handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    /// Starts `job` in the stage's slot, aborting whatever ran there.
    pub(crate) fn run(&mut self, stage: Stage, pending: Pending, job: Job) -> Vec<Effect> {
        let mut effects = Vec::with_capacity(2);
        if let Some((previous, _)) = self.slots[stage.index()].request.take() {
            effects.push(Effect::Cancel { request: previous });
        }
        let request = self.next_handle();
        self.slots[stage.index()].request = Some((request, pending));
        effects.push(Effect::Run { request, job });
        effects
    }

    /// Aborts the stage's request and invalidates its timer.
    pub(crate) fn clear_slot(&mut self, stage: Stage) -> Vec<Effect> {
        let slot = &mut self.slots[stage.index()];
        slot.timer = None;
        if self.countdown.is_some_and(|c| c.stage == stage) {
            self.countdown = None;
        }
        if stage == Stage::Publish {
            self.publish_display = None;
        }
        slot.request
            .take()
            .map(|(request, _)| Effect::Cancel { request })
            .into_iter()
            .collect()
    }

    pub(crate) fn clear_all_slots(&mut self) -> Vec<Effect> {
        Stage::ALL
            .into_iter()
            .flat_map(|stage| self.clear_slot(stage))
            .collect()
    }

    /// Removes and returns the pending work owned by `request`.
    ///
    /// `None` means the request was superseded and its result is stale.
    pub(crate) fn take_pending(&mut self, request: RequestId) -> Option<(Stage, Pending)> {
        Stage::ALL.into_iter().find_map(|stage| {
            let slot = &mut self.slots[stage.index()];
            let owns = matches!(&slot.request, Some((current, _)) if *current == request);
            if owns {
                slot.request.take().map(|(_, pending)| (stage, pending))
            } else {
                None
            }
        })
    }

    /// Arms a timer in the stage's slot, replacing any previous one.
    pub(crate) fn schedule(&mut self, stage: Stage, after_ms: u64) -> Effect {
        let timer = self.next_handle();
        self.slots[stage.index()].timer = Some(timer);
        Effect::Schedule { timer, after_ms }
    }

    /// Stage whose live timer is `timer`, consuming it.
    pub(crate) fn take_timer(&mut self, timer: TimerId) -> Option<Stage> {
        Stage::ALL.into_iter().find(|stage| {
            let slot = &mut self.slots[stage.index()];
            if slot.timer == Some(timer) {
                slot.timer = None;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn start_countdown(&mut self, stage: Stage) -> Vec<Effect> {
        self.countdown = Some(Countdown {
            stage,
            remaining_secs: self.settings.review_delay_secs.max(1),
        });
        self.dirty = true;
        vec![self.schedule(stage, 1_000)]
    }

    /// Stops a running countdown on `stage`. Returns whether one was running.
    pub(crate) fn cancel_countdown(&mut self, stage: Stage) -> bool {
        if self.countdown.is_some_and(|c| c.stage == stage) {
            self.countdown = None;
            self.slots[stage.index()].timer = None;
            self.dirty = true;
            true
        } else {
            false
        }
    }

    /// Serialized payload in the remembered wire shape.
    pub(crate) fn serialize_payload(&mut self) -> Option<String> {
        let shape = *self.shape.get_or_insert_with(PayloadShape::default);
        match encode_payload(&self.payload, shape) {
            Ok(serialized) => Some(serialized),
            Err(err) => {
                desk_warn!("Failed to serialize article payload: {}", err);
                None
            }
        }
    }

    /// Replaces local draft state with a payload read from the backend.
    ///
    /// Without a stored selection or a header matching a slot, `default`
    /// is chosen; an empty default falls back to the original headline.
    pub(crate) fn adopt_payload(&mut self, wire: WirePayload, default: HeaderSlot) {
        self.shape = Some(wire.shape);
        self.payload = wire.payload;
        self.last_saved_payload = self.serialize_payload();
        self.options = self.payload.header_options(&self.item.headline_raw);
        let selected = self.payload.selected_slot().or_else(|| {
            self.options
                .find_slot_matching(&self.payload.header)
                .or(Some(default))
        });
        if let Some(slot) = selected {
            let consistent = self.payload.selected_slot() == Some(slot)
                && self.payload.header == self.payload.header_text(slot);
            let chosen = if consistent {
                slot
            } else {
                self.payload.apply_header_options(&self.options, slot)
            };
            self.selected = Some(chosen);
        }
        self.headlines_edited = false;
        self.dirty = true;
    }

    /// True when the draft slot is already saving exactly `serialized`.
    pub(crate) fn draft_save_in_flight(&self, serialized: &str) -> bool {
        matches!(
            &self.slots[Stage::Draft.index()].request,
            Some((_, Pending::SaveDraft { serialized: sending })) if sending == serialized
        )
    }

    /// Detaches an in-flight draft save of exactly `serialized`, so another
    /// stage can wait on its acknowledgement instead of writing again.
    pub(crate) fn take_draft_save(&mut self, serialized: &str) -> Option<RequestId> {
        if !self.draft_save_in_flight(serialized) {
            return None;
        }
        self.slots[Stage::Draft.index()]
            .request
            .take()
            .map(|(request, _)| request)
    }

    pub(crate) fn draft_regenerable(&self) -> bool {
        match self.status(Stage::Draft) {
            StageStatus::Error => true,
            StageStatus::Review | StageStatus::Ready | StageStatus::Complete => {
                !self.draft_regenerated
            }
            _ => false,
        }
    }

    pub(crate) fn draft_publishable(&self) -> bool {
        matches!(
            self.status(Stage::Draft),
            StageStatus::Review | StageStatus::Ready | StageStatus::Complete
        )
    }

    pub(crate) fn can_navigate_to(&self, stage: Stage) -> bool {
        match stage {
            Stage::Background => true,
            // Headlines are only reached forward, through the background save.
            Stage::Draft => self.status(Stage::Headlines) == StageStatus::Complete,
            Stage::Headlines | Stage::Publish => false,
        }
    }
}
