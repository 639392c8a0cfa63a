use newsdesk_logging::{desk_debug, desk_info, desk_warn};

use crate::body_text::initial_background;
use crate::effect::{
    ConfirmPrompt, Effect, Job, JobFailure, JobOutput, PublicationOutcome, PublicationState,
    RequestId, TimerId,
};
use crate::headlines::{extract_candidates, parse_inbox_headlines, HeaderOptions, HeaderSlot};
use crate::model::{BulletList, NewsItem, Paragraph};
use crate::msg::{DraftEdit, Msg};
use crate::settings::PublishTarget;
use crate::stage::{Stage, StageStatus, StageStatuses};
use crate::state::{AfterBackgroundSave, Pending, PublishDisplay, WriterState};
use crate::wire::WirePayload;

/// Slot chosen on open when a stored payload names no usable selection.
const RESUME_DEFAULT_SLOT: HeaderSlot = HeaderSlot(2);

/// Pure update function: applies a message to the writer and returns effects.
pub fn update(mut state: WriterState, msg: Msg) -> (WriterState, Vec<Effect>) {
    if state.closed {
        return (state, Vec::new());
    }
    let effects = match msg {
        Msg::Opened => open(&mut state),
        Msg::BackgroundEdited(text) => {
            if state.active == Stage::Background && state.status(Stage::Background).is_reviewable()
            {
                state.background_draft = text;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::Hold => {
            hold(&mut state);
            Vec::new()
        }
        Msg::RegenerateBackground => regenerate_background(&mut state),
        Msg::LaunchHeadlines => launch_headlines(&mut state),
        Msg::RegenerateHeadlines => {
            if !headlines_regenerable(&state) {
                Vec::new()
            } else if state.headlines_edited {
                vec![Effect::Confirm(ConfirmPrompt::DiscardHeadlines)]
            } else {
                regenerate_headlines(&mut state)
            }
        }
        Msg::HeadlineEdited { slot, text } => {
            edit_headline(&mut state, slot, text);
            Vec::new()
        }
        Msg::HeadlineSelected(slot) => select_headline(&mut state, slot),
        Msg::DraftEdited(edit) => {
            edit_draft(&mut state, edit);
            Vec::new()
        }
        Msg::RegenerateDraft => regenerate_draft(&mut state),
        Msg::Publish(target) => publish(&mut state, target),
        Msg::AbortPublish => abort_publish(&mut state),
        Msg::NavigateTo(stage) => {
            if !state.can_navigate_to(stage) {
                Vec::new()
            } else if state.is_busy() {
                vec![Effect::Confirm(ConfirmPrompt::InterruptAndNavigate(stage))]
            } else {
                navigate(&mut state, stage)
            }
        }
        Msg::CloseRequested => {
            if state.is_busy() {
                vec![Effect::Confirm(ConfirmPrompt::Close)]
            } else {
                close(&mut state)
            }
        }
        Msg::Confirmed { prompt, accepted } => {
            if !accepted {
                Vec::new()
            } else {
                match prompt {
                    ConfirmPrompt::DiscardHeadlines => regenerate_headlines(&mut state),
                    ConfirmPrompt::InterruptAndNavigate(stage) if state.can_navigate_to(stage) => {
                        navigate(&mut state, stage)
                    }
                    ConfirmPrompt::InterruptAndNavigate(_) => Vec::new(),
                    ConfirmPrompt::Close => close(&mut state),
                }
            }
        }
        Msg::JobFinished { request, result } => job_finished(&mut state, request, result),
        Msg::TimerFired { timer, now_ms } => timer_fired(&mut state, timer, now_ms),
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn open(state: &mut WriterState) -> Vec<Effect> {
    if state.statuses != StageStatuses::default() {
        return Vec::new();
    }
    match state.item.article_payload.as_ref().map(WirePayload::decode) {
        Some(Ok(Some(wire))) => {
            resume_from_payload(state, wire);
            return Vec::new();
        }
        Some(Err(err)) => {
            desk_warn!(
                "Ignoring unreadable article payload of news #{}: {}",
                state.item.id,
                err
            );
        }
        _ => {}
    }

    if let Some(background) = state.item.existing_background().map(str::trim) {
        let background = background.to_string();
        state.background_draft = background.clone();
        state.last_saved_background = Some(background);
        state.background_regenerable = true;
        state.set_status(Stage::Background, StageStatus::Review);
        return Vec::new();
    }

    state.set_status(Stage::Background, StageStatus::Loading);
    let news_id = state.item.id;
    state.run(
        Stage::Background,
        Pending::GenerateBackground,
        Job::GenerateBackground { news_id },
    )
}

fn resume_from_payload(state: &mut WriterState, wire: WirePayload) {
    desk_info!("News #{} already has an article payload; opening the draft", state.item.id);
    let background = state
        .item
        .existing_background()
        .map(|text| text.trim().to_string());
    state.background_draft = background.clone().unwrap_or_default();
    state.last_saved_background = background;
    state.background_regenerable = true;
    state.adopt_payload(wire, RESUME_DEFAULT_SLOT);
    for stage in Stage::ALL {
        state.set_status(stage, StageStatus::Complete);
    }
    state.active = Stage::Draft;
}

fn hold(state: &mut WriterState) {
    let stage = state.active;
    if !matches!(stage, Stage::Background | Stage::Draft) {
        return;
    }
    state.cancel_countdown(stage);
    if state.status(stage) == StageStatus::Review {
        state.set_status(stage, StageStatus::Ready);
    }
}

fn regenerate_background(state: &mut WriterState) -> Vec<Effect> {
    if state.active != Stage::Background
        || !state.background_regenerable
        || !state.status(Stage::Background).is_reviewable()
    {
        return Vec::new();
    }
    let mut effects = state.clear_slot(Stage::Background);
    state.set_stage_error(Stage::Background, None);
    state.set_status(Stage::Background, StageStatus::Loading);
    let news_id = state.item.id;
    effects.extend(state.run(
        Stage::Background,
        Pending::GenerateBackground,
        Job::GenerateBackground { news_id },
    ));
    effects
}

fn background_finished(state: &mut WriterState, result: Result<JobOutput, JobFailure>) -> Vec<Effect> {
    let (generated, refreshed) = match result {
        Ok(JobOutput::Background {
            generated,
            refreshed,
        }) => (generated, refreshed),
        Ok(other) => return background_failed(state, &unexpected(&other)),
        Err(failure) => return background_failed(state, &failure),
    };
    let non_blank = |text: Option<String>| {
        text.map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    };
    let (text, saved) = match (non_blank(refreshed), non_blank(generated)) {
        (Some(text), _) => (text, true),
        (None, Some(text)) => (text, false),
        (None, None) => {
            desk_warn!(
                "Background for news #{} came back empty; using the source text",
                state.item.id
            );
            (initial_background(&state.item), false)
        }
    };
    if saved {
        state.item.background = Some(text.clone());
    }
    state.last_saved_background = saved.then(|| text.clone());
    state.background_draft = text;
    state.background_regenerable = true;
    state.set_stage_error(Stage::Background, None);
    state.set_status(Stage::Background, StageStatus::Review);
    state.start_countdown(Stage::Background)
}

fn background_failed(state: &mut WriterState, failure: &JobFailure) -> Vec<Effect> {
    desk_warn!(
        "Background generation for news #{} failed: {}",
        state.item.id,
        failure
    );
    state.background_draft = initial_background(&state.item);
    state.last_saved_background = None;
    state.background_regenerable = true;
    state.set_stage_error(
        Stage::Background,
        Some("Background generation failed; using the source text.".to_string()),
    );
    state.set_status(Stage::Background, StageStatus::Review);
    Vec::new()
}

fn launch_headlines(state: &mut WriterState) -> Vec<Effect> {
    if state.active != Stage::Background || !state.status(Stage::Background).is_reviewable() {
        return Vec::new();
    }
    state.cancel_countdown(Stage::Background);
    advance_from_background(state, AfterBackgroundSave::LaunchHeadlines)
}

/// Persists the edited background if it changed, then continues with `then`.
fn advance_from_background(state: &mut WriterState, then: AfterBackgroundSave) -> Vec<Effect> {
    let text = state.background_draft.trim().to_string();
    if text.is_empty() {
        if then == AfterBackgroundSave::LaunchHeadlines {
            state.set_status(Stage::Background, StageStatus::Ready);
            return vec![Effect::Alert(
                "The background is empty. Add a few facts before continuing.".to_string(),
            )];
        }
        return continue_after_background(state, then);
    }
    if state.last_saved_background.as_deref() == Some(text.as_str()) {
        return continue_after_background(state, then);
    }

    let stage = match then {
        AfterBackgroundSave::LaunchHeadlines => {
            state.set_status(Stage::Background, StageStatus::Loading);
            Stage::Background
        }
        AfterBackgroundSave::NavigateDraft => Stage::Draft,
    };
    let news_id = state.item.id;
    state.run(
        stage,
        Pending::SaveBackground {
            text: text.clone(),
            then,
        },
        Job::SaveBackground { news_id, text },
    )
}

fn continue_after_background(state: &mut WriterState, then: AfterBackgroundSave) -> Vec<Effect> {
    match then {
        AfterBackgroundSave::LaunchHeadlines => begin_headlines(state, false),
        AfterBackgroundSave::NavigateDraft => {
            let news_id = state.item.id;
            state.run(Stage::Draft, Pending::LoadDraft, Job::LoadItem { news_id })
        }
    }
}

fn background_saved(
    state: &mut WriterState,
    text: String,
    then: AfterBackgroundSave,
    result: Result<JobOutput, JobFailure>,
) -> Vec<Effect> {
    match expect_saved(result) {
        Ok(()) => {
            state.item.background = Some(text.clone());
            state.last_saved_background = Some(text);
            continue_after_background(state, then)
        }
        Err(failure) => {
            desk_warn!("Saving background of news #{} failed: {}", state.item.id, failure);
            match then {
                AfterBackgroundSave::LaunchHeadlines => {
                    state.set_status(Stage::Background, StageStatus::Ready);
                }
                AfterBackgroundSave::NavigateDraft => {
                    state.active = Stage::Background;
                    state.set_status(Stage::Background, StageStatus::Ready);
                    for later in [Stage::Headlines, Stage::Draft, Stage::Publish] {
                        state.set_status(later, StageStatus::Locked);
                    }
                }
            }
            vec![Effect::Alert(format!("Could not save the background: {failure}"))]
        }
    }
}

fn begin_headlines(state: &mut WriterState, regenerate: bool) -> Vec<Effect> {
    state.set_status(Stage::Background, StageStatus::Complete);
    state.set_status(Stage::Headlines, StageStatus::Loading);
    state.set_status(Stage::Draft, StageStatus::Locked);
    state.set_status(Stage::Publish, StageStatus::Locked);
    state.set_stage_error(Stage::Headlines, None);
    state.active = Stage::Headlines;
    let news_id = state.item.id;
    let timeout_ms = state.settings.headlines_timeout_ms;
    state.run(
        Stage::Headlines,
        Pending::GenerateHeadlines { regenerate },
        Job::GenerateHeadlines {
            news_id,
            timeout_ms,
        },
    )
}

fn headlines_regenerable(state: &WriterState) -> bool {
    state.active == Stage::Headlines
        && !matches!(
            state.status(Stage::Headlines),
            StageStatus::Locked | StageStatus::Loading
        )
}

fn regenerate_headlines(state: &mut WriterState) -> Vec<Effect> {
    if !headlines_regenerable(state) {
        return Vec::new();
    }
    state.selected = None;
    state.headlines_edited = false;
    let mut effects = state.clear_slot(Stage::Headlines);
    effects.extend(state.clear_slot(Stage::Draft));
    effects.extend(state.clear_slot(Stage::Publish));
    effects.extend(begin_headlines(state, true));
    effects
}

fn headlines_finished(
    state: &mut WriterState,
    regenerate: bool,
    result: Result<JobOutput, JobFailure>,
) -> Vec<Effect> {
    let (response, snapshot) = match result {
        Ok(JobOutput::Headlines { response, snapshot }) => (response, snapshot),
        Ok(other) => return headlines_failed(state, &unexpected(&other)),
        Err(failure) => return headlines_failed(state, &failure),
    };
    if let Some(snapshot) = &snapshot {
        state.item.headlines = snapshot.headlines.clone();
    }
    let inbox = parse_inbox_headlines(state.item.headlines.as_ref());
    let generated = extract_candidates(&response);
    state.options = HeaderOptions::resolve(&state.item.headline_raw, inbox.as_ref(), Some(&generated));
    state.headlines_edited = false;
    state.set_stage_error(Stage::Headlines, None);

    let prior = if regenerate {
        None
    } else {
        prior_selection(state, snapshot.as_ref())
    };
    match prior {
        Some(slot) => {
            desk_info!(
                "News #{} keeps previously selected headline {}",
                state.item.id,
                slot.number()
            );
            commit_selection(state, slot)
        }
        None => {
            state.selected = None;
            state.set_status(Stage::Headlines, StageStatus::Review);
            Vec::new()
        }
    }
}

/// A selection made in an earlier run: the stored payload's, else the local one.
fn prior_selection(state: &WriterState, snapshot: Option<&NewsItem>) -> Option<HeaderSlot> {
    let usable = |slot: HeaderSlot| slot.is_selectable() && !state.options.is_empty_at(slot);
    let stored = snapshot
        .and_then(|item| item.article_payload.as_ref())
        .and_then(|raw| WirePayload::decode(raw).ok().flatten())
        .and_then(|wire| {
            wire.payload
                .selected_header_number
                .and_then(HeaderSlot::new)
                .filter(|slot| usable(*slot))
                .or_else(|| state.options.find_slot_matching(&wire.payload.header))
        });
    stored.or(state.selected.filter(|slot| usable(*slot)))
}

fn headlines_failed(state: &mut WriterState, failure: &JobFailure) -> Vec<Effect> {
    desk_warn!(
        "Headline generation for news #{} failed: {}",
        state.item.id,
        failure
    );
    state.options = HeaderOptions::with_original(&state.item.headline_raw);
    state.selected = None;
    state.headlines_edited = false;
    state.set_stage_error(
        Stage::Headlines,
        Some(format!(
            "Headline generation failed ({failure}). Fill in the candidates by hand or regenerate."
        )),
    );
    state.set_status(Stage::Headlines, StageStatus::Review);
    Vec::new()
}

fn edit_headline(state: &mut WriterState, slot: HeaderSlot, text: String) {
    if state.active != Stage::Headlines
        || !matches!(
            state.status(Stage::Headlines),
            StageStatus::Review | StageStatus::Ready | StageStatus::Complete
        )
    {
        return;
    }
    if !state.options.set(slot, text) {
        return;
    }
    state.headlines_edited = true;
    if state.status(Stage::Headlines) == StageStatus::Complete {
        // The committed selection no longer matches the candidates.
        state.set_status(Stage::Headlines, StageStatus::Review);
        state.set_status(Stage::Draft, StageStatus::Locked);
        state.set_status(Stage::Publish, StageStatus::Locked);
    }
    state.mark_dirty();
}

fn select_headline(state: &mut WriterState, slot: HeaderSlot) -> Vec<Effect> {
    if state.active != Stage::Headlines
        || !slot.is_selectable()
        || !matches!(
            state.status(Stage::Headlines),
            StageStatus::Review | StageStatus::Ready | StageStatus::Complete
        )
    {
        return Vec::new();
    }
    if state.options.is_empty_at(slot) {
        return vec![Effect::Alert(format!(
            "Headline {} is empty. Fill it in or pick another one.",
            slot.number()
        ))];
    }
    commit_selection(state, slot)
}

/// Writes the headers into the payload and persists it before the draft starts.
fn commit_selection(state: &mut WriterState, slot: HeaderSlot) -> Vec<Effect> {
    let chosen = state.payload.apply_header_options(&state.options, slot);
    state.selected = Some(chosen);
    state.mark_dirty();
    let Some(serialized) = state.serialize_payload() else {
        state.set_status(Stage::Headlines, StageStatus::Review);
        return vec![Effect::Alert(
            "The article could not be prepared for saving.".to_string(),
        )];
    };
    if state.last_saved_payload.as_deref() == Some(serialized.as_str()) {
        return begin_draft(state, false);
    }
    state.set_status(Stage::Headlines, StageStatus::Loading);
    let news_id = state.item.id;
    state.run(
        Stage::Headlines,
        Pending::SaveSelection {
            serialized: serialized.clone(),
        },
        Job::SavePayload {
            news_id,
            serialized,
        },
    )
}

fn selection_saved(
    state: &mut WriterState,
    serialized: String,
    result: Result<JobOutput, JobFailure>,
) -> Vec<Effect> {
    match expect_saved(result) {
        Ok(()) => {
            state.last_saved_payload = Some(serialized);
            begin_draft(state, false)
        }
        Err(failure) => {
            state.set_status(Stage::Headlines, StageStatus::Review);
            vec![Effect::Alert(format!(
                "Could not save the selected headline: {failure}"
            ))]
        }
    }
}

fn begin_draft(state: &mut WriterState, regenerate: bool) -> Vec<Effect> {
    state.set_status(Stage::Headlines, StageStatus::Complete);
    state.set_status(Stage::Draft, StageStatus::Loading);
    state.set_status(Stage::Publish, StageStatus::Locked);
    state.set_stage_error(Stage::Draft, None);
    state.active = Stage::Draft;
    let news_id = state.item.id;
    state.run(
        Stage::Draft,
        Pending::GenerateDraft { regenerate },
        Job::GenerateDraft { news_id },
    )
}

fn draft_finished(
    state: &mut WriterState,
    regenerate: bool,
    result: Result<JobOutput, JobFailure>,
) -> Vec<Effect> {
    let decoded = match result {
        Ok(JobOutput::Draft { article_payload }) => {
            match article_payload.as_ref().map(WirePayload::decode) {
                Some(Ok(Some(wire))) => Ok(wire),
                Some(Err(err)) => Err(JobFailure::Failed(err.to_string())),
                _ => Err(JobFailure::Failed(
                    "the generator returned no article text".to_string(),
                )),
            }
        }
        Ok(other) => Err(unexpected(&other)),
        Err(failure) => Err(failure),
    };
    let wire = match decoded {
        Ok(wire) => wire,
        Err(failure) => {
            desk_warn!(
                "Article generation for news #{} failed: {}",
                state.item.id,
                failure
            );
            let message = format!("Article text generation failed: {failure}");
            state.set_stage_error(Stage::Draft, Some(message.clone()));
            state.set_status(Stage::Draft, StageStatus::Error);
            return vec![Effect::Alert(message)];
        }
    };

    if state.shape.is_none() {
        state.shape = Some(wire.shape);
    }
    state.payload.merge_draft_body(wire.payload);
    if regenerate {
        state.draft_regenerated = true;
    }
    let status = if state.selected.is_some() {
        StageStatus::Review
    } else {
        StageStatus::Ready
    };
    state.set_status(Stage::Draft, status);

    let mut effects = persist_draft(state);
    if status == StageStatus::Review && state.settings.auto_publish_draft {
        effects.extend(state.start_countdown(Stage::Draft));
    }
    effects
}

/// Saves the draft unless the backend already holds exactly this text.
fn persist_draft(state: &mut WriterState) -> Vec<Effect> {
    let Some(serialized) = state.serialize_payload() else {
        return Vec::new();
    };
    if state.last_saved_payload.as_deref() == Some(serialized.as_str())
        || state.draft_save_in_flight(&serialized)
    {
        return Vec::new();
    }
    let news_id = state.item.id;
    state.run(
        Stage::Draft,
        Pending::SaveDraft {
            serialized: serialized.clone(),
        },
        Job::SavePayload {
            news_id,
            serialized,
        },
    )
}

fn edit_draft(state: &mut WriterState, edit: DraftEdit) {
    if state.active != Stage::Draft
        || matches!(
            state.status(Stage::Draft),
            StageStatus::Locked | StageStatus::Loading
        )
    {
        return;
    }
    let payload = &mut state.payload;
    match edit {
        DraftEdit::Anons(text) => payload.anons = Some(text),
        DraftEdit::Paragraph1(text) => {
            payload.paragraph_1.get_or_insert_with(Paragraph::empty).content = text;
        }
        DraftEdit::Quote(text) => payload.set_quote_text(&text),
        DraftEdit::Paragraph3(text) => {
            payload.paragraph_3.get_or_insert_with(Paragraph::empty).content = text;
        }
        DraftEdit::BackgroundItem { index, text } => {
            if let Some(item) = payload
                .background
                .as_mut()
                .and_then(|list| list.items.get_mut(index))
            {
                *item = text;
            }
        }
        DraftEdit::AddBackgroundItem => {
            payload
                .background
                .get_or_insert_with(BulletList::empty)
                .items
                .push(String::new());
        }
        DraftEdit::RemoveBackgroundItem(index) => {
            if let Some(list) = payload.background.as_mut() {
                if index < list.items.len() {
                    list.items.remove(index);
                }
            }
        }
    }
    state.mark_dirty();
}

fn regenerate_draft(state: &mut WriterState) -> Vec<Effect> {
    if state.active != Stage::Draft || state.is_busy() || !state.draft_regenerable() {
        return Vec::new();
    }
    let mut effects = state.clear_slot(Stage::Draft);
    effects.extend(state.clear_slot(Stage::Publish));
    effects.extend(begin_draft(state, true));
    effects
}

fn publish(state: &mut WriterState, target: PublishTarget) -> Vec<Effect> {
    if state.active != Stage::Draft || state.is_busy() || !state.draft_publishable() {
        return Vec::new();
    }
    let Some(slot) = state.payload.selected_slot() else {
        return vec![Effect::Alert(
            "Choose a non-empty headline before publishing.".to_string(),
        )];
    };
    state.payload.header = state.payload.header_text(slot).to_string();
    state.selected = Some(slot);
    state.cancel_countdown(Stage::Draft);
    state.set_stage_error(Stage::Publish, None);

    let Some(serialized) = state.serialize_payload() else {
        return vec![Effect::Alert(
            "The article could not be prepared for saving.".to_string(),
        )];
    };
    if state.last_saved_payload.as_deref() == Some(serialized.as_str()) {
        return begin_publish(state, target);
    }
    state.set_status(Stage::Publish, StageStatus::Loading);
    if let Some(request) = state.take_draft_save(&serialized) {
        // The draft save already carries these bytes; publish on its ack.
        let effects = state.clear_slot(Stage::Publish);
        state.slots[Stage::Publish.index()].request =
            Some((request, Pending::SaveBeforePublish { serialized, target }));
        return effects;
    }
    let news_id = state.item.id;
    state.run(
        Stage::Publish,
        Pending::SaveBeforePublish {
            serialized: serialized.clone(),
            target,
        },
        Job::SavePayload {
            news_id,
            serialized,
        },
    )
}

fn begin_publish(state: &mut WriterState, target: PublishTarget) -> Vec<Effect> {
    for stage in [Stage::Background, Stage::Headlines, Stage::Draft] {
        state.set_status(stage, StageStatus::Complete);
    }
    state.set_status(Stage::Publish, StageStatus::Loading);
    state.active = Stage::Publish;
    state.publish_target = Some(target);
    state.external_id = None;
    state.status_message = None;
    desk_info!("Publishing news #{} to {:?}", state.item.id, target);
    let news_id = state.item.id;
    state.run(
        Stage::Publish,
        Pending::Publish(target),
        Job::Publish { news_id, target },
    )
}

fn publish_saved(
    state: &mut WriterState,
    serialized: String,
    target: PublishTarget,
    result: Result<JobOutput, JobFailure>,
) -> Vec<Effect> {
    match expect_saved(result) {
        Ok(()) => {
            state.last_saved_payload = Some(serialized);
            begin_publish(state, target)
        }
        Err(failure) => {
            state.set_status(Stage::Publish, StageStatus::Locked);
            state.set_status(Stage::Draft, StageStatus::Ready);
            vec![Effect::Alert(format!(
                "Could not save the article before publishing: {failure}"
            ))]
        }
    }
}

fn publish_finished(state: &mut WriterState, result: Result<JobOutput, JobFailure>) -> Vec<Effect> {
    let outcome = match result {
        Ok(JobOutput::Published(outcome)) => outcome,
        Ok(other) => return publish_failed(state, unexpected(&other).to_string()),
        Err(failure) => return publish_failed(state, publication_error(&failure)),
    };
    let PublicationOutcome {
        state: publication,
        external_id,
        completed_at_ms,
    } = outcome;
    match (publication, external_id) {
        (PublicationState::Published, Some(external_id)) => {
            desk_info!(
                "News #{} published with external id {}",
                state.item.id,
                external_id
            );
            state.external_id = Some(external_id);
            let display_ms = state.settings.publish_display_ms;
            if display_ms == 0 {
                finish_publication(state);
                return Vec::new();
            }
            state.publish_display = Some(PublishDisplay {
                deadline_ms: completed_at_ms.saturating_add(display_ms),
                remaining_ms: display_ms,
            });
            state.set_status(Stage::Publish, StageStatus::Review);
            let tick = state.settings.publish_tick_ms.clamp(1, display_ms);
            vec![state.schedule(Stage::Publish, tick)]
        }
        (PublicationState::Published, None) => {
            publish_failed(state, "The publication has no external id.".to_string())
        }
        (PublicationState::Failed, _) => {
            publish_failed(state, "The backend reported the publication as failed.".to_string())
        }
        (PublicationState::Pending, _) => publish_failed(
            state,
            "The publication did not finish in time.".to_string(),
        ),
    }
}

fn publication_error(failure: &JobFailure) -> String {
    match failure {
        JobFailure::PayloadAssemblyFailed => {
            "The publication was generated but payload assembly failed.".to_string()
        }
        JobFailure::TimedOut => "The publication did not finish in time.".to_string(),
        other => format!("Publication failed: {other}"),
    }
}

fn publish_failed(state: &mut WriterState, message: String) -> Vec<Effect> {
    desk_warn!("Publishing news #{} failed: {}", state.item.id, message);
    let mut effects = state.clear_slot(Stage::Publish);
    state.set_stage_error(Stage::Publish, Some(message.clone()));
    state.set_status(Stage::Publish, StageStatus::Error);
    state.set_status(Stage::Draft, StageStatus::Ready);
    state.active = Stage::Draft;
    state.set_message(message.clone());
    effects.push(Effect::Alert(message));
    effects
}

fn publish_tick(state: &mut WriterState, now_ms: u64) -> Vec<Effect> {
    let Some(mut display) = state.publish_display else {
        return Vec::new();
    };
    if now_ms >= display.deadline_ms {
        finish_publication(state);
        return Vec::new();
    }
    display.remaining_ms = display.deadline_ms - now_ms;
    state.publish_display = Some(display);
    state.mark_dirty();
    let tick = state
        .settings
        .publish_tick_ms
        .clamp(1, display.remaining_ms);
    vec![state.schedule(Stage::Publish, tick)]
}

fn finish_publication(state: &mut WriterState) {
    state.publish_display = None;
    for stage in Stage::ALL {
        state.set_status(stage, StageStatus::Complete);
    }
    let link = match (state.publish_target, &state.external_id) {
        (Some(target), Some(id)) => state.settings.admin_links.edit_link(target, id),
        _ => String::new(),
    };
    state.set_message(format!("Published. Admin link: {link}"));
}

fn abort_publish(state: &mut WriterState) -> Vec<Effect> {
    if state.status(Stage::Publish) != StageStatus::Loading {
        return Vec::new();
    }
    desk_info!("Publication of news #{} aborted", state.item.id);
    let effects = state.clear_slot(Stage::Publish);
    state.set_status(Stage::Publish, StageStatus::Locked);
    state.set_status(Stage::Draft, StageStatus::Ready);
    state.active = Stage::Draft;
    state.set_message("Publication aborted.");
    effects
}

fn navigate(state: &mut WriterState, stage: Stage) -> Vec<Effect> {
    let mut effects = state.clear_all_slots();
    state.stage_errors = Default::default();
    state.status_message = None;
    state.mark_dirty();
    match stage {
        Stage::Background => {
            state.set_status(Stage::Background, StageStatus::Ready);
            for later in [Stage::Headlines, Stage::Draft, Stage::Publish] {
                state.set_status(later, StageStatus::Locked);
            }
            state.background_regenerable = true;
            state.active = Stage::Background;
        }
        Stage::Draft => {
            state.set_status(Stage::Background, StageStatus::Complete);
            state.set_status(Stage::Headlines, StageStatus::Complete);
            state.set_status(Stage::Draft, StageStatus::Loading);
            state.set_status(Stage::Publish, StageStatus::Locked);
            state.active = Stage::Draft;
            effects.extend(advance_from_background(
                state,
                AfterBackgroundSave::NavigateDraft,
            ));
        }
        Stage::Headlines | Stage::Publish => {}
    }
    effects
}

fn draft_loaded(state: &mut WriterState, result: Result<JobOutput, JobFailure>) -> Vec<Effect> {
    let item = match result {
        Ok(JobOutput::Item(item)) => item,
        Ok(other) => return draft_reload_failed(state, &unexpected(&other)),
        Err(failure) => return draft_reload_failed(state, &failure),
    };
    let stored = item.article_payload.clone();
    state.item = item;
    state.draft_regenerated = false;
    match stored.as_ref().map(WirePayload::decode) {
        Some(Ok(Some(wire))) => {
            state.adopt_payload(wire, HeaderSlot::ORIGINAL);
            let status = if state.selected.is_some() {
                StageStatus::Review
            } else {
                StageStatus::Ready
            };
            state.set_status(Stage::Draft, status);
        }
        Some(Err(err)) => {
            desk_warn!("Stored payload of news #{} is unreadable: {}", state.item.id, err);
            state.set_message(format!("The stored article could not be read: {err}"));
            state.set_status(Stage::Draft, StageStatus::Ready);
        }
        _ => {
            state.set_message("No article text yet. Regenerate the draft to create it.");
            state.set_status(Stage::Draft, StageStatus::Ready);
        }
    }
    Vec::new()
}

fn draft_reload_failed(state: &mut WriterState, failure: &JobFailure) -> Vec<Effect> {
    desk_warn!("Reloading news #{} failed: {}", state.item.id, failure);
    state.set_message(format!("Could not reload the article: {failure}"));
    state.set_status(Stage::Draft, StageStatus::Ready);
    Vec::new()
}

fn draft_saved(
    state: &mut WriterState,
    serialized: String,
    result: Result<JobOutput, JobFailure>,
) -> Vec<Effect> {
    match expect_saved(result) {
        Ok(()) => state.last_saved_payload = Some(serialized),
        Err(failure) => {
            desk_warn!("Saving draft of news #{} failed: {}", state.item.id, failure);
            state.set_message(format!("The draft could not be saved: {failure}"));
        }
    }
    Vec::new()
}

fn close(state: &mut WriterState) -> Vec<Effect> {
    let mut effects = state.clear_all_slots();
    state.closed = true;
    state.mark_dirty();
    effects.push(Effect::Closed);
    effects
}

fn job_finished(
    state: &mut WriterState,
    request: RequestId,
    result: Result<JobOutput, JobFailure>,
) -> Vec<Effect> {
    let Some((stage, pending)) = state.take_pending(request) else {
        desk_debug!("Dropping stale result of request {}", request);
        return Vec::new();
    };
    if result == Err(JobFailure::Aborted) {
        desk_debug!("Request {} for {} was aborted", request, stage.label());
        if state.status(stage) == StageStatus::Loading {
            state.set_status(stage, StageStatus::Ready);
        }
        return Vec::new();
    }
    match pending {
        Pending::GenerateBackground => background_finished(state, result),
        Pending::SaveBackground { text, then } => background_saved(state, text, then, result),
        Pending::GenerateHeadlines { regenerate } => headlines_finished(state, regenerate, result),
        Pending::SaveSelection { serialized } => selection_saved(state, serialized, result),
        Pending::GenerateDraft { regenerate } => draft_finished(state, regenerate, result),
        Pending::SaveDraft { serialized } => draft_saved(state, serialized, result),
        Pending::SaveBeforePublish { serialized, target } => {
            publish_saved(state, serialized, target, result)
        }
        Pending::Publish(_) => publish_finished(state, result),
        Pending::LoadDraft => draft_loaded(state, result),
    }
}

fn timer_fired(state: &mut WriterState, timer: TimerId, now_ms: u64) -> Vec<Effect> {
    let Some(stage) = state.take_timer(timer) else {
        desk_debug!("Ignoring superseded timer {}", timer);
        return Vec::new();
    };
    match stage {
        Stage::Publish => publish_tick(state, now_ms),
        Stage::Background | Stage::Draft => countdown_tick(state, stage),
        Stage::Headlines => Vec::new(),
    }
}

fn countdown_tick(state: &mut WriterState, stage: Stage) -> Vec<Effect> {
    let Some(mut countdown) = state.countdown.filter(|c| c.stage == stage) else {
        return Vec::new();
    };
    countdown.remaining_secs = countdown.remaining_secs.saturating_sub(1);
    state.mark_dirty();
    if countdown.remaining_secs > 0 {
        state.countdown = Some(countdown);
        return vec![state.schedule(stage, 1_000)];
    }
    state.countdown = None;
    match stage {
        Stage::Background => launch_headlines(state),
        Stage::Draft => publish(state, PublishTarget::Staging),
        _ => Vec::new(),
    }
}

fn expect_saved(result: Result<JobOutput, JobFailure>) -> Result<(), JobFailure> {
    match result {
        Ok(JobOutput::Saved) => Ok(()),
        Ok(other) => Err(unexpected(&other)),
        Err(failure) => Err(failure),
    }
}

fn unexpected(output: &JobOutput) -> JobFailure {
    desk_warn!("Unexpected job output: {:?}", output);
    JobFailure::Failed("unexpected response from the engine".to_string())
}
