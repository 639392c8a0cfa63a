use newsdesk_core::{
    update, DraftEdit, Effect, Job, JobFailure, JobOutput, Msg, NewsItem, PublishTarget,
    RequestId, Stage, StageStatus, WriterSettings, WriterState,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn run_of(effects: &[Effect]) -> (RequestId, Job) {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::Run { request, job } => Some((*request, job.clone())),
            _ => None,
        })
        .expect("expected a run effect")
}

fn stored_payload() -> Value {
    json!({
        "header": "Third take",
        "header_1": "Original",
        "header_2": "Second take",
        "header_3": "Third take",
        "header_4": "",
        "selected_header_number": 3,
        "anons": "Stored teaser",
        "paragraph_2": { "role": "quote", "opening_html_tag": "<div class=\"quote-block\"><p>", "content": ["One", "Two"], "closing_html_tag": "</p></div>" },
        "source": "https://src.example.com",
        "language": "ru",
        "seo_slug": "kept-as-is"
    })
}

fn item_with(payload: Value) -> NewsItem {
    NewsItem {
        id: 11,
        headline_raw: "Original".to_string(),
        background: Some("Facts".to_string()),
        article_payload: Some(payload),
        ..NewsItem::default()
    }
}

fn open(item: NewsItem) -> (WriterState, Vec<Effect>) {
    update(WriterState::new(item, WriterSettings::default()), Msg::Opened)
}

#[test]
fn existing_payload_opens_completed_draft_without_generation() {
    let (state, effects) = open(item_with(stored_payload()));

    assert!(effects.is_empty());
    assert_eq!(state.active_stage(), Stage::Draft);
    for stage in Stage::ALL {
        assert_eq!(state.status(stage), StageStatus::Complete);
    }
    let view = state.view();
    assert_eq!(view.selected_headline.as_deref(), Some("Third take"));
    assert_eq!(view.payload.quote_text(), "One\n\nTwo");
    assert!(view.can_publish);
    assert!(view.can_regenerate_draft);
}

#[test]
fn array_payload_is_written_back_as_array() {
    let (state, _) = open(item_with(Value::Array(vec![stored_payload()])));
    let (state, _) = update(state, Msg::DraftEdited(DraftEdit::Anons("New teaser".to_string())));

    let (_, effects) = update(state, Msg::Publish(PublishTarget::Staging));
    let (_, job) = run_of(&effects);
    let Job::SavePayload { serialized, .. } = job else {
        panic!("an edited draft is saved before publishing");
    };
    let written: Value = serde_json::from_str(&serialized).unwrap();
    assert_eq!(written[0]["anons"], "New teaser");
    assert_eq!(written[0]["seo_slug"], "kept-as-is");
    assert_eq!(written[0]["header"], "Third take");
}

#[test]
fn payload_text_form_is_accepted() {
    let text = Value::String(stored_payload().to_string());
    let (state, effects) = open(item_with(text));
    assert!(effects.is_empty());
    assert_eq!(state.active_stage(), Stage::Draft);
}

#[test]
fn inconsistent_stored_selection_is_repaired() {
    let payload = json!({
        "header": "Second take",
        "header_1": "Original",
        "header_2": "Second take",
        "header_3": "",
        "selected_header_number": 3
    });
    let (state, _) = open(item_with(payload));
    assert_eq!(state.payload().selected_header_number, Some(2));
    assert_eq!(state.payload().header, "Second take");
}

#[test]
fn stored_payload_without_selection_opens_on_second_headline() {
    let payload = json!({
        "header": "",
        "header_1": "Original",
        "header_2": "Second take",
        "header_3": "Third take"
    });
    let (state, effects) = open(item_with(payload));
    assert!(effects.is_empty());
    assert_eq!(state.payload().selected_header_number, Some(2));
    assert_eq!(state.payload().header, "Second take");
    assert_eq!(state.view().selected_headline.as_deref(), Some("Second take"));
}

#[test]
fn stored_payload_without_usable_second_headline_opens_on_original() {
    let payload = json!({ "header": "", "header_2": "", "anons": "Teaser" });
    let (state, _) = open(item_with(payload));
    assert_eq!(state.payload().selected_header_number, Some(1));
    assert_eq!(state.payload().header, "Original");
}

#[test]
fn reloaded_payload_without_selection_keeps_original_headline() {
    let (state, _) = open(item_with(stored_payload()));
    let (state, effects) = update(state, Msg::NavigateTo(Stage::Draft));
    let (request, _) = run_of(&effects);

    let mut unselected = stored_payload();
    unselected["header"] = json!("");
    unselected.as_object_mut().unwrap().remove("selected_header_number");
    let (state, _) = update(
        state,
        Msg::JobFinished {
            request,
            result: Ok(JobOutput::Item(item_with(unselected))),
        },
    );
    assert_eq!(state.payload().selected_header_number, Some(1));
    assert_eq!(state.payload().header, "Original");
}

#[test]
fn publishing_while_the_draft_save_runs_writes_once() {
    let (state, _) = open(item_with(stored_payload()));
    let (state, effects) = update(state, Msg::RegenerateDraft);
    let (request, _) = run_of(&effects);
    let (state, effects) = update(
        state,
        Msg::JobFinished {
            request,
            result: Ok(JobOutput::Draft {
                article_payload: Some(json!({ "anons": "Fresh teaser" })),
            }),
        },
    );
    let (save_request, job) = run_of(&effects);
    assert!(matches!(job, Job::SavePayload { .. }));
    assert_eq!(state.status(Stage::Draft), StageStatus::Review);

    // Same bytes are already on their way; no second write goes out.
    let (state, effects) = update(state, Msg::Publish(PublishTarget::Staging));
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::Run { .. } | Effect::Cancel { .. })));
    assert_eq!(state.status(Stage::Publish), StageStatus::Loading);

    let (state, effects) = update(
        state,
        Msg::JobFinished {
            request: save_request,
            result: Ok(JobOutput::Saved),
        },
    );
    assert_eq!(
        run_of(&effects).1,
        Job::Publish {
            news_id: 11,
            target: PublishTarget::Staging
        }
    );
    assert_eq!(state.active_stage(), Stage::Publish);
}

#[test]
fn returning_to_draft_reloads_the_stored_payload() {
    let (state, _) = open(item_with(stored_payload()));

    let (state, effects) = update(state, Msg::NavigateTo(Stage::Draft));
    let (request, job) = run_of(&effects);
    assert_eq!(job, Job::LoadItem { news_id: 11 });
    assert_eq!(state.status(Stage::Draft), StageStatus::Loading);

    let mut changed = stored_payload();
    changed["anons"] = json!("Edited elsewhere");
    changed["selected_header_number"] = json!(2);
    changed["header"] = json!("Second take");
    let (state, effects) = update(
        state,
        Msg::JobFinished {
            request,
            result: Ok(JobOutput::Item(item_with(Value::Array(vec![changed])))),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.status(Stage::Draft), StageStatus::Review);
    let view = state.view();
    assert_eq!(view.payload.anons.as_deref(), Some("Edited elsewhere"));
    assert_eq!(view.selected_headline.as_deref(), Some("Second take"));

    // The reloaded shape is what gets written next.
    let (state, _) = update(state, Msg::DraftEdited(DraftEdit::Paragraph3("Closing".to_string())));
    let (_, effects) = update(state, Msg::Publish(PublishTarget::Production));
    let Job::SavePayload { serialized, .. } = run_of(&effects).1 else {
        panic!("edited draft must be saved");
    };
    assert!(serialized.starts_with('['));
}

#[test]
fn returning_to_draft_without_stored_text_offers_regeneration() {
    let (state, _) = open(item_with(stored_payload()));
    let (state, effects) = update(state, Msg::NavigateTo(Stage::Draft));
    let (request, _) = run_of(&effects);

    let bare = NewsItem {
        article_payload: None,
        ..item_with(Value::Null)
    };
    let (state, _) = update(
        state,
        Msg::JobFinished {
            request,
            result: Ok(JobOutput::Item(bare)),
        },
    );
    let view = state.view();
    assert_eq!(state.status(Stage::Draft), StageStatus::Ready);
    assert!(view.status_message.is_some());
    assert!(view.can_regenerate_draft);
}

#[test]
fn draft_regeneration_is_offered_once() {
    let (state, _) = open(item_with(stored_payload()));
    let (state, effects) = update(state, Msg::RegenerateDraft);
    let (request, job) = run_of(&effects);
    assert_eq!(job, Job::GenerateDraft { news_id: 11 });

    let (state, _) = update(
        state,
        Msg::JobFinished {
            request,
            result: Ok(JobOutput::Draft {
                article_payload: Some(json!({ "anons": "Fresh teaser" })),
            }),
        },
    );
    assert_eq!(state.status(Stage::Draft), StageStatus::Review);
    assert_eq!(state.payload().header, "Third take");
    assert!(!state.view().can_regenerate_draft);

    let (_, effects) = update(state, Msg::RegenerateDraft);
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::Run { .. })));
}

#[test]
fn failed_draft_generation_allows_retry() {
    let (state, _) = open(item_with(stored_payload()));
    let (state, effects) = update(state, Msg::RegenerateDraft);
    let (request, _) = run_of(&effects);

    let (state, effects) = update(
        state,
        Msg::JobFinished {
            request,
            result: Err(JobFailure::Failed("HTTP 503".to_string())),
        },
    );
    assert!(matches!(effects.as_slice(), [Effect::Alert(_)]));
    assert_eq!(state.status(Stage::Draft), StageStatus::Error);
    assert!(state.view().can_regenerate_draft);

    let (_, effects) = update(state, Msg::RegenerateDraft);
    assert!(matches!(run_of(&effects).1, Job::GenerateDraft { .. }));
}

#[test]
fn null_generated_payload_is_a_draft_error() {
    let (state, _) = open(item_with(stored_payload()));
    let (state, effects) = update(state, Msg::RegenerateDraft);
    let (request, _) = run_of(&effects);
    let (state, _) = update(
        state,
        Msg::JobFinished {
            request,
            result: Ok(JobOutput::Draft {
                article_payload: Some(Value::Null),
            }),
        },
    );
    assert_eq!(state.status(Stage::Draft), StageStatus::Error);
}

#[test]
fn auto_publish_countdown_publishes_to_staging() {
    let settings = WriterSettings {
        review_delay_secs: 2,
        auto_publish_draft: true,
        ..WriterSettings::default()
    };
    let (state, _) = update(
        WriterState::new(item_with(stored_payload()), settings),
        Msg::Opened,
    );
    let (state, effects) = update(state, Msg::RegenerateDraft);
    let (request, _) = run_of(&effects);
    let (mut state, mut effects) = update(
        state,
        Msg::JobFinished {
            request,
            result: Ok(JobOutput::Draft {
                article_payload: Some(json!({ "anons": "Auto" })),
            }),
        },
    );
    assert_eq!(state.view().countdown_secs, Some(2));

    // The draft save finishes first.
    let (save_request, _) = run_of(&effects);
    (state, _) = update(
        state,
        Msg::JobFinished {
            request: save_request,
            result: Ok(JobOutput::Saved),
        },
    );

    for _ in 0..2 {
        let timer = effects
            .iter()
            .find_map(|effect| match effect {
                Effect::Schedule { timer, .. } => Some(*timer),
                _ => None,
            })
            .expect("countdown tick");
        (state, effects) = update(state, Msg::TimerFired { timer, now_ms: 0 });
    }
    assert_eq!(
        run_of(&effects).1,
        Job::Publish {
            news_id: 11,
            target: PublishTarget::Staging
        }
    );
    assert_eq!(state.status(Stage::Publish), StageStatus::Loading);
}
