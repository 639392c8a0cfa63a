use std::sync::Once;

use newsdesk_core::{
    update, Effect, HeaderSlot, Job, JobFailure, JobOutput, Msg, NewsItem, PublicationOutcome,
    PublicationState, PublishTarget, RequestId, Stage, StageStatus, WriterSettings, WriterState,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(newsdesk_logging::initialize_for_tests);
}

fn fresh_item() -> NewsItem {
    NewsItem {
        id: 42,
        headline_raw: "X wins title".to_string(),
        body_raw: "X beat Y in the final.\nThe crowd went wild.".to_string(),
        source_url: "https://news.example.com/x".to_string(),
        ..NewsItem::default()
    }
}

fn run_of(effects: &[Effect]) -> (RequestId, Job) {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::Run { request, job } => Some((*request, job.clone())),
            _ => None,
        })
        .expect("expected a run effect")
}

fn schedule_of(effects: &[Effect]) -> Option<(u64, u64)> {
    effects.iter().find_map(|effect| match effect {
        Effect::Schedule { timer, after_ms } => Some((*timer, *after_ms)),
        _ => None,
    })
}

/// Stage ordering and header consistency hold after every step.
fn check_invariants(state: &WriterState) {
    let background = state.status(Stage::Background);
    let headlines = state.status(Stage::Headlines);
    let draft = state.status(Stage::Draft);
    if matches!(draft, StageStatus::Review | StageStatus::Complete) {
        assert_eq!(headlines, StageStatus::Complete, "draft ahead of headlines");
    }
    if headlines == StageStatus::Complete {
        assert_eq!(background, StageStatus::Complete, "headlines ahead of background");
    }
    let payload = state.payload();
    let number = payload
        .selected_header_number
        .expect("a selected header number");
    let slot = HeaderSlot::new(number).expect("selected number within 1..=4");
    assert_eq!(payload.header, payload.header_text(slot));
}

fn step(state: WriterState, msg: Msg) -> (WriterState, Vec<Effect>) {
    let (state, effects) = update(state, msg);
    check_invariants(&state);
    (state, effects)
}

fn finish(request: RequestId, output: JobOutput) -> Msg {
    Msg::JobFinished {
        request,
        result: Ok(output),
    }
}

#[test]
fn manual_pipeline_runs_from_empty_item_to_published_article() {
    init_logging();
    let state = WriterState::new(fresh_item(), WriterSettings::default());

    let (state, effects) = step(state, Msg::Opened);
    let (request, job) = run_of(&effects);
    assert_eq!(job, Job::GenerateBackground { news_id: 42 });
    assert_eq!(state.status(Stage::Background), StageStatus::Loading);

    let (mut state, mut effects) = step(
        state,
        finish(
            request,
            JobOutput::Background {
                generated: Some("Generated facts".to_string()),
                refreshed: Some("Generated facts".to_string()),
            },
        ),
    );
    assert_eq!(state.status(Stage::Background), StageStatus::Review);
    assert_eq!(state.view().countdown_secs, Some(7));

    // Let the review countdown run out.
    let mut ticks = 0;
    while let Some((timer, _)) = schedule_of(&effects) {
        ticks += 1;
        (state, effects) = step(state, Msg::TimerFired { timer, now_ms: 0 });
    }
    assert_eq!(ticks, 7);
    let (request, job) = run_of(&effects);
    assert_eq!(
        job,
        Job::GenerateHeadlines {
            news_id: 42,
            timeout_ms: 25_000
        }
    );
    assert_eq!(state.status(Stage::Background), StageStatus::Complete);

    let (state, effects) = step(
        state,
        finish(
            request,
            JobOutput::Headlines {
                response: json!({ "result": { "header_2": "X triumphs", "header_3": "", "header_4": "Y stunned" } }),
                snapshot: Some(fresh_item()),
            },
        ),
    );
    assert!(effects.is_empty());
    assert_eq!(state.status(Stage::Headlines), StageStatus::Review);
    let texts: Vec<String> = state
        .view()
        .headline_options
        .into_iter()
        .map(|option| option.text)
        .collect();
    assert_eq!(texts, vec!["X wins title", "X triumphs", "", "Y stunned"]);

    let slot_two = HeaderSlot::new(2).unwrap();
    let (state, effects) = step(state, Msg::HeadlineSelected(slot_two));
    let (request, job) = run_of(&effects);
    let Job::SavePayload { news_id, serialized } = job else {
        panic!("selection must be persisted first");
    };
    assert_eq!(news_id, 42);
    assert!(serialized.contains("\"header\":\"X triumphs\""));
    assert_eq!(state.status(Stage::Draft), StageStatus::Locked);

    let (state, effects) = step(state, finish(request, JobOutput::Saved));
    let (request, job) = run_of(&effects);
    assert_eq!(job, Job::GenerateDraft { news_id: 42 });
    assert_eq!(state.status(Stage::Headlines), StageStatus::Complete);

    let (state, effects) = step(
        state,
        finish(
            request,
            JobOutput::Draft {
                article_payload: Some(json!([{
                    "header": "Generator header",
                    "anons": "Teaser",
                    "paragraph_1": { "role": "paragraph", "opening_html_tag": "<p>", "content": "Lead", "closing_html_tag": "</p>" },
                    "language": "ru"
                }])),
            },
        ),
    );
    assert_eq!(state.status(Stage::Draft), StageStatus::Review);
    assert_eq!(state.payload().header, "X triumphs");
    assert_eq!(state.payload().anons.as_deref(), Some("Teaser"));
    let (request, job) = run_of(&effects);
    assert!(matches!(job, Job::SavePayload { .. }));

    let (state, effects) = step(state, finish(request, JobOutput::Saved));
    assert!(effects.is_empty());

    // Nothing changed since the last save, so publishing skips the write.
    let (state, effects) = step(state, Msg::Publish(PublishTarget::Staging));
    let (request, job) = run_of(&effects);
    assert_eq!(
        job,
        Job::Publish {
            news_id: 42,
            target: PublishTarget::Staging
        }
    );
    assert_eq!(state.status(Stage::Publish), StageStatus::Loading);

    let (mut state, mut effects) = step(
        state,
        finish(
            request,
            JobOutput::Published(PublicationOutcome {
                state: PublicationState::Published,
                external_id: Some("9001".to_string()),
                completed_at_ms: 100_000,
            }),
        ),
    );
    assert_eq!(state.status(Stage::Publish), StageStatus::Review);
    assert_eq!(state.view().publish_remaining_secs, Some(4));

    let mut now_ms = 100_000;
    while let Some((timer, after_ms)) = schedule_of(&effects) {
        assert!(after_ms <= 250);
        now_ms += after_ms;
        (state, effects) = step(state, Msg::TimerFired { timer, now_ms });
    }
    assert_eq!(now_ms, 104_000);

    let view = state.view();
    for stage in Stage::ALL {
        assert_eq!(state.status(stage), StageStatus::Complete);
    }
    assert_eq!(view.active, Stage::Publish);
    assert_eq!(state.payload().header, "X triumphs");
    assert_eq!(
        view.admin_link.as_deref(),
        Some("https://ru-hd-13215.test.b33.io/admin/post/9001/edit")
    );
}

#[test]
fn publish_display_follows_the_wall_clock_deadline() {
    init_logging();
    let state = resumed_state();
    let (state, effects) = update(state, Msg::Publish(PublishTarget::Production));
    let (request, _) = run_of(&effects);
    let (state, effects) = update(
        state,
        finish(
            request,
            JobOutput::Published(PublicationOutcome {
                state: PublicationState::Published,
                external_id: Some("77".to_string()),
                completed_at_ms: 1_000,
            }),
        ),
    );
    let (timer, _) = schedule_of(&effects).unwrap();

    // A single late tick past the deadline completes the stage.
    let (state, effects) = update(state, Msg::TimerFired { timer, now_ms: 60_000 });
    assert!(effects.is_empty());
    assert_eq!(state.status(Stage::Publish), StageStatus::Complete);
    assert_eq!(
        state.view().admin_link.as_deref(),
        Some("https://legalbet.ru/admin/post/77/edit")
    );
}

#[test]
fn headline_timeout_leaves_empty_candidates_for_manual_entry() {
    init_logging();
    let item = NewsItem {
        background: Some("Known facts".to_string()),
        ..fresh_item()
    };
    let (state, _) = update(WriterState::new(item, WriterSettings::default()), Msg::Opened);
    let (state, effects) = update(state, Msg::LaunchHeadlines);
    let (request, _) = run_of(&effects);

    let (state, effects) = update(
        state,
        Msg::JobFinished {
            request,
            result: Err(JobFailure::TimedOut),
        },
    );
    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(state.status(Stage::Headlines), StageStatus::Review);
    assert!(view.stage_error.is_some());
    assert!(view.headline_options[1..].iter().all(|o| o.text.is_empty()));

    // Empty candidates cannot be selected.
    let (state, effects) = update(state, Msg::HeadlineSelected(HeaderSlot::new(3).unwrap()));
    assert!(matches!(effects.as_slice(), [Effect::Alert(_)]));

    // After typing one in, it can.
    let slot = HeaderSlot::new(3).unwrap();
    let (state, _) = update(
        state,
        Msg::HeadlineEdited {
            slot,
            text: "Typed by hand".to_string(),
        },
    );
    let (state, effects) = update(state, Msg::HeadlineSelected(slot));
    assert!(matches!(run_of(&effects).1, Job::SavePayload { .. }));
    assert_eq!(state.payload().header, "Typed by hand");
    assert_eq!(state.payload().selected_header_number, Some(3));
}

#[test]
fn regenerating_edited_headlines_asks_first() {
    init_logging();
    let item = NewsItem {
        background: Some("Known facts".to_string()),
        ..fresh_item()
    };
    let (state, _) = update(WriterState::new(item, WriterSettings::default()), Msg::Opened);
    let (state, effects) = update(state, Msg::LaunchHeadlines);
    let (request, _) = run_of(&effects);
    let (state, _) = update(
        state,
        finish(
            request,
            JobOutput::Headlines {
                response: json!({ "header_2": "Two" }),
                snapshot: None,
            },
        ),
    );
    let (state, _) = update(
        state,
        Msg::HeadlineEdited {
            slot: HeaderSlot::new(2).unwrap(),
            text: "Two, improved".to_string(),
        },
    );

    let (state, effects) = update(state, Msg::RegenerateHeadlines);
    assert_eq!(
        effects,
        vec![Effect::Confirm(newsdesk_core::ConfirmPrompt::DiscardHeadlines)]
    );
    let (state, effects) = update(
        state,
        Msg::Confirmed {
            prompt: newsdesk_core::ConfirmPrompt::DiscardHeadlines,
            accepted: true,
        },
    );
    assert!(matches!(run_of(&effects).1, Job::GenerateHeadlines { .. }));
    assert_eq!(state.status(Stage::Headlines), StageStatus::Loading);
    assert!(!state.view().headlines_edited);
}

#[test]
fn stored_selection_is_kept_when_headlines_load() {
    init_logging();
    let item = NewsItem {
        background: Some("Known facts".to_string()),
        ..fresh_item()
    };
    let (state, _) = update(WriterState::new(item, WriterSettings::default()), Msg::Opened);
    let (state, effects) = update(state, Msg::LaunchHeadlines);
    let (request, _) = run_of(&effects);
    let snapshot = NewsItem {
        headlines: Some(json!({ "header_2": "Two", "header_3": "Three", "header_4": "Four" })),
        article_payload: Some(json!({ "header": "Four", "header_4": "Four", "selected_header_number": 4 })),
        ..fresh_item()
    };

    let (state, effects) = update(
        state,
        finish(
            request,
            JobOutput::Headlines {
                response: json!({}),
                snapshot: Some(snapshot),
            },
        ),
    );
    assert!(matches!(run_of(&effects).1, Job::SavePayload { .. }));
    assert_eq!(state.view().selected_headline.as_deref(), Some("Four"));
    assert_eq!(state.payload().header, "Four");
}

fn resumed_state() -> WriterState {
    let item = NewsItem {
        background: Some("Known facts".to_string()),
        article_payload: Some(json!({
            "header": "Three",
            "header_1": "X wins title",
            "header_2": "Two",
            "header_3": "Three",
            "header_4": "",
            "selected_header_number": 3,
            "anons": "Teaser"
        })),
        ..fresh_item()
    };
    let (state, effects) = update(WriterState::new(item, WriterSettings::default()), Msg::Opened);
    assert!(effects.is_empty());
    state
}
