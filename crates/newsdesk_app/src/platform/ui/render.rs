use std::fmt::Write;

use chrono::{DateTime, Local, Utc};
use newsdesk_core::{ArticlePayload, ProcessingMap, ProcessingStatus, Stage, StageStatus, WriterView};
use newsdesk_logging::format_elapsed;

/// Full-screen text for the writer.
pub(crate) fn render(view: &WriterView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "News #{}: {}", view.news_id, view.title);
    let _ = writeln!(out, "{}", stage_bar(view));
    out.push('\n');

    match view.active {
        Stage::Background => render_background(&mut out, view),
        Stage::Headlines => render_headlines(&mut out, view),
        Stage::Draft => render_draft(&mut out, &view.payload),
        Stage::Publish => render_publish(&mut out, view),
    }

    if let Some(secs) = view.countdown_secs {
        let _ = writeln!(out, "\nContinuing in {secs} s (hold to stop).");
    }
    if let Some(error) = &view.stage_error {
        let _ = writeln!(out, "\nError: {error}");
    }
    if let Some(message) = &view.status_message {
        let _ = writeln!(out, "\n{message}");
    }
    out
}

fn stage_bar(view: &WriterView) -> String {
    view.statuses
        .iter()
        .map(|(stage, status)| {
            let marker = if stage == view.active { ">" } else { " " };
            format!("{marker}{} [{}]", stage.label(), status_label(status))
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn status_label(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Locked => "locked",
        StageStatus::Loading => "loading",
        StageStatus::Review => "review",
        StageStatus::Ready => "ready",
        StageStatus::Complete => "done",
        StageStatus::Error => "error",
    }
}

fn render_background(out: &mut String, view: &WriterView) {
    out.push_str("Background:\n");
    if view.background.trim().is_empty() {
        out.push_str("  (empty)\n");
    }
    for line in view.background.lines() {
        let _ = writeln!(out, "  {line}");
    }
    if view.can_regenerate_background {
        out.push_str("\n(regen available)\n");
    }
}

fn render_headlines(out: &mut String, view: &WriterView) {
    out.push_str("Headlines:\n");
    for option in &view.headline_options {
        let marker = if option.selected { "*" } else { " " };
        let text = if option.text.is_empty() {
            "(empty)"
        } else {
            option.text.as_str()
        };
        let _ = writeln!(out, " {marker}{}. {text}", option.slot.number());
    }
    if view.headlines_edited {
        out.push_str("\n(edited by hand)\n");
    }
}

fn render_draft(out: &mut String, payload: &ArticlePayload) {
    let _ = writeln!(out, "Header: {}", payload.header);
    if let Some(anons) = &payload.anons {
        let _ = writeln!(out, "Anons: {anons}");
    }
    if let Some(paragraph) = &payload.paragraph_1 {
        let _ = writeln!(out, "\n{}", paragraph.content);
    }
    let quote = payload.quote_text();
    if !quote.trim().is_empty() {
        for line in quote.lines() {
            let _ = writeln!(out, "  > {line}");
        }
    }
    if let Some(paragraph) = &payload.paragraph_3 {
        let _ = writeln!(out, "\n{}", paragraph.content);
    }
    if let Some(list) = &payload.background {
        out.push_str("\nBackground facts:\n");
        for (number, item) in list.items.iter().enumerate() {
            let _ = writeln!(out, "  {}. {item}", number + 1);
        }
    }
}

fn render_publish(out: &mut String, view: &WriterView) {
    match view.publish_target {
        Some(target) => {
            let _ = writeln!(out, "Publishing to {target:?}.");
        }
        None => out.push_str("Not published yet.\n"),
    }
    if let Some(secs) = view.publish_remaining_secs {
        let _ = writeln!(out, "Waiting for the publication, {secs} s left (abort to stop).");
    }
    if let Some(link) = &view.admin_link {
        let _ = writeln!(out, "Admin link: {link}");
    }
}

/// Table of unattended runs, newest last.
pub(crate) fn render_registry(map: &ProcessingMap) -> String {
    if map.is_empty() {
        return "No unattended runs.\n".to_string();
    }
    let mut out = String::new();
    for (news_id, entry) in map.iter() {
        let started = DateTime::<Utc>::from_timestamp_millis(
            i64::try_from(entry.start_time_ms).unwrap_or(i64::MAX),
        )
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "?".to_string());
        let _ = write!(
            out,
            "#{news_id}  {}  started {started}  {}  {}",
            match entry.status {
                ProcessingStatus::Running => "running",
                ProcessingStatus::Error => "error",
            },
            format_elapsed(entry.elapsed_ms),
            entry.step_label
        );
        if let Some(error) = &entry.error {
            let _ = write!(out, "  ({error})");
        }
        out.push('\n');
    }
    out
}
