use newsdesk_core::{DraftEdit, HeaderSlot, Msg, PublishTarget, Stage};

/// A parsed line of terminal input.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Input {
    Msg(Msg),
    /// Answer to the pending yes/no prompt.
    Answer(bool),
    Help,
    Show,
}

pub(crate) const HELP: &str = "\
Commands:
  hold                  stop the countdown of the active stage
  launch                save the background and generate headlines now
  regen                 regenerate the active stage
  bg <text>             replace the background (\\n for line breaks)
  h2|h3|h4 <text>       edit a headline candidate
  pick <2|3|4>          choose a headline and write the draft
  anons|p1|p3 <text>    edit the teaser or a paragraph
  quote <text>          edit the quote block (blank line separates quotes)
  item <n> <text>       edit background fact n
  add-item | rm-item <n>
  publish [staging|prod]
  abort                 stop waiting for the publication
  goto <stage>          go back to background or draft
  show | help | quit";

/// Parses one line. `prompt_pending` restricts input to y/n answers.
pub(crate) fn parse_command(line: &str, active: Stage, prompt_pending: bool) -> Result<Input, String> {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    if prompt_pending {
        return match command.to_ascii_lowercase().as_str() {
            "y" | "yes" => Ok(Input::Answer(true)),
            "n" | "no" => Ok(Input::Answer(false)),
            _ => Err("Answer y or n.".to_string()),
        };
    }

    let msg = match command {
        "" | "show" => return Ok(Input::Show),
        "help" | "?" => return Ok(Input::Help),
        "hold" => Msg::Hold,
        "launch" => Msg::LaunchHeadlines,
        "regen" => match active {
            Stage::Background => Msg::RegenerateBackground,
            Stage::Headlines => Msg::RegenerateHeadlines,
            Stage::Draft => Msg::RegenerateDraft,
            Stage::Publish => return Err("Nothing to regenerate here.".to_string()),
        },
        "bg" => Msg::BackgroundEdited(unescape(rest)),
        "h2" | "h3" | "h4" => {
            let slot = command[1..]
                .parse()
                .ok()
                .and_then(HeaderSlot::new)
                .ok_or_else(|| format!("Unknown headline slot: {command}"))?;
            Msg::HeadlineEdited {
                slot,
                text: rest.to_string(),
            }
        }
        "pick" => {
            let slot = rest
                .parse()
                .ok()
                .and_then(HeaderSlot::new)
                .filter(|slot| slot.is_selectable())
                .ok_or_else(|| "Pick 2, 3 or 4.".to_string())?;
            Msg::HeadlineSelected(slot)
        }
        "anons" => Msg::DraftEdited(DraftEdit::Anons(unescape(rest))),
        "p1" => Msg::DraftEdited(DraftEdit::Paragraph1(unescape(rest))),
        "quote" => Msg::DraftEdited(DraftEdit::Quote(unescape(rest))),
        "p3" => Msg::DraftEdited(DraftEdit::Paragraph3(unescape(rest))),
        "item" => {
            let (number, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let index = item_index(number)?;
            Msg::DraftEdited(DraftEdit::BackgroundItem {
                index,
                text: text.trim().to_string(),
            })
        }
        "add-item" => Msg::DraftEdited(DraftEdit::AddBackgroundItem),
        "rm-item" => Msg::DraftEdited(DraftEdit::RemoveBackgroundItem(item_index(rest)?)),
        "publish" => match rest {
            "" | "staging" => Msg::Publish(PublishTarget::Staging),
            "prod" | "production" => Msg::Publish(PublishTarget::Production),
            other => return Err(format!("Unknown target: {other}")),
        },
        "abort" => Msg::AbortPublish,
        "goto" => Msg::NavigateTo(parse_stage(rest)?),
        "quit" | "exit" => Msg::CloseRequested,
        other => return Err(format!("Unknown command: {other}. Type help.")),
    };
    Ok(Input::Msg(msg))
}

/// Background items are numbered from 1 on screen.
fn item_index(text: &str) -> Result<usize, String> {
    match text.parse::<usize>() {
        Ok(number) if number >= 1 => Ok(number - 1),
        _ => Err(format!("Not an item number: {text}")),
    }
}

fn parse_stage(text: &str) -> Result<Stage, String> {
    Stage::ALL
        .into_iter()
        .find(|stage| stage.label().eq_ignore_ascii_case(text))
        .ok_or_else(|| format!("Unknown stage: {text}"))
}

fn unescape(text: &str) -> String {
    text.replace("\\n", "\n")
}
