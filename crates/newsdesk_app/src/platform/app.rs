use std::io::{self, BufRead};
use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::Duration;

use newsdesk_core::{update, ConfirmPrompt, Msg, NewsId, WriterState};
use newsdesk_logging::{desk_debug, desk_info};

use super::effects::{EffectRunner, UiEffect};
use super::ui;
use super::ui::input::{parse_command, Input};
use super::AppConfig;

/// How long the loop waits on the engine before checking stdin again.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Interactive writer for one item, driven by lines on stdin.
pub(crate) fn run_writer(config: &AppConfig, news_id: NewsId) -> anyhow::Result<()> {
    let runner = EffectRunner::new(config)?;
    let item = runner.load_item(news_id, config.api.request_timeout)?;
    desk_info!("Opened writer for news #{}", news_id);

    let mut session = WriterSession {
        state: Some(WriterState::new(item, config.writer.clone())),
        runner,
        pending: None,
        stdin_open: true,
        closed: false,
    };
    let lines = spawn_stdin_reader();
    println!("{}", ui::input::HELP);
    session.dispatch(Msg::Opened);
    session.run(lines);
    desk_info!("Writer for news #{} closed", news_id);
    Ok(())
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

struct WriterSession {
    state: Option<WriterState>,
    runner: EffectRunner,
    pending: Option<ConfirmPrompt>,
    stdin_open: bool,
    closed: bool,
}

impl WriterSession {
    fn run(&mut self, lines: mpsc::Receiver<String>) {
        while !self.closed {
            match lines.try_recv() {
                Ok(line) => self.handle_line(&line),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    if self.stdin_open {
                        desk_debug!("stdin closed, closing the writer");
                        self.stdin_open = false;
                        self.dispatch(Msg::CloseRequested);
                    }
                }
            }
            if self.closed {
                break;
            }
            if let Some(msg) = self.runner.next_msg(POLL_INTERVAL) {
                self.dispatch(msg);
            }
        }
    }

    fn handle_line(&mut self, line: &str) {
        let Some(active) = self.state.as_ref().map(WriterState::active_stage) else {
            return;
        };
        match parse_command(line, active, self.pending.is_some()) {
            Ok(Input::Msg(msg)) => self.dispatch(msg),
            Ok(Input::Answer(accepted)) => {
                if let Some(prompt) = self.pending.take() {
                    self.dispatch(Msg::Confirmed { prompt, accepted });
                }
            }
            Ok(Input::Help) => println!("{}", ui::input::HELP),
            Ok(Input::Show) => self.redraw(),
            Err(message) => println!("{message}"),
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let Some(state) = self.state.take() else {
            return;
        };
        let (mut state, effects) = update(state, msg);
        let redraw = state.consume_dirty();
        self.state = Some(state);
        if redraw {
            self.redraw();
        }

        for effect in self.runner.apply(effects) {
            match effect {
                UiEffect::Alert(message) => println!("! {message}"),
                UiEffect::Confirm(ConfirmPrompt::Close) if !self.stdin_open => {
                    self.dispatch(Msg::Confirmed {
                        prompt: ConfirmPrompt::Close,
                        accepted: true,
                    });
                }
                UiEffect::Confirm(prompt) => {
                    println!("? {} [y/n]", prompt.question());
                    self.pending = Some(prompt);
                }
                UiEffect::Closed => self.closed = true,
            }
        }
    }

    fn redraw(&self) {
        if let Some(state) = &self.state {
            println!("\n{}", ui::render::render(&state.view()));
        }
    }
}
