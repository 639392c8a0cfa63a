use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use newsdesk_core::NewsId;

/// Drives news items through the background, headline, draft and publish
/// stages against the autonews backend.
#[derive(Debug, Parser)]
#[command(name = "newsdesk", version)]
pub struct Cli {
    /// Backend origin.
    #[arg(long, env = "NEWS_API_BASE", default_value = "http://localhost:8000")]
    pub api_base: String,

    /// Directory holding the processing registry.
    #[arg(long, env = "NEWSDESK_STATE_DIR", default_value = ".")]
    pub state_dir: PathBuf,

    /// Login email named in completion reports.
    #[arg(long, env = "NEWSDESK_LOGIN_EMAIL")]
    pub requester: Option<String>,

    #[arg(long, env = "NEWSDESK_REPORT_CHANNEL", default_value = "C09UTNAMNFQ")]
    pub report_channel: String,

    #[arg(long, value_enum, default_value_t = LogTarget::File)]
    pub log: LogTarget,

    /// Seconds a review countdown runs before auto-advancing.
    #[arg(long, default_value_t = 7)]
    pub review_delay_secs: u32,

    /// Publish to staging automatically once the draft is ready.
    #[arg(long)]
    pub auto_publish_draft: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    File,
    Terminal,
    Both,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Author one item step by step.
    Write { news_id: NewsId },
    /// Run the unattended pipeline for the given items.
    Auto {
        #[arg(required = true)]
        news_ids: Vec<NewsId>,
    },
    /// Show running and failed unattended runs.
    Status,
    /// Remove an item from the processing registry.
    Dismiss { news_id: NewsId },
}
