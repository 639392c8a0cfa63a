mod app;
mod batch;
mod effects;
mod logging;
mod persistence;
mod ui;

use std::path::PathBuf;

use anyhow::Context;
use newsdesk_core::WriterSettings;
use newsdesk_engine::{ensure_state_dir, ApiSettings, AutoSettings, PublishSettings};
use newsdesk_logging::desk_info;

use crate::cli::{Cli, Command, LogTarget};
use logging::LogDestination;

/// Everything the commands need, resolved from flags and environment.
#[derive(Debug, Clone)]
pub(crate) struct AppConfig {
    pub api: ApiSettings,
    pub publish: PublishSettings,
    pub writer: WriterSettings,
    pub auto: AutoSettings,
    pub state_dir: PathBuf,
}

impl AppConfig {
    fn from_cli(cli: &Cli) -> Self {
        let writer = WriterSettings {
            review_delay_secs: cli.review_delay_secs,
            auto_publish_draft: cli.auto_publish_draft,
            ..WriterSettings::default()
        };
        let auto = AutoSettings {
            report_channel: cli.report_channel.clone(),
            requester: cli.requester.clone(),
            admin_links: writer.admin_links.clone(),
            ..AutoSettings::default()
        };
        Self {
            api: ApiSettings {
                base_url: cli.api_base.trim_end_matches('/').to_string(),
                ..ApiSettings::default()
            },
            publish: auto.publish.clone(),
            writer,
            auto,
            state_dir: cli.state_dir.clone(),
        }
    }
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    logging::initialize(match cli.log {
        LogTarget::File => LogDestination::File,
        LogTarget::Terminal => LogDestination::Terminal,
        LogTarget::Both => LogDestination::Both,
    });

    let config = AppConfig::from_cli(&cli);
    desk_info!(
        "newsdesk {} starting, backend {}",
        env!("CARGO_PKG_VERSION"),
        config.api.base_url
    );
    ensure_state_dir(&config.state_dir)
        .with_context(|| format!("state directory {:?}", config.state_dir))?;

    match cli.command {
        Command::Write { news_id } => app::run_writer(&config, news_id),
        Command::Auto { news_ids } => batch::run_auto(&config, &news_ids),
        Command::Status => batch::print_status(&config),
        Command::Dismiss { news_id } => batch::dismiss(&config, news_id),
    }
}
