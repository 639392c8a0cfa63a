use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use anyhow::{bail, Context};
use newsdesk_core::{NewsId, ProcessingMap, ProcessingStatus};
use newsdesk_engine::{
    AutoRunner, Clock, NewsApi, ProcessingRegistry, RegistryStore, ReqwestNewsApi, RunOutcome,
    SystemClock,
};
use newsdesk_logging::{desk_error, desk_info, format_elapsed};
use tokio::sync::watch;
use tokio::task::JoinSet;

use super::persistence::RonFileStore;
use super::ui::render::render_registry;
use super::AppConfig;

/// Runs the unattended pipeline for every id concurrently.
pub(crate) fn run_auto(config: &AppConfig, news_ids: &[NewsId]) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("tokio runtime")?;
    runtime.block_on(run_all(config, news_ids))
}

async fn run_all(config: &AppConfig, news_ids: &[NewsId]) -> anyhow::Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(RonFileStore::new(&config.state_dir));
    let registry = ProcessingRegistry::init(store, clock.clone()).context("processing registry")?;
    let api: Arc<dyn NewsApi> = Arc::new(ReqwestNewsApi::new(config.api.clone())?);
    let runner = AutoRunner::new(api, registry.clone(), clock, config.auto.clone());

    let progress = tokio::spawn(report_progress(registry.subscribe()));
    let mut runs = JoinSet::new();
    let mut seen = HashSet::new();
    for &news_id in news_ids {
        if !seen.insert(news_id) {
            continue;
        }
        if registry.is_running(news_id) {
            println!("#{news_id} is already being processed, skipping");
            continue;
        }
        let runner = runner.clone();
        runs.spawn(async move { (news_id, runner.run(news_id).await) });
    }

    let mut failed = Vec::new();
    while let Some(joined) = runs.join_next().await {
        let (news_id, outcome) = match joined {
            Ok(result) => result,
            Err(err) => {
                desk_error!("Run task failed: {}", err);
                failed.push(format!("task: {err}"));
                continue;
            }
        };
        match outcome {
            RunOutcome::Completed { report, .. } => println!("\n{report}\n"),
            RunOutcome::Failed { message } => {
                println!("#{news_id} failed: {message}");
                failed.push(format!("#{news_id}"));
            }
            RunOutcome::Superseded => println!("#{news_id} was taken over by a newer run"),
        }
    }

    progress.abort();
    registry.dispose();
    if !failed.is_empty() {
        bail!("{} run(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

/// Prints a line whenever a run moves to another step or fails.
async fn report_progress(mut updates: watch::Receiver<ProcessingMap>) {
    let mut last: BTreeMap<NewsId, (String, ProcessingStatus)> = BTreeMap::new();
    while updates.changed().await.is_ok() {
        let map = updates.borrow_and_update().clone();
        for (news_id, entry) in map.iter() {
            let current = (entry.step_label.clone(), entry.status);
            if last.get(&news_id) == Some(&current) {
                continue;
            }
            match entry.status {
                ProcessingStatus::Running => println!(
                    "#{news_id} [{}] {}",
                    format_elapsed(entry.elapsed_ms),
                    entry.step_label
                ),
                ProcessingStatus::Error => println!(
                    "#{news_id} [{}] error: {}",
                    format_elapsed(entry.elapsed_ms),
                    entry.error.as_deref().unwrap_or("unknown")
                ),
            }
            last.insert(news_id, current);
        }
        last.retain(|news_id, _| map.get(*news_id).is_some());
    }
}

pub(crate) fn print_status(config: &AppConfig) -> anyhow::Result<()> {
    let mut map = RonFileStore::new(&config.state_dir)
        .load()
        .context("processing registry")?;
    map.tick(SystemClock.now_ms());
    print!("{}", render_registry(&map));
    Ok(())
}

pub(crate) fn dismiss(config: &AppConfig, news_id: NewsId) -> anyhow::Result<()> {
    let store = Arc::new(RonFileStore::new(&config.state_dir));
    let registry =
        ProcessingRegistry::init(store, Arc::new(SystemClock)).context("processing registry")?;
    match registry.dismiss(news_id) {
        Some(entry) => {
            desk_info!("Dismissed #{} ({:?})", news_id, entry.status);
            println!("Removed #{news_id} from the processing list.");
        }
        None => println!("#{news_id} is not in the processing list."),
    }
    registry.dispose();
    Ok(())
}
