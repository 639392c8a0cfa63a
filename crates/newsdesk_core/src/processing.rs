use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::NewsId;

/// The five fixed steps of an unattended run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Background,
    Headlines,
    ArticleText,
    HeadlineProcessing,
    Publication,
}

impl PipelineStep {
    pub fn label(self) -> &'static str {
        match self {
            PipelineStep::Background => "Step 1/5: Generating background",
            PipelineStep::Headlines => "Step 2/5: Generating headlines",
            PipelineStep::ArticleText => "Step 3/5: Writing article text",
            PipelineStep::HeadlineProcessing => "Step 4/5: Processing headlines",
            PipelineStep::Publication => "Step 5/5: Creating publication",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Running,
    Error,
}

/// Progress of one unattended run, keyed by news id in [`ProcessingMap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingEntry {
    /// Wall-clock start, epoch milliseconds.
    pub start_time_ms: u64,
    pub elapsed_ms: u64,
    pub status: ProcessingStatus,
    pub step_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Identifies the run that owns this entry.
    #[serde(default)]
    pub run_epoch: u64,
}

/// Partial update merged field by field into an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingUpdate {
    pub step_label: Option<String>,
    pub status: Option<ProcessingStatus>,
    pub error: Option<String>,
    pub elapsed_ms: Option<u64>,
}

impl ProcessingUpdate {
    pub fn step(step: PipelineStep) -> Self {
        Self {
            step_label: Some(step.label().to_string()),
            ..Self::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(ProcessingStatus::Error),
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_elapsed(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = Some(elapsed_ms);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessingMap {
    entries: BTreeMap<NewsId, ProcessingEntry>,
}

impl ProcessingMap {
    /// Inserts or overwrites the entry for `id` as a fresh running entry.
    pub fn start(&mut self, id: NewsId, now_ms: u64, run_epoch: u64) {
        self.entries.insert(
            id,
            ProcessingEntry {
                start_time_ms: now_ms,
                elapsed_ms: 0,
                status: ProcessingStatus::Running,
                step_label: PipelineStep::Background.label().to_string(),
                error: None,
                run_epoch,
            },
        );
    }

    /// Shallow merge into an existing entry. Returns false when `id` is absent.
    pub fn update(&mut self, id: NewsId, update: ProcessingUpdate) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else {
            return false;
        };
        if let Some(label) = update.step_label {
            entry.step_label = label;
        }
        if let Some(status) = update.status {
            entry.status = status;
        }
        if let Some(error) = update.error {
            entry.error = Some(error);
        }
        if let Some(elapsed) = update.elapsed_ms {
            entry.elapsed_ms = elapsed;
        }
        true
    }

    pub fn remove(&mut self, id: NewsId) -> Option<ProcessingEntry> {
        self.entries.remove(&id)
    }

    /// Recomputes elapsed time of running entries. Returns true if any changed.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        let mut changed = false;
        for entry in self.entries.values_mut() {
            if entry.status != ProcessingStatus::Running {
                continue;
            }
            let elapsed = now_ms.saturating_sub(entry.start_time_ms);
            if entry.elapsed_ms != elapsed {
                entry.elapsed_ms = elapsed;
                changed = true;
            }
        }
        changed
    }

    pub fn has_running(&self) -> bool {
        self.entries
            .values()
            .any(|entry| entry.status == ProcessingStatus::Running)
    }

    pub fn get(&self, id: NewsId) -> Option<&ProcessingEntry> {
        self.entries.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NewsId, &ProcessingEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest run epoch recorded, so a rehydrated registry never reuses one.
    pub fn max_epoch(&self) -> u64 {
        self.entries
            .values()
            .map(|entry| entry.run_epoch)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_only_touches_running_entries() {
        let mut map = ProcessingMap::default();
        map.start(1, 1_000, 1);
        map.start(2, 1_000, 2);
        map.update(2, ProcessingUpdate::failed("boom").with_elapsed(500));

        assert!(map.tick(4_000));
        assert_eq!(map.get(1).map(|e| e.elapsed_ms), Some(3_000));
        assert_eq!(map.get(2).map(|e| e.elapsed_ms), Some(500));
        assert!(!map.tick(4_000));
    }

    #[test]
    fn update_requires_existing_entry() {
        let mut map = ProcessingMap::default();
        assert!(!map.update(7, ProcessingUpdate::step(PipelineStep::Headlines)));
        assert!(map.is_empty());
    }

    #[test]
    fn start_overwrites_previous_error() {
        let mut map = ProcessingMap::default();
        map.start(3, 0, 1);
        map.update(3, ProcessingUpdate::failed("no payload"));
        map.start(3, 10, 2);
        let entry = map.get(3).unwrap();
        assert_eq!(entry.status, ProcessingStatus::Running);
        assert_eq!(entry.error, None);
        assert_eq!(entry.run_epoch, 2);
        assert_eq!(map.max_epoch(), 2);
    }
}
