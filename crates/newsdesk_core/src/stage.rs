use serde::{Deserialize, Serialize};

/// The four manual-mode stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    Background,
    Headlines,
    Draft,
    Publish,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Background,
        Stage::Headlines,
        Stage::Draft,
        Stage::Publish,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            Stage::Background => 0,
            Stage::Headlines => 1,
            Stage::Draft => 2,
            Stage::Publish => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Background => "Background",
            Stage::Headlines => "Headlines",
            Stage::Draft => "Draft",
            Stage::Publish => "Publish",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StageStatus {
    /// Prerequisites unmet.
    #[default]
    Locked,
    /// Backend call in flight.
    Loading,
    /// Result produced; an auto-advance countdown may be running.
    Review,
    /// Auto-advance paused; editing is untimed.
    Ready,
    Complete,
    Error,
}

impl StageStatus {
    /// Whether the stage shows content a human can work on.
    pub fn is_reviewable(self) -> bool {
        matches!(self, StageStatus::Review | StageStatus::Ready)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageStatuses([StageStatus; 4]);

impl StageStatuses {
    pub fn get(&self, stage: Stage) -> StageStatus {
        self.0[stage.index()]
    }

    pub(crate) fn set(&mut self, stage: Stage, status: StageStatus) {
        self.0[stage.index()] = status;
    }

    pub fn any_loading(&self) -> bool {
        self.0.contains(&StageStatus::Loading)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, StageStatus)> + '_ {
        Stage::ALL.into_iter().map(|stage| (stage, self.get(stage)))
    }
}
