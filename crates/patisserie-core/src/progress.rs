//! Per-module and per-path progress records.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::curriculum::{ModuleId, PathId};
use crate::results::{percentage, saturating_sum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressStatus::NotStarted => write!(f, "not-started"),
            ProgressStatus::InProgress => write!(f, "in-progress"),
            ProgressStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Progress on a single module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleProgress {
    pub status: ProgressStatus,
    /// 0-100.
    pub completion_percent: u32,
    /// Best recorded score, 0-100.
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub time_spent_minutes: u32,
    #[serde(default)]
    pub bookmarked: bool,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_accessed: Option<DateTime<Utc>>,
}

impl ModuleProgress {
    pub fn is_completed(&self) -> bool {
        self.status == ProgressStatus::Completed
    }

    /// Keep the higher of the recorded and the new score.
    pub fn record_score(&mut self, score: u32) {
        let score = score.min(100);
        self.score = Some(self.score.map_or(score, |best| best.max(score)));
    }
}

/// Progress on a learning path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathProgress {
    pub path_id: PathId,
    pub status: ProgressStatus,
    /// Completed modules over total modules, 0-100.
    pub completion_percent: u32,
    #[serde(default)]
    pub modules: BTreeMap<ModuleId, ModuleProgress>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_accessed: Option<DateTime<Utc>>,
}

impl PathProgress {
    pub fn new(path_id: PathId) -> Self {
        Self {
            path_id,
            status: ProgressStatus::NotStarted,
            completion_percent: 0,
            modules: BTreeMap::new(),
            started_at: None,
            completed_at: None,
            last_accessed: None,
        }
    }

    pub fn module_mut(&mut self, id: &ModuleId) -> &mut ModuleProgress {
        self.modules.entry(id.clone()).or_default()
    }

    pub fn completed_modules(&self) -> usize {
        self.modules.values().filter(|m| m.is_completed()).count()
    }

    pub fn total_time_minutes(&self) -> u32 {
        saturating_sum(self.modules.values().map(|m| m.time_spent_minutes))
    }

    /// Recompute completion against the path's module count.
    pub fn refresh_completion(&mut self, module_count: usize) {
        self.completion_percent = percentage(self.completed_modules() as u32, module_count as u32);
        self.status = if module_count > 0 && self.completed_modules() >= module_count {
            ProgressStatus::Completed
        } else if self.modules.is_empty() && self.started_at.is_none() {
            ProgressStatus::NotStarted
        } else {
            ProgressStatus::InProgress
        };
    }
}
