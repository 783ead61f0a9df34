//! Completion/Unlock Orchestrator.
//!
//! [`ProgressTracker`] owns the learner's progress in a [`KeyValueStore`] and
//! runs the Prerequisite Evaluator whenever a module is completed, so that
//! dependent modules unlock automatically. Notifications and achievements are
//! returned to the caller rather than pushed anywhere.
//!
//! Unlocks are sticky: neither completion nor reset ever re-locks a module.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::curriculum::{LearningPath, Module, ModuleId, PathId};
use crate::prerequisites::{check, EvaluationContext, PrerequisiteCheck, Target};
use crate::progress::{ModuleProgress, PathProgress, ProgressStatus};
use crate::error::StorageError;
use crate::storage::{keys, read_json, try_read_json, write_json, KeyValueStore};

/// Milestones awarded on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Achievement {
    /// First module completed, across all paths.
    FirstModule,
    /// A module completed with a score of 100.
    PerfectScore,
    /// Every module of a path completed.
    PathComplete,
}

impl fmt::Display for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Achievement::FirstModule => write!(f, "first-module"),
            Achievement::PerfectScore => write!(f, "perfect-score"),
            Achievement::PathComplete => write!(f, "path-complete"),
        }
    }
}

/// What completing a module caused.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub newly_unlocked_modules: Vec<ModuleId>,
    pub notifications: Vec<String>,
    pub achievements: Vec<Achievement>,
    pub path_completed: bool,
}

/// Snapshot of everything the tracker persists besides the current pointers.
#[derive(Debug, Clone, Default)]
pub struct LearningState {
    pub path_progress: BTreeMap<PathId, PathProgress>,
    pub unlocked_modules: BTreeSet<ModuleId>,
    pub completed_modules: BTreeSet<ModuleId>,
}

impl LearningState {
    /// Build the evaluator's view of this state.
    pub fn context(&self) -> EvaluationContext {
        let mut module_progress = BTreeMap::new();
        for progress in self.path_progress.values() {
            for (id, module) in &progress.modules {
                module_progress.insert(id.clone(), module.clone());
            }
        }

        EvaluationContext {
            completed_modules: self.completed_modules.clone(),
            completed_paths: self
                .path_progress
                .values()
                .filter(|p| p.status == ProgressStatus::Completed)
                .map(|p| p.path_id.clone())
                .collect(),
            unlocked_modules: self.unlocked_modules.clone(),
            unlocked_paths: self.path_progress.keys().cloned().collect(),
            module_progress,
        }
    }
}

/// Tracks progress through the learning paths it was built with.
pub struct ProgressTracker {
    store: Arc<dyn KeyValueStore>,
    paths: Vec<LearningPath>,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn KeyValueStore>, paths: Vec<LearningPath>) -> Self {
        Self { store, paths }
    }

    pub fn paths(&self) -> &[LearningPath] {
        &self.paths
    }

    pub fn path(&self, id: &PathId) -> Option<&LearningPath> {
        self.paths.iter().find(|p| &p.id == id)
    }

    /// Load the persisted state; unreadable keys read as empty.
    pub fn state(&self) -> LearningState {
        let store = self.store.as_ref();
        LearningState {
            path_progress: read_json(store, keys::PATH_PROGRESS),
            unlocked_modules: read_json(store, keys::UNLOCKED_MODULES),
            completed_modules: read_json(store, keys::COMPLETED_MODULES),
        }
    }

    /// Load the persisted state, reporting unreadable keys.
    fn try_state(&self) -> Result<LearningState, StorageError> {
        let store = self.store.as_ref();
        Ok(LearningState {
            path_progress: try_read_json(store, keys::PATH_PROGRESS)?.unwrap_or_default(),
            unlocked_modules: try_read_json(store, keys::UNLOCKED_MODULES)?.unwrap_or_default(),
            completed_modules: try_read_json(store, keys::COMPLETED_MODULES)?.unwrap_or_default(),
        })
    }

    /// Persist `state`. Nothing is written while the stored state cannot be
    /// read back, so unreadable progress is never replaced by a partial view.
    fn save_state(&self, state: &LearningState) -> bool {
        if let Err(e) = self.try_state() {
            tracing::error!("not saving progress over unreadable state: {e}");
            return false;
        }
        let store = self.store.as_ref();
        let writes = [
            (
                keys::PATH_PROGRESS,
                write_json(store, keys::PATH_PROGRESS, &state.path_progress),
            ),
            (
                keys::UNLOCKED_MODULES,
                write_json(store, keys::UNLOCKED_MODULES, &state.unlocked_modules),
            ),
            (
                keys::COMPLETED_MODULES,
                write_json(store, keys::COMPLETED_MODULES, &state.completed_modules),
            ),
        ];
        let mut saved = true;
        for (key, result) in writes {
            if let Err(e) = result {
                tracing::error!("failed to persist '{key}': {e}");
                saved = false;
            }
        }
        saved
    }

    pub fn current_path(&self) -> Option<PathId> {
        read_json(self.store.as_ref(), keys::CURRENT_PATH)
    }

    pub fn current_module(&self) -> Option<ModuleId> {
        read_json(self.store.as_ref(), keys::CURRENT_MODULE)
    }

    fn set_current(&self, path: &PathId, module: Option<&ModuleId>) {
        let store = self.store.as_ref();
        if let Err(e) = write_json(store, keys::CURRENT_PATH, path) {
            tracing::error!("failed to persist '{}': {e}", keys::CURRENT_PATH);
        }
        let result = match module {
            Some(module) => write_json(store, keys::CURRENT_MODULE, module),
            None => store.remove(keys::CURRENT_MODULE),
        };
        if let Err(e) = result {
            tracing::error!("failed to persist '{}': {e}", keys::CURRENT_MODULE);
        }
    }

    pub fn path_progress(&self, id: &PathId) -> Option<PathProgress> {
        self.state().path_progress.remove(id)
    }

    pub fn module_progress(&self, path_id: &PathId, module_id: &ModuleId) -> Option<ModuleProgress> {
        self.path_progress(path_id)
            .and_then(|mut p| p.modules.remove(module_id))
    }

    fn lookup(&self, path_id: &PathId, module_id: &ModuleId) -> Option<(&LearningPath, &Module)> {
        let Some(path) = self.path(path_id) else {
            tracing::warn!("unknown path '{path_id}'");
            return None;
        };
        let Some(module) = path.module(module_id) else {
            tracing::warn!("unknown module '{module_id}' in path '{path_id}'");
            return None;
        };
        Some((path, module))
    }

    /// Prerequisite check for a path.
    pub fn check_path(&self, path_id: &PathId) -> Option<PrerequisiteCheck> {
        let path = self.path(path_id)?;
        Some(check(Target::Path(path), &self.state().context()))
    }

    /// Prerequisite check for a module of a path.
    pub fn check_module(&self, path_id: &PathId, module_id: &ModuleId) -> Option<PrerequisiteCheck> {
        let (_, module) = self.lookup(path_id, module_id)?;
        Some(check(Target::Module(module), &self.state().context()))
    }

    pub fn can_access_path(&self, path_id: &PathId) -> bool {
        self.check_path(path_id)
            .is_some_and(|c| c.is_accessible())
    }

    pub fn is_module_accessible(&self, path_id: &PathId, module_id: &ModuleId) -> bool {
        self.check_module(path_id, module_id)
            .is_some_and(|c| c.is_accessible())
    }

    /// Start a path and unlock its entry modules.
    ///
    /// Returns the modules unlocked by starting, or `None` when the path is
    /// unknown or its own prerequisites are unmet.
    pub fn start_path(&self, path_id: &PathId) -> Option<Vec<ModuleId>> {
        let Some(path) = self.path(path_id) else {
            tracing::warn!("unknown path '{path_id}'");
            return None;
        };
        let mut state = self.state();
        if !ensure_path_started(&mut state, path) {
            tracing::info!("path '{path_id}' is locked");
            return None;
        }

        let context = state.context();
        let unlocked: Vec<ModuleId> = path
            .modules
            .iter()
            .filter(|m| check(Target::Module(m), &context).can_unlock)
            .map(|m| m.id.clone())
            .collect();
        state.unlocked_modules.extend(unlocked.iter().cloned());

        self.save_state(&state);
        self.set_current(path_id, next_module(path, &state).as_ref());
        Some(unlocked)
    }

    /// Mark a module in progress. Returns false when it is not accessible or
    /// the change could not be saved.
    pub fn start_module(&self, path_id: &PathId, module_id: &ModuleId) -> bool {
        let Some((path, module)) = self.lookup(path_id, module_id) else {
            return false;
        };
        let mut state = self.state();
        if !ensure_path_started(&mut state, path) {
            return false;
        }
        if !check(Target::Module(module), &state.context()).is_accessible() {
            tracing::info!("module '{module_id}' is locked");
            return false;
        }
        state.unlocked_modules.insert(module_id.clone());

        let now = Utc::now();
        let progress = path_entry(&mut state, path);
        progress.last_accessed = Some(now);
        let module_progress = progress.module_mut(module_id);
        if module_progress.status == ProgressStatus::NotStarted {
            module_progress.status = ProgressStatus::InProgress;
            module_progress.started_at = Some(now);
        }
        module_progress.last_accessed = Some(now);
        progress.refresh_completion(path.modules.len());

        if !self.save_state(&state) {
            return false;
        }
        self.set_current(path_id, Some(module_id));
        true
    }

    /// Add time spent on a module. Returns false for unknown or unstarted
    /// modules, or when the change could not be saved.
    pub fn record_time(&self, path_id: &PathId, module_id: &ModuleId, minutes: u32) -> bool {
        self.update_module(path_id, module_id, |progress| {
            progress.time_spent_minutes = progress.time_spent_minutes.saturating_add(minutes);
        })
    }

    /// Record time and step away from the module.
    pub fn pause_module(&self, path_id: &PathId, module_id: &ModuleId, minutes: u32) -> bool {
        let paused = self.record_time(path_id, module_id, minutes);
        if paused && self.current_module().as_ref() == Some(module_id) {
            self.set_current(path_id, None);
        }
        paused
    }

    /// Flip the bookmark flag; returns the new value.
    pub fn toggle_bookmark(&self, path_id: &PathId, module_id: &ModuleId) -> Option<bool> {
        let mut bookmarked = None;
        self.update_module(path_id, module_id, |progress| {
            progress.bookmarked = !progress.bookmarked;
            bookmarked = Some(progress.bookmarked);
        });
        bookmarked
    }

    pub fn set_notes(&self, path_id: &PathId, module_id: &ModuleId, notes: &str) -> bool {
        self.update_module(path_id, module_id, |progress| {
            progress.notes = notes.to_string();
        })
    }

    fn update_module(
        &self,
        path_id: &PathId,
        module_id: &ModuleId,
        update: impl FnOnce(&mut ModuleProgress),
    ) -> bool {
        if self.lookup(path_id, module_id).is_none() {
            return false;
        }
        let mut state = self.state();
        let Some(progress) = state.path_progress.get_mut(path_id) else {
            return false;
        };
        let Some(module_progress) = progress.modules.get_mut(module_id) else {
            return false;
        };
        update(module_progress);
        module_progress.last_accessed = Some(Utc::now());
        self.save_state(&state)
    }

    /// Clear a module's progress. Its unlock is kept.
    pub fn reset_module(&self, path_id: &PathId, module_id: &ModuleId) -> bool {
        let Some((path, _)) = self.lookup(path_id, module_id) else {
            return false;
        };
        let mut state = self.state();
        state.completed_modules.remove(module_id);
        if let Some(progress) = state.path_progress.get_mut(path_id) {
            progress.modules.remove(module_id);
            progress.refresh_completion(path.modules.len());
            if progress.status != ProgressStatus::Completed {
                progress.completed_at = None;
            }
        }
        self.save_state(&state)
    }

    /// Complete a module and unlock whatever now qualifies.
    ///
    /// Every other module of the path is re-evaluated; those that move from
    /// not-unlockable to unlockable are unlocked and returned. Unknown ids
    /// yield an empty outcome.
    pub fn complete_module(
        &self,
        module_id: &ModuleId,
        path_id: &PathId,
        score: Option<u32>,
    ) -> CompletionOutcome {
        let mut outcome = CompletionOutcome::default();
        let Some((path, module)) = self.lookup(path_id, module_id) else {
            return outcome;
        };

        let mut state = self.state();
        let unlockable_before = unlockable_modules(path, &state.context());
        let first_completion = state.completed_modules.is_empty();
        let already_completed = state.completed_modules.contains(module_id);

        let now = Utc::now();
        let progress = path_entry(&mut state, path);
        let path_was_completed = progress.status == ProgressStatus::Completed;
        progress.last_accessed = Some(now);

        let module_progress = progress.module_mut(module_id);
        module_progress.status = ProgressStatus::Completed;
        module_progress.completion_percent = 100;
        module_progress.started_at.get_or_insert(now);
        module_progress.completed_at.get_or_insert(now);
        module_progress.last_accessed = Some(now);
        if let Some(score) = score {
            module_progress.record_score(score);
            module_progress.attempts = module_progress.attempts.saturating_add(1);
        }

        progress.refresh_completion(path.modules.len());
        outcome.path_completed = !path_was_completed && progress.status == ProgressStatus::Completed;
        if outcome.path_completed {
            progress.completed_at = Some(now);
        }

        state.completed_modules.insert(module_id.clone());
        state.unlocked_modules.insert(module_id.clone());

        let unlockable_after = unlockable_modules(path, &state.context());
        outcome.newly_unlocked_modules = path
            .modules
            .iter()
            .map(|m| &m.id)
            .filter(|id| {
                *id != module_id && unlockable_after.contains(*id) && !unlockable_before.contains(*id)
            })
            .cloned()
            .collect();
        state
            .unlocked_modules
            .extend(outcome.newly_unlocked_modules.iter().cloned());

        if !already_completed {
            outcome
                .notifications
                .push(format!("Completed module '{}'", module.title));
        }
        if let Some(score) = score {
            outcome
                .notifications
                .push(format!("Scored {score}% on '{}'", module.title));
        }
        for id in &outcome.newly_unlocked_modules {
            let title = path.module(id).map_or(id.as_str(), |m| m.title.as_str());
            outcome
                .notifications
                .push(format!("Unlocked module '{title}'"));
        }
        if outcome.path_completed {
            outcome
                .notifications
                .push(format!("Completed learning path '{}'", path.title));
        }

        if first_completion && !already_completed {
            outcome.achievements.push(Achievement::FirstModule);
        }
        if score.is_some_and(|s| s >= 100) {
            outcome.achievements.push(Achievement::PerfectScore);
        }
        if outcome.path_completed {
            outcome.achievements.push(Achievement::PathComplete);
        }

        tracing::info!(
            module = %module_id,
            path = %path_id,
            unlocked = outcome.newly_unlocked_modules.len(),
            "module completed"
        );

        self.save_state(&state);
        self.set_current(path_id, next_module(path, &state).as_ref());
        outcome
    }
}

/// Ids of the path's modules that the evaluator currently allows to unlock.
fn unlockable_modules(path: &LearningPath, context: &EvaluationContext) -> BTreeSet<ModuleId> {
    path.modules
        .iter()
        .filter(|m| check(Target::Module(m), context).can_unlock)
        .map(|m| m.id.clone())
        .collect()
}

/// Create the path's progress entry if the path is accessible.
fn ensure_path_started(state: &mut LearningState, path: &LearningPath) -> bool {
    if state.path_progress.contains_key(&path.id) {
        return true;
    }
    if !check(Target::Path(path), &state.context()).is_accessible() {
        return false;
    }
    let progress = path_entry(state, path);
    progress.started_at = Some(Utc::now());
    progress.refresh_completion(path.modules.len());
    true
}

fn path_entry<'a>(state: &'a mut LearningState, path: &LearningPath) -> &'a mut PathProgress {
    state
        .path_progress
        .entry(path.id.clone())
        .or_insert_with(|| PathProgress::new(path.id.clone()))
}

/// First module in path order that is unlocked but not completed.
fn next_module(path: &LearningPath, state: &LearningState) -> Option<ModuleId> {
    path.modules
        .iter()
        .find(|m| state.unlocked_modules.contains(&m.id) && !state.completed_modules.contains(&m.id))
        .map(|m| m.id.clone())
}
