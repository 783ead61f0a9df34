//! patisserie-report: Markdown and HTML rendering of quiz results and
//! learning progress.

pub mod html;
pub mod markdown;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use patisserie_core::attempts::AttemptStatistics;
use patisserie_core::completion::LearningState;
use patisserie_core::curriculum::{LearningPath, ModuleId, PathId};
use patisserie_core::model::{AnswerKey, ChoiceKey, Quiz};
use patisserie_core::progress::ProgressStatus;
use patisserie_core::results::QuizResults;

/// A scored quiz attempt ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizReport {
    pub quiz_id: String,
    pub quiz_title: String,
    pub user_id: String,
    pub generated_at: DateTime<Utc>,
    /// Question prompts, aligned with `results.question_results`.
    pub prompts: Vec<String>,
    pub results: QuizResults,
    /// History for the quiz including this attempt, when recorded.
    #[serde(default)]
    pub statistics: Option<AttemptStatistics>,
}

impl QuizReport {
    pub fn new(quiz: &Quiz, user_id: impl Into<String>, results: QuizResults) -> Self {
        Self {
            quiz_id: quiz.id.clone(),
            quiz_title: quiz.title.clone(),
            user_id: user_id.into(),
            generated_at: Utc::now(),
            prompts: quiz.questions.iter().map(|q| q.prompt.clone()).collect(),
            results,
            statistics: None,
        }
    }

    pub fn with_statistics(mut self, statistics: AttemptStatistics) -> Self {
        self.statistics = Some(statistics);
        self
    }

    /// Save the report as JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        save_json(self, path)
    }

    pub(crate) fn prompt(&self, index: usize) -> &str {
        self.prompts.get(index).map_or("", String::as_str)
    }
}

/// Snapshot of progress across learning paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    pub generated_at: DateTime<Utc>,
    pub paths: Vec<PathSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSummary {
    pub path_id: PathId,
    pub title: String,
    pub status: ProgressStatus,
    pub completion_percent: u32,
    pub completed_modules: usize,
    pub total_modules: usize,
    pub time_spent_minutes: u32,
    pub modules: Vec<ModuleSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub module_id: ModuleId,
    pub title: String,
    pub status: ProgressStatus,
    pub score: Option<u32>,
    pub unlocked: bool,
}

impl ProgressReport {
    /// Summarize every path, started or not.
    pub fn build(paths: &[LearningPath], state: &LearningState) -> Self {
        let paths = paths
            .iter()
            .map(|path| {
                let progress = state.path_progress.get(&path.id);
                let modules: Vec<ModuleSummary> = path
                    .modules
                    .iter()
                    .map(|module| {
                        let module_progress = progress.and_then(|p| p.modules.get(&module.id));
                        ModuleSummary {
                            module_id: module.id.clone(),
                            title: module.title.clone(),
                            status: module_progress.map(|m| m.status).unwrap_or_default(),
                            score: module_progress.and_then(|m| m.score),
                            unlocked: state.unlocked_modules.contains(&module.id),
                        }
                    })
                    .collect();

                PathSummary {
                    path_id: path.id.clone(),
                    title: path.title.clone(),
                    status: progress.map(|p| p.status).unwrap_or_default(),
                    completion_percent: progress.map_or(0, |p| p.completion_percent),
                    completed_modules: modules
                        .iter()
                        .filter(|m| m.status == ProgressStatus::Completed)
                        .count(),
                    total_modules: modules.len(),
                    time_spent_minutes: progress.map_or(0, |p| p.total_time_minutes()),
                    modules,
                }
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            paths,
        }
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        save_json(self, path)
    }
}

fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize report")?;
    write_report(&json, path)
}

/// Write rendered report text, creating parent directories.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("failed to write report: {}", path.display()))
}

/// Human-readable rendering of a correct answer.
pub fn describe_answer(key: &AnswerKey) -> String {
    match key {
        AnswerKey::MultipleChoice { options, correct } => {
            let indices = match correct {
                ChoiceKey::Single(index) => vec![*index],
                ChoiceKey::Set(set) => set.clone(),
            };
            indices
                .iter()
                .map(|i| options.get(*i).cloned().unwrap_or_else(|| format!("option {i}")))
                .collect::<Vec<_>>()
                .join(", ")
        }
        AnswerKey::TrueFalse { correct } => correct.as_bool().to_string(),
        AnswerKey::Sequence {
            items,
            correct_order,
        } => correct_order
            .iter()
            .map(|order| {
                items
                    .iter()
                    .find(|item| item.order == *order)
                    .map_or_else(|| order.to_string(), |item| item.text.clone())
            })
            .collect::<Vec<_>>()
            .join(" → "),
        AnswerKey::DragDrop { items, targets } => items
            .iter()
            .zip(targets)
            .map(|(item, target)| format!("{item} → {target}"))
            .collect::<Vec<_>>()
            .join("; "),
        AnswerKey::FillBlank { blanks } => blanks
            .iter()
            .map(|b| b.answer.clone())
            .collect::<Vec<_>>()
            .join(", "),
        AnswerKey::Matching { pairs } => pairs
            .iter()
            .map(|p| format!("{} → {}", p.left, p.right))
            .collect::<Vec<_>>()
            .join("; "),
    }
}
