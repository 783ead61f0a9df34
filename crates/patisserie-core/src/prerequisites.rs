//! Prerequisite Evaluator.
//!
//! Decides whether a module or path can be unlocked from the learner's
//! progress. Every declared prerequisite id is evaluated as an implicit
//! completion condition alongside the target's explicit unlock conditions;
//! the result is recomputed on every call and never cached.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::curriculum::{LearningPath, Module, ModuleId, PathId};
use crate::progress::ModuleProgress;
use crate::results::{percentage, saturating_sum};

/// What an unlock condition requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Requirement {
    ModuleCompletion {
        module: ModuleId,
    },
    PathCompletion {
        path: PathId,
    },
    /// Score (0-100) on `module`, or on the target when unset.
    ScoreThreshold {
        required: u32,
        #[serde(default)]
        module: Option<ModuleId>,
    },
    /// Minutes spent on `module`, or on the target when unset.
    TimeSpent {
        required_minutes: u32,
        #[serde(default)]
        module: Option<ModuleId>,
    },
    /// Attempts on `module`, or on the target when unset.
    AttemptCount {
        required: u32,
        #[serde(default)]
        module: Option<ModuleId>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    ModuleCompletion,
    PathCompletion,
    ScoreThreshold,
    TimeSpent,
    AttemptCount,
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionKind::ModuleCompletion => write!(f, "module completion"),
            ConditionKind::PathCompletion => write!(f, "path completion"),
            ConditionKind::ScoreThreshold => write!(f, "score threshold"),
            ConditionKind::TimeSpent => write!(f, "time spent"),
            ConditionKind::AttemptCount => write!(f, "attempt count"),
        }
    }
}

impl Requirement {
    pub fn kind(&self) -> ConditionKind {
        match self {
            Requirement::ModuleCompletion { .. } => ConditionKind::ModuleCompletion,
            Requirement::PathCompletion { .. } => ConditionKind::PathCompletion,
            Requirement::ScoreThreshold { .. } => ConditionKind::ScoreThreshold,
            Requirement::TimeSpent { .. } => ConditionKind::TimeSpent,
            Requirement::AttemptCount { .. } => ConditionKind::AttemptCount,
        }
    }

    /// Required value; completion requirements count as 1.
    pub fn required_value(&self) -> u32 {
        match self {
            Requirement::ModuleCompletion { .. } | Requirement::PathCompletion { .. } => 1,
            Requirement::ScoreThreshold { required, .. } => *required,
            Requirement::TimeSpent {
                required_minutes, ..
            } => *required_minutes,
            Requirement::AttemptCount { required, .. } => *required,
        }
    }

    fn describe(&self) -> String {
        match self {
            Requirement::ModuleCompletion { module } => format!("complete module '{module}'"),
            Requirement::PathCompletion { path } => format!("complete path '{path}'"),
            Requirement::ScoreThreshold { required, module } => match module {
                Some(m) => format!("score at least {required}% on '{m}'"),
                None => format!("score at least {required}%"),
            },
            Requirement::TimeSpent {
                required_minutes,
                module,
            } => match module {
                Some(m) => format!("spend at least {required_minutes} minutes on '{m}'"),
                None => format!("spend at least {required_minutes} minutes"),
            },
            Requirement::AttemptCount { required, module } => match module {
                Some(m) => format!("make at least {required} attempts on '{m}'"),
                None => format!("make at least {required} attempts"),
            },
        }
    }
}

/// A single declared unlock rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockCondition {
    pub id: String,
    pub requirement: Requirement,
    /// Externally supplied current value. When unset the value is read from
    /// the evaluation context.
    #[serde(default)]
    pub current_value: Option<u32>,
}

impl UnlockCondition {
    pub fn new(id: impl Into<String>, requirement: Requirement) -> Self {
        Self {
            id: id.into(),
            requirement,
            current_value: None,
        }
    }

    pub fn with_current_value(mut self, value: u32) -> Self {
        self.current_value = Some(value);
        self
    }
}

/// Evaluation of one condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionStatus {
    pub condition_id: String,
    pub kind: ConditionKind,
    pub required_value: u32,
    pub current_value: u32,
    pub is_met: bool,
    pub description: String,
}

/// Learner state the evaluator reads. Owned by progress tracking.
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    pub completed_modules: BTreeSet<ModuleId>,
    pub completed_paths: BTreeSet<PathId>,
    pub unlocked_modules: BTreeSet<ModuleId>,
    pub unlocked_paths: BTreeSet<PathId>,
    pub module_progress: BTreeMap<ModuleId, ModuleProgress>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_completed_module(mut self, id: &str) -> Self {
        self.completed_modules.insert(ModuleId::new(id));
        self
    }

    pub fn with_completed_path(mut self, id: &str) -> Self {
        self.completed_paths.insert(PathId::new(id));
        self
    }

    pub fn with_unlocked_module(mut self, id: &str) -> Self {
        self.unlocked_modules.insert(ModuleId::new(id));
        self
    }

    pub fn with_progress(mut self, id: &str, progress: ModuleProgress) -> Self {
        self.module_progress.insert(ModuleId::new(id), progress);
        self
    }

    fn progress(&self, id: &ModuleId) -> Option<&ModuleProgress> {
        self.module_progress.get(id)
    }
}

/// The module or path being checked.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Module(&'a Module),
    Path(&'a LearningPath),
}

impl<'a> Target<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            Target::Module(m) => m.id.as_str(),
            Target::Path(p) => p.id.as_str(),
        }
    }

    fn conditions(&self) -> &'a [UnlockCondition] {
        match self {
            Target::Module(m) => &m.unlock_conditions,
            Target::Path(p) => &p.unlock_conditions,
        }
    }
}

/// Aggregate prerequisite state of a target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrerequisiteCheck {
    pub target_id: String,
    pub completed_prerequisites: Vec<String>,
    pub missing_prerequisites: Vec<String>,
    /// Modules that still have to be completed.
    pub blocking_modules: Vec<ModuleId>,
    pub conditions: Vec<ConditionStatus>,
    pub is_unlocked: bool,
    pub can_unlock: bool,
    /// Met conditions over all conditions, 0-100; 100 with no conditions.
    pub progress_percent: u32,
}

impl PrerequisiteCheck {
    pub fn unmet_conditions(&self) -> impl Iterator<Item = &ConditionStatus> {
        self.conditions.iter().filter(|c| !c.is_met)
    }

    /// Already unlocked, or ready to be.
    pub fn is_accessible(&self) -> bool {
        self.is_unlocked || self.can_unlock
    }
}

/// Evaluate a target's prerequisites and unlock conditions.
pub fn check(target: Target<'_>, context: &EvaluationContext) -> PrerequisiteCheck {
    let mut completed_prerequisites = Vec::new();
    let mut missing_prerequisites = Vec::new();
    let mut conditions = Vec::new();

    let implicit: Vec<Requirement> = match target {
        Target::Module(module) => module
            .prerequisites
            .iter()
            .map(|id| Requirement::ModuleCompletion { module: id.clone() })
            .collect(),
        Target::Path(path) => path
            .prerequisites
            .iter()
            .map(|id| Requirement::PathCompletion { path: id.clone() })
            .collect(),
    };

    for requirement in implicit {
        let prerequisite_id = match &requirement {
            Requirement::ModuleCompletion { module } => module.to_string(),
            Requirement::PathCompletion { path } => path.to_string(),
            _ => continue,
        };
        let condition =
            UnlockCondition::new(format!("prerequisite:{prerequisite_id}"), requirement);
        let status = evaluate_condition(&condition, target, context);
        if status.is_met {
            completed_prerequisites.push(prerequisite_id);
        } else {
            missing_prerequisites.push(prerequisite_id);
        }
        conditions.push(status);
    }

    for condition in target.conditions() {
        conditions.push(evaluate_condition(condition, target, context));
    }

    let blocking_modules = blocking_modules(target, context);

    let is_unlocked = match target {
        Target::Module(module) => context.unlocked_modules.contains(&module.id),
        Target::Path(path) => {
            context.unlocked_paths.contains(&path.id) || context.completed_paths.contains(&path.id)
        }
    };

    let met = conditions.iter().filter(|c| c.is_met).count();
    let progress_percent = if conditions.is_empty() {
        100
    } else {
        percentage(met as u32, conditions.len() as u32)
    };
    let can_unlock = !is_unlocked && met == conditions.len();

    tracing::debug!(
        target_id = target.id(),
        met,
        total = conditions.len(),
        can_unlock,
        "prerequisites evaluated"
    );

    PrerequisiteCheck {
        target_id: target.id().to_string(),
        completed_prerequisites,
        missing_prerequisites,
        blocking_modules,
        conditions,
        is_unlocked,
        can_unlock,
        progress_percent,
    }
}

fn blocking_modules(target: Target<'_>, context: &EvaluationContext) -> Vec<ModuleId> {
    let declared: &[ModuleId] = match target {
        Target::Module(module) => module.prerequisites.as_slice(),
        Target::Path(_) => &[],
    };
    let from_conditions = target
        .conditions()
        .iter()
        .filter_map(|c| match &c.requirement {
            Requirement::ModuleCompletion { module } => Some(module),
            _ => None,
        });

    let mut blocking = Vec::new();
    for id in declared.iter().chain(from_conditions) {
        if !context.completed_modules.contains(id) && !blocking.contains(id) {
            blocking.push(id.clone());
        }
    }
    blocking
}

/// Evaluate one condition against the context.
///
/// A referenced module or path with no recorded progress reads as 0 and so
/// leaves the condition unmet.
pub fn evaluate_condition(
    condition: &UnlockCondition,
    target: Target<'_>,
    context: &EvaluationContext,
) -> ConditionStatus {
    let requirement = &condition.requirement;
    let required_value = requirement.required_value();

    let current_value = condition.current_value.unwrap_or_else(|| match requirement {
        Requirement::ModuleCompletion { module } => {
            u32::from(context.completed_modules.contains(module))
        }
        Requirement::PathCompletion { path } => u32::from(context.completed_paths.contains(path)),
        Requirement::ScoreThreshold { module, .. } => {
            measure(target, module.as_ref(), context, Measure::Score)
        }
        Requirement::TimeSpent { module, .. } => {
            measure(target, module.as_ref(), context, Measure::Minutes)
        }
        Requirement::AttemptCount { module, .. } => {
            measure(target, module.as_ref(), context, Measure::Attempts)
        }
    });

    ConditionStatus {
        condition_id: condition.id.clone(),
        kind: requirement.kind(),
        required_value,
        current_value,
        is_met: current_value >= required_value,
        description: requirement.describe(),
    }
}

#[derive(Clone, Copy)]
enum Measure {
    Score,
    Minutes,
    Attempts,
}

fn read(progress: &ModuleProgress, measure: Measure) -> u32 {
    match measure {
        Measure::Score => progress.score.unwrap_or(0),
        Measure::Minutes => progress.time_spent_minutes,
        Measure::Attempts => progress.attempts,
    }
}

fn measure(
    target: Target<'_>,
    module: Option<&ModuleId>,
    context: &EvaluationContext,
    measure: Measure,
) -> u32 {
    if let Some(id) = module {
        return context.progress(id).map_or(0, |p| read(p, measure));
    }
    match target {
        Target::Module(m) => context.progress(&m.id).map_or(0, |p| read(p, measure)),
        Target::Path(path) => {
            let values = path
                .modules
                .iter()
                .filter_map(|m| context.progress(&m.id))
                .map(|p| read(p, measure));
            match measure {
                Measure::Score => values.max().unwrap_or(0),
                Measure::Minutes | Measure::Attempts => saturating_sum(values),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_condition(required: u32) -> UnlockCondition {
        UnlockCondition::new(
            "score-80",
            Requirement::ScoreThreshold {
                required,
                module: None,
            },
        )
    }

    #[test]
    fn no_conditions_is_vacuously_unlockable() {
        let module = Module::new("intro", "Intro");
        let check = check(Target::Module(&module), &EvaluationContext::new());
        assert!(check.can_unlock);
        assert_eq!(check.progress_percent, 100);
        assert!(check.conditions.is_empty());
    }

    #[test]
    fn score_threshold_updates_with_current_value() {
        let module = Module::new("tarts", "Tarts")
            .with_condition(score_condition(80).with_current_value(75));
        let ctx = EvaluationContext::new();

        let before = check(Target::Module(&module), &ctx);
        assert!(!before.conditions[0].is_met);
        assert!(!before.can_unlock);
        let unmet: Vec<_> = before
            .unmet_conditions()
            .map(|c| c.condition_id.as_str())
            .collect();
        assert_eq!(unmet, vec!["score-80"]);
        assert_eq!(before.progress_percent, 0);

        let module = Module::new("tarts", "Tarts")
            .with_condition(score_condition(80).with_current_value(85));
        let after = check(Target::Module(&module), &ctx);
        assert!(after.conditions[0].is_met);
        assert!(after.can_unlock);
        assert_eq!(after.unmet_conditions().count(), 0);
    }

    #[test]
    fn score_threshold_reads_progress_when_no_current_value() {
        let module = Module::new("tarts", "Tarts").with_condition(UnlockCondition::new(
            "pastry-cream",
            Requirement::ScoreThreshold {
                required: 80,
                module: Some(ModuleId::new("cream")),
            },
        ));
        let mut progress = ModuleProgress::default();
        progress.record_score(90);
        let ctx = EvaluationContext::new().with_progress("cream", progress);

        let result = check(Target::Module(&module), &ctx);
        assert_eq!(result.conditions[0].current_value, 90);
        assert!(result.can_unlock);
    }

    #[test]
    fn missing_referenced_module_is_unmet() {
        let module = Module::new("b", "B").with_prerequisites(&["ghost"]);
        let result = check(Target::Module(&module), &EvaluationContext::new());
        assert!(!result.can_unlock);
        assert_eq!(result.missing_prerequisites, vec!["ghost".to_string()]);
        assert_eq!(result.blocking_modules, vec![ModuleId::new("ghost")]);
    }

    #[test]
    fn prerequisites_split_into_completed_and_missing() {
        let module = Module::new("c", "C").with_prerequisites(&["a", "b"]);
        let ctx = EvaluationContext::new().with_completed_module("a");
        let result = check(Target::Module(&module), &ctx);
        assert_eq!(result.completed_prerequisites, vec!["a".to_string()]);
        assert_eq!(result.missing_prerequisites, vec!["b".to_string()]);
        assert_eq!(result.progress_percent, 50);
        assert!(!result.can_unlock);
    }

    #[test]
    fn unlocked_target_cannot_unlock_again() {
        let module = Module::new("a", "A");
        let ctx = EvaluationContext::new().with_unlocked_module("a");
        let result = check(Target::Module(&module), &ctx);
        assert!(result.is_unlocked);
        assert!(!result.can_unlock);
        assert!(result.is_accessible());
    }

    #[test]
    fn time_and_attempt_thresholds() {
        let module = Module::new("laminate", "Lamination")
            .with_condition(UnlockCondition::new(
                "time",
                Requirement::TimeSpent {
                    required_minutes: 30,
                    module: None,
                },
            ))
            .with_condition(UnlockCondition::new(
                "tries",
                Requirement::AttemptCount {
                    required: 2,
                    module: None,
                },
            ));
        let progress = ModuleProgress {
            time_spent_minutes: 45,
            attempts: 1,
            ..Default::default()
        };
        let ctx = EvaluationContext::new().with_progress("laminate", progress);
        let result = check(Target::Module(&module), &ctx);
        assert!(result.conditions[0].is_met);
        assert!(!result.conditions[1].is_met);
        assert_eq!(result.progress_percent, 50);
    }

    #[test]
    fn path_prerequisites_use_path_id_space() {
        let mut path = LearningPath::new("advanced", "Advanced");
        path.prerequisites = vec![PathId::new("basics")];

        // A module with the same id as the prerequisite path does not count.
        let ctx = EvaluationContext::new().with_completed_module("basics");
        assert!(!check(Target::Path(&path), &ctx).can_unlock);

        let ctx = EvaluationContext::new().with_completed_path("basics");
        let result = check(Target::Path(&path), &ctx);
        assert!(result.can_unlock);
        assert_eq!(result.completed_prerequisites, vec!["basics".to_string()]);
    }

    #[test]
    fn path_measures_aggregate_over_modules() {
        let mut path = LearningPath::new("p", "P")
            .with_modules(vec![Module::new("a", "A"), Module::new("b", "B")]);
        path.unlock_conditions.push(UnlockCondition::new(
            "time",
            Requirement::TimeSpent {
                required_minutes: 60,
                module: None,
            },
        ));
        let ctx = EvaluationContext::new()
            .with_progress(
                "a",
                ModuleProgress {
                    time_spent_minutes: 40,
                    ..Default::default()
                },
            )
            .with_progress(
                "b",
                ModuleProgress {
                    time_spent_minutes: 25,
                    ..Default::default()
                },
            );
        let result = check(Target::Path(&path), &ctx);
        assert_eq!(result.conditions[0].current_value, 65);
        assert!(result.can_unlock);
    }

    #[test]
    fn path_time_total_saturates() {
        let mut path = LearningPath::new("p", "P")
            .with_modules(vec![Module::new("a", "A"), Module::new("b", "B")]);
        path.unlock_conditions.push(UnlockCondition::new(
            "time",
            Requirement::TimeSpent {
                required_minutes: 60,
                module: None,
            },
        ));
        let long = ModuleProgress {
            time_spent_minutes: u32::MAX,
            ..Default::default()
        };
        let ctx = EvaluationContext::new()
            .with_progress("a", long.clone())
            .with_progress("b", long);
        let result = check(Target::Path(&path), &ctx);
        assert_eq!(result.conditions[0].current_value, u32::MAX);
        assert!(result.can_unlock);
    }

    #[test]
    fn unlock_condition_parses_from_toml() {
        let condition: UnlockCondition = toml::from_str(
            r#"
id = "cream-score"
requirement = { type = "score_threshold", required = 80, module = "cream" }
"#,
        )
        .unwrap();
        assert_eq!(condition.requirement.kind(), ConditionKind::ScoreThreshold);
        assert_eq!(condition.requirement.required_value(), 80);
    }
}
