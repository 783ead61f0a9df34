//! TOML content packs.
//!
//! A pack holds `[[paths]]` (with nested `[[paths.modules]]`), `[[quizzes]]`
//! and `[[techniques]]`. Packs load from a single file or a directory tree,
//! and the bundled pack compiled into the crate stands in whenever
//! configured content is missing or unreadable.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::curriculum::{LearningPath, ModuleId, PathId, Technique};
use crate::model::{AnswerKey, ChoiceKey, Question, Quiz};
use crate::prerequisites::{Requirement, UnlockCondition};

/// Source of the pack compiled into the crate.
pub const BUNDLED: &str = include_str!("../content/bundled.toml");

/// Everything the learner can browse, study and be quizzed on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentLibrary {
    #[serde(default)]
    pub paths: Vec<LearningPath>,
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
    #[serde(default)]
    pub techniques: Vec<Technique>,
}

impl ContentLibrary {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.quizzes.is_empty() && self.techniques.is_empty()
    }

    pub fn path(&self, id: &PathId) -> Option<&LearningPath> {
        self.paths.iter().find(|p| &p.id == id)
    }

    pub fn quiz(&self, id: &str) -> Option<&Quiz> {
        self.quizzes.iter().find(|q| q.id == id)
    }

    pub fn technique(&self, id: &str) -> Option<&Technique> {
        self.techniques.iter().find(|t| t.id == id)
    }

    /// Append another library's entries.
    pub fn merge(&mut self, other: ContentLibrary) {
        self.paths.extend(other.paths);
        self.quizzes.extend(other.quizzes);
        self.techniques.extend(other.techniques);
    }
}

/// Parse a single content file.
pub fn parse_content_file(path: &Path) -> Result<ContentLibrary> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read content file: {}", path.display()))?;

    parse_content_str(&content, path)
}

/// Parse a TOML string into a library.
pub fn parse_content_str(content: &str, source_path: &Path) -> Result<ContentLibrary> {
    toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))
}

/// Load a content file, or every `.toml` file under a directory.
///
/// Inside a directory, files that fail to parse are skipped with a warning.
pub fn load_content(path: &Path) -> Result<ContentLibrary> {
    if path.is_dir() {
        load_content_directory(path)
    } else {
        parse_content_file(path)
    }
}

/// Recursively load all `.toml` content files from a directory.
pub fn load_content_directory(dir: &Path) -> Result<ContentLibrary> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.path());

    let mut library = ContentLibrary::default();
    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            library.merge(load_content_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_content_file(&path) {
                Ok(pack) => library.merge(pack),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(library)
}

/// The pack compiled into the crate.
pub fn bundled() -> ContentLibrary {
    match parse_content_str(BUNDLED, Path::new("bundled.toml")) {
        Ok(library) => library,
        Err(e) => {
            tracing::error!("bundled content is unreadable: {e:#}");
            ContentLibrary::default()
        }
    }
}

/// Load configured content, falling back to the bundled pack.
pub fn load_or_bundled(path: Option<&Path>) -> ContentLibrary {
    let Some(path) = path else {
        return bundled();
    };
    match load_content(path) {
        Ok(library) if !library.is_empty() => library,
        Ok(_) => {
            tracing::warn!("no content found in {}, using bundled content", path.display());
            bundled()
        }
        Err(e) => {
            tracing::warn!("{e:#}; using bundled content");
            bundled()
        }
    }
}

/// A warning from content validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// Id of the path, module, quiz, question or technique concerned.
    pub item_id: Option<String>,
    pub message: String,
}

impl ValidationWarning {
    fn new(item_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            item_id: Some(item_id.into()),
            message: message.into(),
        }
    }
}

/// Validate a library for broken references and unanswerable questions.
pub fn validate_content(library: &ContentLibrary) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let path_ids: HashSet<&PathId> = library.paths.iter().map(|p| &p.id).collect();
    let module_ids: HashSet<&ModuleId> = library
        .paths
        .iter()
        .flat_map(|p| p.modules.iter().map(|m| &m.id))
        .collect();
    let quiz_ids: HashSet<&str> = library.quizzes.iter().map(|q| q.id.as_str()).collect();

    // Duplicate ids
    duplicates(library.paths.iter().map(|p| p.id.as_str()), "path", &mut warnings);
    duplicates(
        library
            .paths
            .iter()
            .flat_map(|p| p.modules.iter().map(|m| m.id.as_str())),
        "module",
        &mut warnings,
    );
    duplicates(library.quizzes.iter().map(|q| q.id.as_str()), "quiz", &mut warnings);
    duplicates(
        library.techniques.iter().map(|t| t.id.as_str()),
        "technique",
        &mut warnings,
    );

    for path in &library.paths {
        if path.modules.is_empty() {
            warnings.push(ValidationWarning::new(path.id.as_str(), "path has no modules"));
        }
        for prerequisite in &path.prerequisites {
            if prerequisite == &path.id {
                warnings.push(ValidationWarning::new(
                    path.id.as_str(),
                    "path lists itself as a prerequisite",
                ));
            } else if !path_ids.contains(prerequisite) {
                warnings.push(ValidationWarning::new(
                    path.id.as_str(),
                    format!("unknown prerequisite path: {prerequisite}"),
                ));
            }
        }
        check_conditions(
            path.id.as_str(),
            &path.unlock_conditions,
            &path_ids,
            &module_ids,
            &mut warnings,
        );

        for module in &path.modules {
            for prerequisite in &module.prerequisites {
                if !module_ids.contains(prerequisite) {
                    warnings.push(ValidationWarning::new(
                        module.id.as_str(),
                        format!("unknown prerequisite module: {prerequisite}"),
                    ));
                }
            }
            check_conditions(
                module.id.as_str(),
                &module.unlock_conditions,
                &path_ids,
                &module_ids,
                &mut warnings,
            );
            if let Some(quiz) = &module.quiz {
                if !quiz_ids.contains(quiz.as_str()) {
                    warnings.push(ValidationWarning::new(
                        module.id.as_str(),
                        format!("unknown quiz: {quiz}"),
                    ));
                }
            }
        }
    }

    for technique in &library.techniques {
        if let Some(quiz) = &technique.quiz {
            if !quiz_ids.contains(quiz.as_str()) {
                warnings.push(ValidationWarning::new(
                    technique.id.as_str(),
                    format!("unknown quiz: {quiz}"),
                ));
            }
        }
    }

    for quiz in &library.quizzes {
        validate_quiz(quiz, &mut warnings);
    }

    for cycle in prerequisite_cycles(library) {
        let chain: Vec<&str> = cycle.iter().map(|id| id.as_str()).collect();
        warnings.push(ValidationWarning::new(
            chain[0],
            format!("module prerequisite cycle: {}", chain.join(" -> ")),
        ));
    }

    warnings
}

fn duplicates<'a>(
    ids: impl Iterator<Item = &'a str>,
    kind: &str,
    warnings: &mut Vec<ValidationWarning>,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            warnings.push(ValidationWarning::new(id, format!("duplicate {kind} ID: {id}")));
        }
    }
}

fn check_conditions(
    owner: &str,
    conditions: &[UnlockCondition],
    path_ids: &HashSet<&PathId>,
    module_ids: &HashSet<&ModuleId>,
    warnings: &mut Vec<ValidationWarning>,
) {
    for condition in conditions {
        let unknown = match &condition.requirement {
            Requirement::ModuleCompletion { module } => {
                (!module_ids.contains(module)).then(|| format!("module {module}"))
            }
            Requirement::PathCompletion { path } => {
                (!path_ids.contains(path)).then(|| format!("path {path}"))
            }
            Requirement::ScoreThreshold { module, .. }
            | Requirement::TimeSpent { module, .. }
            | Requirement::AttemptCount { module, .. } => module
                .as_ref()
                .filter(|m| !module_ids.contains(m))
                .map(|m| format!("module {m}")),
        };
        if let Some(unknown) = unknown {
            warnings.push(ValidationWarning::new(
                owner,
                format!("condition '{}' references unknown {unknown}", condition.id),
            ));
        }
        if condition.requirement.required_value() == 0 {
            warnings.push(ValidationWarning::new(
                owner,
                format!("condition '{}' requires 0 and is always met", condition.id),
            ));
        }
    }
}

fn validate_quiz(quiz: &Quiz, warnings: &mut Vec<ValidationWarning>) {
    if quiz.questions.is_empty() {
        warnings.push(ValidationWarning::new(quiz.id.as_str(), "quiz has no questions"));
    }
    if quiz.passing_score.is_some_and(|p| p > 100) {
        warnings.push(ValidationWarning::new(
            quiz.id.as_str(),
            "passing_score is above 100",
        ));
    }
    if quiz.max_attempts == Some(0) {
        warnings.push(ValidationWarning::new(
            quiz.id.as_str(),
            "max_attempts is 0, the quiz can never be taken",
        ));
    }

    let mut seen = HashSet::new();
    for question in &quiz.questions {
        if !seen.insert(question.id.as_str()) {
            warnings.push(ValidationWarning::new(
                question.id.as_str(),
                format!("duplicate question ID in quiz {}: {}", quiz.id, question.id),
            ));
        }
        if question.points == 0 {
            warnings.push(ValidationWarning::new(
                question.id.as_str(),
                "question is worth 0 points",
            ));
        }
        if question.prompt.trim().is_empty() {
            warnings.push(ValidationWarning::new(question.id.as_str(), "prompt is empty"));
        }
        if let Some(problem) = answer_key_problem(question) {
            warnings.push(ValidationWarning::new(question.id.as_str(), problem));
        }
    }
}

/// Describe why a question cannot be answered correctly, if it cannot.
fn answer_key_problem(question: &Question) -> Option<String> {
    match &question.answer {
        AnswerKey::MultipleChoice { options, correct } => {
            let indices: Vec<usize> = match correct {
                ChoiceKey::Single(index) => vec![*index],
                ChoiceKey::Set(set) => set.clone(),
            };
            if indices.is_empty() {
                return Some("multiple-choice key has no correct options".into());
            }
            let unique: HashSet<usize> = indices.iter().copied().collect();
            if unique.len() != indices.len() {
                return Some("multiple-choice key repeats an option".into());
            }
            if !options.is_empty() {
                if let Some(bad) = indices.iter().find(|i| **i >= options.len()) {
                    return Some(format!(
                        "correct option {bad} is out of range for {} options",
                        options.len()
                    ));
                }
            }
            None
        }
        AnswerKey::TrueFalse { .. } => None,
        AnswerKey::Sequence {
            items,
            correct_order,
        } => {
            if correct_order.is_empty() {
                Some("sequence has no correct order".into())
            } else if !items.is_empty() && items.len() != correct_order.len() {
                Some(format!(
                    "sequence has {} items but correct_order has {}",
                    items.len(),
                    correct_order.len()
                ))
            } else {
                None
            }
        }
        AnswerKey::DragDrop { items, targets } => {
            if items.is_empty() {
                Some("drag-drop has no items".into())
            } else if items.len() != targets.len() {
                Some(format!(
                    "drag-drop has {} items but {} targets",
                    items.len(),
                    targets.len()
                ))
            } else {
                let unique: HashSet<&String> = items.iter().collect();
                (unique.len() != items.len()).then(|| "drag-drop repeats an item".into())
            }
        }
        AnswerKey::FillBlank { blanks } => {
            if blanks.is_empty() {
                return Some("fill-blank has no blanks".into());
            }
            let unique: HashSet<&str> = blanks.iter().map(|b| b.id.as_str()).collect();
            (unique.len() != blanks.len()).then(|| "fill-blank repeats a blank ID".into())
        }
        AnswerKey::Matching { pairs } => {
            if pairs.is_empty() {
                return Some("matching has no pairs".into());
            }
            let unique: HashSet<&str> = pairs.iter().map(|p| p.left.as_str()).collect();
            (unique.len() != pairs.len()).then(|| "matching repeats a left-hand item".into())
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Every cycle in the module prerequisite graph, each as a closed chain.
fn prerequisite_cycles(library: &ContentLibrary) -> Vec<Vec<&ModuleId>> {
    let graph: BTreeMap<&ModuleId, Vec<&ModuleId>> = library
        .paths
        .iter()
        .flat_map(|p| &p.modules)
        .map(|m| (&m.id, m.prerequisites.iter().collect()))
        .collect();

    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    let mut cycles = Vec::new();
    for node in graph.keys().copied() {
        visit(node, &graph, &mut marks, &mut stack, &mut cycles);
    }
    cycles
}

fn visit<'a>(
    node: &'a ModuleId,
    graph: &BTreeMap<&'a ModuleId, Vec<&'a ModuleId>>,
    marks: &mut HashMap<&'a ModuleId, Mark>,
    stack: &mut Vec<&'a ModuleId>,
    cycles: &mut Vec<Vec<&'a ModuleId>>,
) {
    match marks.get(node) {
        Some(Mark::Done) => return,
        Some(Mark::Visiting) => {
            if let Some(start) = stack.iter().position(|n| *n == node) {
                let mut cycle = stack[start..].to_vec();
                cycle.push(node);
                cycles.push(cycle);
            }
            return;
        }
        None => {}
    }

    marks.insert(node, Mark::Visiting);
    stack.push(node);
    if let Some(prerequisites) = graph.get(node) {
        for next in prerequisites.iter().copied() {
            visit(next, graph, marks, stack, cycles);
        }
    }
    stack.pop();
    marks.insert(node, Mark::Done);
}
