//! Learning paths, modules and the technique library.
//!
//! Module and path identifiers are distinct types so a prerequisite list can
//! never mix the two id spaces.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::prerequisites::UnlockCondition;

/// Identifier of a module within the curriculum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of a learning path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathId(String);

impl PathId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PathId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Difficulty level, ordered Beginner < Intermediate < Advanced.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    #[serde(alias = "Beginner")]
    Beginner,
    #[serde(alias = "Intermediate")]
    Intermediate,
    #[serde(alias = "Advanced")]
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Beginner => write!(f, "Beginner"),
            Difficulty::Intermediate => write!(f, "Intermediate"),
            Difficulty::Advanced => write!(f, "Advanced"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// The kind of content a module delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Video,
    #[default]
    Reading,
    Quiz,
    Practice,
    Assessment,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleKind::Video => write!(f, "video"),
            ModuleKind::Reading => write!(f, "reading"),
            ModuleKind::Quiz => write!(f, "quiz"),
            ModuleKind::Practice => write!(f, "practice"),
            ModuleKind::Assessment => write!(f, "assessment"),
        }
    }
}

/// A single unit of content within a learning path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: ModuleKind,
    #[serde(default)]
    pub duration: String,
    /// Quiz taken to complete this module, if any.
    #[serde(default)]
    pub quiz: Option<String>,
    /// Modules that must be completed first.
    #[serde(default)]
    pub prerequisites: Vec<ModuleId>,
    #[serde(default)]
    pub unlock_conditions: Vec<UnlockCondition>,
}

impl Module {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: ModuleId::new(id),
            title: title.into(),
            description: String::new(),
            kind: ModuleKind::default(),
            duration: String::new(),
            quiz: None,
            prerequisites: Vec::new(),
            unlock_conditions: Vec::new(),
        }
    }

    pub fn with_prerequisites(mut self, prerequisites: &[&str]) -> Self {
        self.prerequisites = prerequisites.iter().map(|id| ModuleId::new(*id)).collect();
        self
    }

    pub fn with_condition(mut self, condition: UnlockCondition) -> Self {
        self.unlock_conditions.push(condition);
        self
    }
}

/// An ordered collection of modules forming a full course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningPath {
    pub id: PathId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Free-form duration such as "6 weeks" or "90 minutes".
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub instructor: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub student_count: u32,
    /// Share of enrolled students who finished, 0-100.
    #[serde(default)]
    pub completion_rate: f32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub certificate: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modules: Vec<Module>,
    /// Paths that must be completed first.
    #[serde(default)]
    pub prerequisites: Vec<PathId>,
    #[serde(default)]
    pub unlock_conditions: Vec<UnlockCondition>,
}

impl LearningPath {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: PathId::new(id),
            title: title.into(),
            description: String::new(),
            category: String::new(),
            difficulty: Difficulty::default(),
            duration: String::new(),
            instructor: String::new(),
            rating: 0.0,
            student_count: 0,
            completion_rate: 0.0,
            tags: Vec::new(),
            featured: false,
            certificate: false,
            created_at: None,
            updated_at: None,
            modules: Vec::new(),
            prerequisites: Vec::new(),
            unlock_conditions: Vec::new(),
        }
    }

    pub fn with_modules(mut self, modules: Vec<Module>) -> Self {
        self.modules = modules;
        self
    }

    pub fn module(&self, id: &ModuleId) -> Option<&Module> {
        self.modules.iter().find(|m| &m.id == id)
    }

    pub fn contains_module(&self, id: &ModuleId) -> bool {
        self.module(id).is_some()
    }
}

/// A pastry technique in the reference library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technique {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub steps: Vec<String>,
    /// Quiz covering this technique, if any.
    #[serde(default)]
    pub quiz: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
