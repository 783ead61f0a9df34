//! Learner configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::Quiz;
use crate::scoring::{PassPolicy, Scorer, DEFAULT_PASSING_THRESHOLD};
use crate::storage::JsonFileStore;

/// File name searched for in the current directory.
pub const CONFIG_FILE_NAME: &str = "patisserie.toml";

/// Top-level patisserie configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatisserieConfig {
    /// Directory holding one JSON file per storage key.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Content file or directory. The bundled pack is used when unset.
    #[serde(default)]
    pub content: Option<PathBuf>,
    /// Recorded on every quiz attempt.
    #[serde(default = "default_user")]
    pub user_id: String,
    /// Fixed pass mark, 0-100.
    #[serde(default = "default_threshold")]
    pub passing_threshold: u32,
    #[serde(default)]
    pub pass_policy: PassPolicy,
    /// Attempt limit for quizzes that do not set their own.
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: u32,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./.patisserie")
}
fn default_user() -> String {
    "local".to_string()
}
fn default_threshold() -> u32 {
    DEFAULT_PASSING_THRESHOLD
}
fn default_max_attempts() -> u32 {
    3
}

impl Default for PatisserieConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            content: None,
            user_id: default_user(),
            passing_threshold: default_threshold(),
            pass_policy: PassPolicy::default(),
            default_max_attempts: default_max_attempts(),
        }
    }
}

impl PatisserieConfig {
    pub fn scorer(&self) -> Scorer {
        Scorer::new(self.passing_threshold, self.pass_policy)
    }

    pub fn max_attempts_for(&self, quiz: &Quiz) -> u32 {
        quiz.max_attempts.unwrap_or(self.default_max_attempts)
    }

    pub fn store(&self) -> JsonFileStore {
        JsonFileStore::new(&self.data_dir)
    }

    /// Apply environment overrides and resolve `${VAR}` references.
    fn resolve(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup("PATISSERIE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(user) = lookup("PATISSERIE_USER") {
            self.user_id = user;
        }

        self.data_dir = resolve_path(&self.data_dir, &lookup);
        self.content = self.content.as_deref().map(|c| resolve_path(c, &lookup));
        self.user_id = resolve_env_vars(&self.user_id, &lookup);
        self
    }
}

/// Resolve references like `${VAR_NAME}` in a string. Unset variables
/// resolve to the empty string.
fn resolve_env_vars(s: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = lookup(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_path(path: &Path, lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy(), lookup))
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order without a path:
/// 1. `patisserie.toml` in the current directory
/// 2. `~/.config/patisserie/config.toml`
///
/// Environment overrides: `PATISSERIE_DATA_DIR`, `PATISSERIE_USER`.
pub fn load_config_from(path: Option<&Path>) -> Result<PatisserieConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<PatisserieConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => PatisserieConfig::default(),
    };

    Ok(config.resolve(env_lookup))
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("patisserie"))
}
