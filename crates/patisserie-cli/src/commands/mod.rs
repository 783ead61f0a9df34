pub mod browse;
pub mod init;
pub mod progress;
pub mod quiz;
pub mod validate;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use patisserie_core::attempts::AttemptStore;
use patisserie_core::completion::ProgressTracker;
use patisserie_core::config::{load_config_from, PatisserieConfig};
use patisserie_core::content::{load_or_bundled, ContentLibrary};
use patisserie_core::storage::KeyValueStore;

/// Config, content and storage shared by the commands.
pub struct Session {
    pub config: PatisserieConfig,
    pub library: ContentLibrary,
    store: Arc<dyn KeyValueStore>,
}

impl Session {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config = load_config_from(config_path.as_deref())?;
        let library = load_or_bundled(config.content.as_deref());
        tracing::debug!(
            "loaded {} paths, {} quizzes, {} techniques; data in {}",
            library.paths.len(),
            library.quizzes.len(),
            library.techniques.len(),
            config.data_dir.display()
        );
        let store: Arc<dyn KeyValueStore> = Arc::new(config.store());
        Ok(Self {
            config,
            library,
            store,
        })
    }

    pub fn tracker(&self) -> ProgressTracker {
        ProgressTracker::new(self.store.clone(), self.library.paths.clone())
    }

    pub fn attempts(&self) -> AttemptStore {
        AttemptStore::new(self.store.clone())
    }
}

/// Output formats accepted by `quiz` and `progress`.
pub const FORMATS: &[&str] = &["text", "json", "markdown", "md", "html"];

pub fn ensure_format(format: &str) -> Result<()> {
    anyhow::ensure!(
        FORMATS.contains(&format),
        "unknown format: {format} (expected one of: {})",
        FORMATS.join(", ")
    );
    Ok(())
}
