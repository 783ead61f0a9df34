//! The `patisserie validate` command.

use std::path::PathBuf;

use anyhow::Result;

use patisserie_core::content::{load_content, validate_content};

pub fn execute(content_path: PathBuf) -> Result<()> {
    let library = load_content(&content_path)?;
    println!(
        "Content: {} paths, {} quizzes, {} techniques",
        library.paths.len(),
        library.quizzes.len(),
        library.techniques.len()
    );
    anyhow::ensure!(
        !library.is_empty(),
        "no content found in {}",
        content_path.display()
    );

    let warnings = validate_content(&library);
    for w in &warnings {
        let prefix = w
            .item_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("All content valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
