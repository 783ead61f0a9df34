//! The `patisserie init` command.

use std::path::Path;

use anyhow::Result;

use patisserie_core::config::CONFIG_FILE_NAME;
use patisserie_core::content::BUNDLED;

pub fn execute() -> Result<()> {
    if Path::new(CONFIG_FILE_NAME).exists() {
        println!("{CONFIG_FILE_NAME} already exists, skipping.");
    } else {
        std::fs::write(CONFIG_FILE_NAME, SAMPLE_CONFIG)?;
        println!("Created {CONFIG_FILE_NAME}");
    }

    std::fs::create_dir_all("content")?;
    let pack_path = Path::new("content/pastry.toml");
    if pack_path.exists() {
        println!("content/pastry.toml already exists, skipping.");
    } else {
        std::fs::write(pack_path, BUNDLED)?;
        println!("Created content/pastry.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit content/pastry.toml with your own paths and quizzes");
    println!("  2. Run: patisserie validate --content content");
    println!("  3. Run: patisserie start --path pastry-foundations");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# patisserie configuration

data_dir = "./.patisserie"
content = "./content"
user_id = "${USER}"

# Score (0-100) needed to pass a quiz.
passing_threshold = 70
# "fixed" always applies passing_threshold; "quiz" prefers a quiz's own passing_score.
pass_policy = "fixed"
default_max_attempts = 3
"#;
