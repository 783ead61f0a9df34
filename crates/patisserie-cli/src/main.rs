//! patisserie CLI: browse pastry content, score quizzes and track progress.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "patisserie",
    version,
    about = "Pastry technique quizzes and learning paths"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Filters shared by `paths` and `techniques`.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Case-insensitive search over title, description and tags
    #[arg(long)]
    search: Option<String>,

    /// Exact category
    #[arg(long)]
    category: Option<String>,

    /// beginner, intermediate or advanced
    #[arg(long)]
    difficulty: Option<String>,

    /// Required tag (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,

    #[arg(long)]
    min_rating: Option<f32>,

    #[arg(long)]
    max_rating: Option<f32>,

    /// Minimum duration in minutes
    #[arg(long)]
    min_duration: Option<u32>,

    /// Maximum duration in minutes
    #[arg(long)]
    max_duration: Option<u32>,

    /// Only featured entries
    #[arg(long)]
    featured: bool,

    /// Only paths that award a certificate
    #[arg(long)]
    certificate: bool,

    /// Sort key: name, rating, difficulty, duration, students, completion-rate, created, updated
    #[arg(long, default_value = "name")]
    sort: String,

    /// Sort descending
    #[arg(long)]
    desc: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and content pack
    Init,

    /// Validate content TOML files
    Validate {
        /// Path to a content file or directory
        #[arg(long)]
        content: PathBuf,
    },

    /// List learning paths
    Paths {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// List techniques
    Techniques {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Score an answer sheet and record the attempt
    Quiz {
        /// Quiz ID
        #[arg(long)]
        quiz: String,

        /// JSON answer sheet keyed by question index
        #[arg(long)]
        answers: PathBuf,

        /// Output format: text, json, markdown, html
        #[arg(long, default_value = "text")]
        format: String,

        /// Write the report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Path of the module to complete when the quiz is passed
        #[arg(long, requires = "module")]
        path: Option<String>,

        /// Module to complete when the quiz is passed
        #[arg(long, requires = "path")]
        module: Option<String>,
    },

    /// Attempt statistics for a quiz
    Stats {
        /// Quiz ID
        #[arg(long)]
        quiz: String,
    },

    /// Start a learning path, or a module within it
    Start {
        #[arg(long)]
        path: String,

        #[arg(long)]
        module: Option<String>,
    },

    /// Complete a module and unlock what depends on it
    Complete {
        #[arg(long)]
        path: String,

        #[arg(long)]
        module: String,

        /// Score achieved, 0-100
        #[arg(long)]
        score: Option<u32>,

        /// Minutes spent, recorded before completing
        #[arg(long)]
        minutes: Option<u32>,
    },

    /// Show prerequisite status for a path or module
    Check {
        #[arg(long)]
        path: String,

        #[arg(long)]
        module: Option<String>,
    },

    /// Clear a module's progress (unlocks are kept)
    Reset {
        #[arg(long)]
        path: String,

        #[arg(long)]
        module: String,
    },

    /// Show progress across learning paths
    Progress {
        /// Output format: text, json, markdown, html
        #[arg(long, default_value = "text")]
        format: String,

        /// Write the report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("patisserie=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { content } => commands::validate::execute(content),
        Commands::Paths { filter } => commands::browse::paths(filter, config),
        Commands::Techniques { filter } => commands::browse::techniques(filter, config),
        Commands::Quiz {
            quiz,
            answers,
            format,
            output,
            path,
            module,
        } => commands::quiz::execute(quiz, answers, format, output, path.zip(module), config),
        Commands::Stats { quiz } => commands::quiz::stats(quiz, config),
        Commands::Start { path, module } => commands::progress::start(path, module, config),
        Commands::Complete {
            path,
            module,
            score,
            minutes,
        } => commands::progress::complete(path, module, score, minutes, config),
        Commands::Check { path, module } => commands::progress::check(path, module, config),
        Commands::Reset { path, module } => commands::progress::reset(path, module, config),
        Commands::Progress { format, output } => {
            commands::progress::show(format, output, config)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
