//! devmind CLI - project context for coding agents

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod output;

use commands::Workspace;
use devmind::config::{self, DevmindConfig};
use output::OutputMode;

#[derive(Parser)]
#[command(name = "devmind")]
#[command(version)]
#[command(about = "Structured, queryable context for a Python project")]
#[command(long_about = r#"
devmind indexes a Python source tree into a local SQLite database and answers
questions about it:
  • Project overview (files, lines, functions, TODO markers)
  • Function search by name or docstring
  • Function lookup with related files
  • Recent git changes

Example usage:
  devmind index --path ./myproject
  devmind search parse
  devmind function main
  devmind serve            # MCP tools over stdio for coding agents
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    /// Project root (defaults to `path` in devmind.toml, then the current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Path to the database file (defaults to <root>/.devmind/devmind.db)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(long, global = true, default_value = "devmind.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the project and serve MCP tools on stdin/stdout
    Serve,

    /// Index the project into the database
    Index,

    /// Show project statistics
    Overview,

    /// Search functions by name or docstring (case-insensitive)
    Search {
        /// Substring to look for
        query: String,
    },

    /// Show a function and the files related to it
    Function {
        /// Exact function name
        name: String,
    },

    /// List files related to a file through imports
    Related {
        /// File path relative to the project root
        file: String,
    },

    /// Show recent git changes
    Changes {
        /// Focus on one file
        #[arg(short, long)]
        file: Option<String>,

        /// Number of commits to include
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Stdout is reserved for command output and MCP messages.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = config::load_config(Some(&cli.config))?.unwrap_or_default();
    let workspace = resolve_workspace(cli.path, cli.database, config);
    let mode = OutputMode::from_flag(cli.json);

    let result = match cli.command {
        Commands::Serve => commands::run_serve(&workspace),
        Commands::Index => commands::run_index(&workspace, mode),
        Commands::Overview => commands::run_overview(&workspace, mode),
        Commands::Search { query } => commands::run_search(&workspace, &query, mode),
        Commands::Function { name } => commands::run_function(&workspace, &name, mode),
        Commands::Related { file } => commands::run_related(&workspace, &file, mode),
        Commands::Changes { file, limit } => {
            commands::run_changes(&workspace, file.as_deref(), limit, mode)
        }
    };

    match result {
        Err(e) if mode.is_human() => {
            devmind::ui::error(&format!("{:#}", e));
            std::process::exit(1);
        }
        other => other,
    }
}

/// CLI flags win over devmind.toml, which wins over defaults
fn resolve_workspace(
    path: Option<PathBuf>,
    database: Option<PathBuf>,
    config: DevmindConfig,
) -> Workspace {
    let root = path
        .or_else(|| config.path.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let database = database
        .or_else(|| config.database.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| config::default_database_path_in(&root));

    Workspace { root, database, config }
}
