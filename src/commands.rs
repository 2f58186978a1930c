use crate::output::{OutputMode, emit_success, is_quiet};
use devmind::config::{DevmindConfig, ensure_db_dir};
use devmind::server::{McpService, ToolRegistry};
use devmind::ui::{self, Icons};
use devmind::{FactSet, GitHistory, Indexer, SqliteStore};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Resolved project root, database location and config
pub struct Workspace {
    pub root: PathBuf,
    pub database: PathBuf,
    pub config: DevmindConfig,
}

impl Workspace {
    fn index_and_save(&self) -> anyhow::Result<(SqliteStore, FactSet)> {
        let indexer = Indexer::with_extra_ignores(&self.config.extra_ignore)?;
        let facts = indexer.index(&self.root)?;

        ensure_db_dir(&self.database)?;
        let store = SqliteStore::open(&self.database)?;
        store.save(&facts)?;
        Ok((store, facts))
    }

    fn open_existing_store(&self) -> anyhow::Result<SqliteStore> {
        if !self.database.exists() {
            anyhow::bail!(
                "no index at {} (run `devmind index` first)",
                self.database.display()
            );
        }
        Ok(SqliteStore::open(&self.database)?)
    }
}

pub fn run_index(ws: &Workspace, mode: OutputMode) -> anyhow::Result<()> {
    if mode.is_human() && !is_quiet() {
        ui::header("Indexing project");
        ui::status(Icons::FILE, "Path", &ws.root.display().to_string());
        ui::status(Icons::DATABASE, "Database", &ws.database.display().to_string());
    }

    let started = Instant::now();
    let (store, facts) = ws.index_and_save()?;
    let stats = store.stats()?;

    if mode.is_human() {
        if !facts.warnings.is_empty() {
            ui::warn(&format!("{} files skipped or partially indexed", facts.warnings.len()));
            for warning in &facts.warnings {
                ui::index_warning(warning);
            }
        }
        ui::section("Index");
        println!("{}", ui::db_stats_table(&stats));
        ui::timing(&format!("{:.2?}", started.elapsed()));
        ui::success("Indexing complete");
    } else {
        emit_success(
            mode,
            "index",
            json!({
                "root": ws.root.display().to_string(),
                "database": ws.database.display().to_string(),
                "stats": stats,
                "warnings": facts.warnings,
            }),
        )?;
    }
    Ok(())
}

pub fn run_serve(ws: &Workspace) -> anyhow::Result<()> {
    let (store, facts) = ws.index_and_save()?;
    tracing::info!("Indexed {} ({})", ws.root.display(), facts);

    let git = GitHistory::new(&ws.root);
    match git.recent_commits(ws.config.commit_limit()) {
        Ok(commits) => {
            let saved = store.save_commits(&commits)?;
            tracing::info!("Stored {} commits", saved);
        }
        Err(e) => tracing::warn!("Skipping git history: {}", e),
    }

    let tools = ToolRegistry::new(Arc::new(store), git);
    let service = McpService::new(Arc::new(tools));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(service.run_stdio())
}

pub fn run_overview(ws: &Workspace, mode: OutputMode) -> anyhow::Result<()> {
    let store = ws.open_existing_store()?;
    let overview = store.overview()?;

    if mode.is_human() {
        ui::header("Project overview");
        println!("{}", ui::overview_table(&overview));
        println!("{}", ui::dim(&overview.description()));
    } else {
        emit_success(
            mode,
            "overview",
            json!({ "description": overview.description(), "overview": overview }),
        )?;
    }
    Ok(())
}

pub fn run_search(ws: &Workspace, query: &str, mode: OutputMode) -> anyhow::Result<()> {
    let store = ws.open_existing_store()?;
    let results = store.search_functions(query)?;

    if mode.is_human() {
        if !is_quiet() {
            println!("{} Searching for '{}'", Icons::SEARCH, query);
        }
        if results.is_empty() {
            ui::warn("No functions found");
        }
        for func in &results {
            ui::function_hit(func);
        }
    } else {
        emit_success(
            mode,
            "search",
            json!({ "query": query, "count": results.len(), "results": results }),
        )?;
    }
    Ok(())
}

pub fn run_function(ws: &Workspace, name: &str, mode: OutputMode) -> anyhow::Result<()> {
    let store = ws.open_existing_store()?;
    let context = store.function_context(name)?;

    if !mode.is_human() {
        return match context {
            Some(context) => emit_success(mode, "function", context),
            None => emit_success(mode, "function", json!({ "error": format!("Function '{}' not found", name) })),
        };
    }

    let Some(context) = context else {
        ui::warn(&format!("Function '{}' not found", name));
        return Ok(());
    };

    let func = &context.function;
    ui::header(&format!("{}({})", func.name, func.args.join(", ")));
    ui::status(
        Icons::FILE,
        "Location",
        &format!("{}:{}-{}", func.file, func.line_start, func.line_end),
    );
    if !func.docstring.is_empty() {
        ui::section("Docstring");
        println!("{}", func.docstring);
    }
    ui::section("Source");
    println!("{}", func.code);

    ui::section("Related files");
    if context.related_files.is_empty() {
        println!("  {}", ui::muted("none"));
    }
    for path in &context.related_files {
        ui::related_file(path);
    }
    Ok(())
}

pub fn run_related(ws: &Workspace, file_path: &str, mode: OutputMode) -> anyhow::Result<()> {
    let store = ws.open_existing_store()?;
    let related = store.related_files(file_path)?;

    if mode.is_human() {
        println!("{} Files related to {}", Icons::LINK, file_path);
        if related.is_empty() {
            println!("  {}", ui::muted("none"));
        }
        for path in &related {
            ui::related_file(path);
        }
    } else {
        emit_success(
            mode,
            "related",
            json!({ "file_path": file_path, "count": related.len(), "related_files": related }),
        )?;
    }
    Ok(())
}

pub fn run_changes(
    ws: &Workspace,
    file_path: Option<&str>,
    limit: usize,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let git = GitHistory::new(&ws.root);

    match file_path {
        Some(path) => {
            let history = git.file_history(path, limit)?;
            let explanation = git.explain_changes(path)?;
            if mode.is_human() {
                println!("{}", explanation.trim_end());
            } else {
                emit_success(
                    mode,
                    "changes",
                    json!({ "file_history": history, "file_explanation": explanation }),
                )?;
            }
        }
        None => {
            let commits = git.recent_commits(limit)?;
            if mode.is_human() {
                if !git.is_repository() {
                    ui::warn("Not a git repository.");
                }
                ui::info("Commits", &commits.len().to_string());
                for commit in &commits {
                    ui::commit_line(commit);
                }
            } else {
                emit_success(
                    mode,
                    "changes",
                    json!({
                        "summary": format!("Recent {} commits across the project", commits.len()),
                        "commits": commits,
                    }),
                )?;
            }
        }
    }
    Ok(())
}
