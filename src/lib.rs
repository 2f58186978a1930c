//! # devmind - Project context for coding agents
//!
//! Builds a structured, queryable model of a Python source tree and answers
//! point queries against it.
//!
//! devmind provides:
//! - A tree-sitter based indexer extracting files, functions, imports and TODO markers
//! - A SQLite fact store with atomic full-replace snapshots
//! - Overview, search, function lookup and related-file queries
//! - Git history ingestion for change explanations
//! - An MCP tool server over stdio

pub mod model;
pub mod filter;
pub mod adapter;
pub mod indexer;
pub mod storage;
pub mod git;
pub mod server;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use model::{
    CommitRecord, DependencyEdge, FactSet, FileRecord, FunctionRecord, IndexWarning, MarkerKind,
    MarkerRecord,
};
pub use indexer::Indexer;
pub use storage::SqliteStore;
pub use git::GitHistory;

/// Result type alias for devmind operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for devmind operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Adapter error: {0}")]
    Adapter(String),

    #[error("Git error: {0}")]
    Vcs(#[from] git2::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} required")]
    MissingArgument(&'static str),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}
