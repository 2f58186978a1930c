//! Database schema definitions

/// SQL to create the files table
pub const CREATE_FILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    path TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    extension TEXT NOT NULL,
    size INTEGER NOT NULL,
    lines INTEGER NOT NULL,
    data TEXT NOT NULL
)
"#;

/// SQL to create the functions table
pub const CREATE_FUNCTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS functions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    file TEXT NOT NULL,
    line_start INTEGER NOT NULL,
    line_end INTEGER NOT NULL,
    args TEXT NOT NULL,
    docstring TEXT NOT NULL DEFAULT '',
    code TEXT NOT NULL DEFAULT ''
)
"#;

/// SQL to create the dependencies table
pub const CREATE_DEPENDENCIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS dependencies (
    file TEXT NOT NULL,
    dependency TEXT NOT NULL,
    PRIMARY KEY (file, dependency)
)
"#;

/// SQL to create the todos (marker) table
pub const CREATE_TODOS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type TEXT NOT NULL,
    message TEXT NOT NULL,
    file TEXT NOT NULL,
    line INTEGER NOT NULL
)
"#;

/// SQL to create the commits table
/// Populated from git history; upserted by hash, never cleared by a save.
/// `date` keeps the author's offset; `timestamp` is its UTC epoch for ordering.
pub const CREATE_COMMITS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS commits (
    hash TEXT PRIMARY KEY,
    message TEXT NOT NULL,
    author TEXT NOT NULL,
    date TEXT NOT NULL,
    timestamp INTEGER NOT NULL DEFAULT 0,
    files_changed TEXT NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_functions_name ON functions(name)",
    "CREATE INDEX IF NOT EXISTS idx_functions_file ON functions(file)",
    "CREATE INDEX IF NOT EXISTS idx_dependencies_dependency ON dependencies(dependency)",
    "CREATE INDEX IF NOT EXISTS idx_todos_type ON todos(type)",
    "CREATE INDEX IF NOT EXISTS idx_commits_timestamp ON commits(timestamp)",
];

/// Tables holding the indexed snapshot, in the order a save clears them
pub const SNAPSHOT_TABLES: &[&str] = &["files", "functions", "dependencies", "todos"];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_FILES_TABLE,
        CREATE_FUNCTIONS_TABLE,
        CREATE_DEPENDENCIES_TABLE,
        CREATE_TODOS_TABLE,
        CREATE_COMMITS_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
