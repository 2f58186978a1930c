//! SQLite storage implementation

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use chrono::DateTime;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use crate::Result;
use crate::model::{CommitRecord, FactSet, FunctionRecord};
use super::schema;

const FUNCTION_COLUMNS: &str = "id, name, file, line_start, line_end, args, docstring, code";

/// SQLite-backed fact store
///
/// `save` is the only mutator of the indexed snapshot; every query runs
/// inside a read transaction so it sees a single snapshot.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        // Readers in other processes keep seeing the previous snapshot while a save is in flight.
        let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        tracing::debug!("Opened {} (journal_mode={})", path.display(), mode);
        let store = Self { conn: Mutex::new(conn) };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn: Mutex::new(conn) };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn();
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-applied save:
        // the open transaction is rolled back when it is dropped.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` inside a read transaction
    fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.finish()?;
        Ok(value)
    }

    // ========== Snapshot ==========

    /// Replace the indexed snapshot with `facts`.
    ///
    /// Runs as one transaction: on any failure the previous snapshot stays
    /// in place untouched.
    pub fn save(&self, facts: &FactSet) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        for table in schema::SNAPSHOT_TABLES {
            tx.execute(&format!("DELETE FROM {}", table), [])?;
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO files (path, name, extension, size, lines, data) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for file in &facts.files {
                stmt.execute(params![
                    file.path,
                    file.name,
                    file.extension,
                    file.size as i64,
                    file.lines as i64,
                    serde_json::to_string(file)?,
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO functions (name, file, line_start, line_end, args, docstring, code)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for func in &facts.functions {
                stmt.execute(params![
                    func.name,
                    func.file,
                    func.line_start,
                    func.line_end,
                    serde_json::to_string(&func.args)?,
                    func.docstring,
                    func.code,
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO dependencies (file, dependency) VALUES (?1, ?2)",
            )?;
            for edge in &facts.dependencies {
                stmt.execute(params![edge.file, edge.dependency])?;
            }
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO todos (type, message, file, line) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for marker in &facts.markers {
                stmt.execute(params![marker.kind.as_str(), marker.message, marker.file, marker.line])?;
            }
        }

        tx.commit()?;
        tracing::info!("Saved snapshot ({})", facts);
        Ok(())
    }

    // ========== Queries ==========

    /// Aggregate counts over the current snapshot
    pub fn overview(&self) -> Result<Overview> {
        self.read(|conn| {
            let (file_count, total_size, total_lines): (i64, i64, i64) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(size), 0), COALESCE(SUM(lines), 0) FROM files",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;
            let function_count: i64 =
                conn.query_row("SELECT COUNT(*) FROM functions", [], |row| row.get(0))?;

            let mut stmt = conn.prepare("SELECT type, COUNT(*) FROM todos GROUP BY type")?;
            let todos = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
                })?
                .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;

            Ok(Overview {
                file_count: file_count as usize,
                total_size: total_size as u64,
                total_lines: total_lines as u64,
                function_count: function_count as usize,
                todos,
            })
        })
    }

    /// Case-insensitive substring search over function names and docstrings.
    ///
    /// Results are in insertion order. An empty query matches nothing.
    pub fn search_functions(&self, query: &str) -> Result<Vec<FunctionRecord>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let needle = query.to_lowercase();

        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM functions ORDER BY id",
                FUNCTION_COLUMNS
            ))?;
            let mut matches = Vec::new();
            for func in stmt.query_map([], row_to_function)? {
                let func = func?;
                if func.matches(&needle) {
                    matches.push(func);
                }
            }
            Ok(matches)
        })
    }

    /// Look up a function by exact name, with the files related to its owner.
    ///
    /// When several functions share the name, the first inserted one wins.
    pub fn function_context(&self, name: &str) -> Result<Option<FunctionContext>> {
        self.read(|conn| {
            let function = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM functions WHERE name = ?1 ORDER BY id LIMIT 1",
                        FUNCTION_COLUMNS
                    ),
                    [name],
                    row_to_function,
                )
                .optional()?;

            match function {
                Some(function) => {
                    let related_files = related_files_in(conn, &function.file)?;
                    Ok(Some(FunctionContext { function, related_files }))
                }
                None => Ok(None),
            }
        })
    }

    /// Files linked to `file_path` by the dependency-name heuristic
    pub fn related_files(&self, file_path: &str) -> Result<Vec<String>> {
        self.read(|conn| related_files_in(conn, file_path))
    }

    // ========== Commits ==========

    /// Insert or replace commits by hash. Returns the number written.
    pub fn save_commits(&self, commits: &[CommitRecord]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO commits (hash, message, author, date, timestamp, files_changed)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for commit in commits {
                stmt.execute(params![
                    commit.hash,
                    commit.message,
                    commit.author,
                    commit.date,
                    commit_timestamp(&commit.date),
                    serde_json::to_string(&commit.files_changed)?,
                ])?;
            }
        }
        tx.commit()?;
        Ok(commits.len())
    }

    /// Stored commits, most recent first
    pub fn recent_commits(&self, limit: usize) -> Result<Vec<CommitRecord>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT hash, message, author, date, files_changed FROM commits ORDER BY timestamp DESC, hash LIMIT ?1",
            )?;
            let commits = stmt
                .query_map([limit as i64], |row| {
                    let files_json: String = row.get(4)?;
                    let files_changed = serde_json::from_str(&files_json).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
                    })?;
                    Ok(CommitRecord {
                        hash: row.get(0)?,
                        message: row.get(1)?,
                        author: row.get(2)?,
                        date: row.get(3)?,
                        files_changed,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(commits)
        })
    }

    // ========== Statistics ==========

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        self.read(|conn| {
            let count = |table: &str| -> Result<usize> {
                let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
                Ok(n as usize)
            };
            Ok(DbStats {
                files: count("files")?,
                functions: count("functions")?,
                dependencies: count("dependencies")?,
                todos: count("todos")?,
                commits: count("commits")?,
            })
        })
    }
}

/// Relation inference, in both directions:
/// - importers: files with a dependency name containing the stem of `file_path`
/// - imports: files whose name contains one of `file_path`'s dependency names
///
/// Matching is case-sensitive substring containment, so it over-matches
/// unrelated files sharing text and misses aliased or renamed imports.
fn related_files_in(conn: &Connection, file_path: &str) -> Result<Vec<String>> {
    let mut related = BTreeSet::new();

    let stem = Path::new(file_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    if !stem.is_empty() {
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT f.path
            FROM files f
            JOIN dependencies d ON f.path = d.file
            WHERE instr(d.dependency, ?1) > 0
            "#,
        )?;
        for path in stmt.query_map([stem], |row| row.get::<_, String>(0))? {
            related.insert(path?);
        }
    }

    let mut stmt = conn.prepare(
        r#"
        SELECT DISTINCT f.path
        FROM files f
        JOIN dependencies d ON d.file = ?1
        WHERE instr(f.name, d.dependency) > 0
        "#,
    )?;
    for path in stmt.query_map([file_path], |row| row.get::<_, String>(0))? {
        related.insert(path?);
    }

    related.remove(file_path);
    Ok(related.into_iter().collect())
}

/// Helper to convert a row to a FunctionRecord
fn row_to_function(row: &rusqlite::Row) -> rusqlite::Result<FunctionRecord> {
    let args_json: String = row.get(5)?;
    let args: Vec<String> = serde_json::from_str(&args_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(FunctionRecord {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        file: row.get(2)?,
        line_start: row.get(3)?,
        line_end: row.get(4)?,
        args,
        docstring: row.get(6)?,
        code: row.get(7)?,
    })
}

/// Project-wide aggregate counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub file_count: usize,
    pub total_size: u64,
    pub total_lines: u64,
    pub function_count: usize,
    /// Marker counts keyed by kind (`TODO`, `FIXME`, `XXX`)
    pub todos: BTreeMap<String, usize>,
}

impl Overview {
    pub fn description(&self) -> String {
        format!(
            "This project contains {} files with {} lines of code and {} functions.",
            self.file_count, self.total_lines, self.function_count
        )
    }
}

/// A function together with the files related to its owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionContext {
    pub function: FunctionRecord,
    pub related_files: Vec<String>,
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
pub struct DbStats {
    pub files: usize,
    pub functions: usize,
    pub dependencies: usize,
    pub todos: usize,
    pub commits: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Files: {}", self.files)?;
        writeln!(f, "  Functions: {}", self.functions)?;
        writeln!(f, "  Dependencies: {}", self.dependencies)?;
        writeln!(f, "  TODOs: {}", self.todos)?;
        writeln!(f, "  Commits: {}", self.commits)
    }
}

/// UTC seconds for an RFC 3339 date; unparseable dates sort last
fn commit_timestamp(date: &str) -> i64 {
    match DateTime::parse_from_rfc3339(date) {
        Ok(parsed) => parsed.timestamp(),
        Err(e) => {
            tracing::warn!("Unparseable commit date {:?}: {}", date, e);
            0
        }
    }
}
