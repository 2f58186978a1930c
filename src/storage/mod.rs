//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - files(path, name, extension, size, lines, data)
//! - functions(id, name, file, line_start, line_end, args, docstring, code)
//! - dependencies(file, dependency)
//! - todos(id, type, message, file, line)
//! - commits(hash, message, author, date, files_changed)
//!
//! The first four hold the indexed snapshot and are replaced wholesale by
//! every save. Commits accumulate independently.

pub mod schema;
pub mod sqlite;

pub use sqlite::{DbStats, FunctionContext, Overview, SqliteStore};
