//! Fact records produced by one indexing run
//!
//! A run yields four categories of facts that are persisted together:
//! - `FileRecord`: one per analyzed source file
//! - `FunctionRecord`: one per `def` found anywhere in a file
//! - `DependencyEdge`: one per distinct top-level module a file imports
//! - `MarkerRecord`: one per TODO/FIXME/XXX comment
//!
//! Commits come from the git collaborator and are stored alongside, but
//! are never part of a `FactSet`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A source file that was analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path as discovered during the walk (unique across a snapshot)
    pub path: String,
    /// File name including extension
    pub name: String,
    /// Extension with its leading dot, e.g. `.py`
    pub extension: String,
    /// Content length in bytes
    pub size: u64,
    /// Number of lines
    pub lines: u64,
}

/// A callable definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    /// Sequence id assigned by the store; `None` until persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    /// Path of the owning file
    pub file: String,
    /// Starting line number (1-indexed)
    pub line_start: u32,
    /// Ending line number (1-indexed, inclusive)
    pub line_end: u32,
    /// Parameter base names in declaration order
    pub args: Vec<String>,
    /// Cleaned docstring, empty when absent
    pub docstring: String,
    /// Source text of lines `line_start..=line_end`
    pub code: String,
}

impl FunctionRecord {
    /// Whether `needle` (already lowercased) occurs in the name or docstring.
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.docstring.to_lowercase().contains(needle)
    }
}

/// A `(file, dependency)` pair derived from an import statement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub file: String,
    /// Top-level module name (first dotted segment)
    pub dependency: String,
}

/// Recognized marker kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarkerKind {
    Todo,
    Fixme,
    Xxx,
}

impl MarkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerKind::Todo => "TODO",
            MarkerKind::Fixme => "FIXME",
            MarkerKind::Xxx => "XXX",
        }
    }

    pub fn all() -> &'static [MarkerKind] {
        &[MarkerKind::Todo, MarkerKind::Fixme, MarkerKind::Xxx]
    }
}

impl FromStr for MarkerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TODO" => Ok(MarkerKind::Todo),
            "FIXME" => Ok(MarkerKind::Fixme),
            "XXX" => Ok(MarkerKind::Xxx),
            _ => Err(Error::Parse(format!("Unknown marker kind: {}", s))),
        }
    }
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An inline TODO/FIXME/XXX annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerRecord {
    #[serde(rename = "type")]
    pub kind: MarkerKind,
    pub message: String,
    pub file: String,
    /// Line number (1-indexed)
    pub line: u32,
}

/// A file the indexer could not fully analyze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexWarning {
    pub path: String,
    pub message: String,
}

/// Everything one indexing run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FactSet {
    pub files: Vec<FileRecord>,
    pub functions: Vec<FunctionRecord>,
    pub dependencies: Vec<DependencyEdge>,
    pub markers: Vec<MarkerRecord>,
    /// Per-file failures; reported, never persisted
    pub warnings: Vec<IndexWarning>,
}

impl FactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dependency names recorded for `file`
    pub fn dependencies_of<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.dependencies
            .iter()
            .filter(move |d| d.file == file)
            .map(|d| d.dependency.as_str())
    }
}

impl std::fmt::Display for FactSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "files: {}, functions: {}, dependencies: {}, markers: {}, warnings: {}",
            self.files.len(),
            self.functions.len(),
            self.dependencies.len(),
            self.markers.len(),
            self.warnings.len(),
        )
    }
}

/// A commit summary from version control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub message: String,
    pub author: String,
    /// ISO-8601 author date
    pub date: String,
    /// Paths touched by the commit; empty for per-file history entries
    #[serde(default)]
    pub files_changed: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_kind_roundtrip() {
        for kind in MarkerKind::all() {
            let parsed: MarkerKind = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
        assert_eq!(MarkerKind::from_str("fixme").unwrap(), MarkerKind::Fixme);
        assert!(MarkerKind::from_str("NOTE").is_err());
    }

    #[test]
    fn test_marker_serializes_as_type() {
        let marker = MarkerRecord {
            kind: MarkerKind::Todo,
            message: "fix this".into(),
            file: "a.py".into(),
            line: 3,
        };
        let value = serde_json::to_value(&marker).unwrap();
        assert_eq!(value["type"], "TODO");
        assert_eq!(value["message"], "fix this");
    }

    #[test]
    fn test_function_matches_name_or_doc() {
        let func = FunctionRecord {
            id: None,
            name: "ParseConfig".into(),
            file: "a.py".into(),
            line_start: 1,
            line_end: 2,
            args: vec![],
            docstring: String::new(),
            code: String::new(),
        };
        assert!(func.matches("parse"));
        assert!(!func.matches("load"));

        let documented = FunctionRecord {
            name: "run".into(),
            docstring: "Parses the input".into(),
            ..func
        };
        assert!(documented.matches("parses the"));
    }
}
