//! Core adapter framework
//!
//! Defines the trait a language adapter implements and the per-file result
//! it hands back to the indexer.

use crate::Result;
use crate::model::{FunctionRecord, MarkerRecord};
use std::path::Path;

/// Facts extracted from a single source file
#[derive(Debug, Default)]
pub struct AdapterResult {
    /// Callable definitions, in tree order
    pub functions: Vec<FunctionRecord>,
    /// Distinct top-level dependency names, sorted
    pub dependencies: Vec<String>,
    /// Inline markers, in line order
    pub markers: Vec<MarkerRecord>,
}

impl AdapterResult {
    /// Create a new empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function
    pub fn add_function(&mut self, function: FunctionRecord) {
        self.functions.push(function);
    }
}

/// Trait for language adapters
///
/// Each language adapter is responsible for:
/// 1. Identifying files it can parse
/// 2. Extracting callables and imports from the syntax tree
/// 3. Scanning the raw text for markers
pub trait LanguageAdapter: Send + Sync {
    /// Get the language name (for display)
    fn language_name(&self) -> &str;

    /// Get file extensions this adapter handles
    fn file_extensions(&self) -> &[&str];

    /// Check if this adapter can handle a file
    fn can_handle(&self, path: &Path) -> bool {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            self.file_extensions().contains(&ext)
        } else {
            false
        }
    }

    /// Analyze a file. `path` is recorded verbatim as the owning file of every fact.
    ///
    /// Returns `Error::Parse` when the content is not valid source.
    fn parse_file(&self, path: &str, content: &str) -> Result<AdapterResult>;
}
