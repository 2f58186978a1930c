use std::collections::HashSet;
use std::path::{Component, Path};

/// Directory names that are never analyzed: build caches, VCS metadata,
/// dependency and virtual-environment directories.
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[
    "__pycache__",
    ".git",
    "node_modules",
    ".venv",
    "venv",
    "env",
    ".env",
];

pub struct IgnoreFilter {
    names: HashSet<String>,
}

impl IgnoreFilter {
    pub fn new(extra_excludes: Option<&[String]>) -> Self {
        let mut names: HashSet<String> = DEFAULT_IGNORED_DIRS.iter().map(|s| s.to_string()).collect();

        if let Some(excludes) = extra_excludes {
            for name in excludes {
                let name = name.trim().trim_end_matches('/');
                if !name.is_empty() {
                    names.insert(name.to_string());
                }
            }
        }

        Self { names }
    }

    /// True when any component of `path` is an ignored directory name.
    pub fn is_ignored(&self, path: &Path) -> bool {
        path.components().any(|c| match c {
            Component::Normal(name) => name.to_str().is_some_and(|n| self.names.contains(n)),
            _ => false,
        })
    }

    /// Check a single entry name (used to prune directories during the walk).
    pub fn is_ignored_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

impl Default for IgnoreFilter {
    fn default() -> Self {
        Self::new(None)
    }
}
