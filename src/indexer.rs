//! Tree walker producing a `FactSet`
//!
//! Walks the project depth-first, prunes ignored directories, dispatches each
//! eligible file to the language adapter and accumulates the facts. A file
//! that cannot be read or parsed becomes an `IndexWarning`; it never aborts
//! the run. No state survives between calls to `index`.

use crate::adapter::{LanguageAdapter, PythonAdapter};
use crate::filter::IgnoreFilter;
use crate::model::{DependencyEdge, FactSet, FileRecord, IndexWarning};
use crate::{Error, Result};
use ignore::WalkBuilder;
use std::path::{Component, Path};
use std::sync::Arc;
use std::time::Instant;

pub struct Indexer {
    adapter: Box<dyn LanguageAdapter>,
    filter: Arc<IgnoreFilter>,
}

impl Indexer {
    /// Python indexer with the default ignore list
    pub fn new() -> Result<Self> {
        Self::with_extra_ignores(&[])
    }

    /// Python indexer that also skips the given directory names
    pub fn with_extra_ignores(extra: &[String]) -> Result<Self> {
        Ok(Self::with_adapter(PythonAdapter::new()?, IgnoreFilter::new(Some(extra))))
    }

    pub fn with_adapter(adapter: impl LanguageAdapter + 'static, filter: IgnoreFilter) -> Self {
        Self {
            adapter: Box::new(adapter),
            filter: Arc::new(filter),
        }
    }

    /// Index every eligible file under `root`.
    ///
    /// Recorded paths are relative to `root`, `/`-separated.
    pub fn index(&self, root: &Path) -> Result<FactSet> {
        if !root.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a directory", root.display()),
            )));
        }

        let started = Instant::now();
        let mut facts = FactSet::new();

        let filter = Arc::clone(&self.filter);
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                // The root itself is never subject to the ignore list.
                entry.depth() == 0
                    || !entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| filter.is_ignored_name(name))
            })
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Walk error under {}: {}", root.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let file_path = entry.path();
            let relative = file_path.strip_prefix(root).unwrap_or(file_path);
            if self.filter.is_ignored(relative) || !self.adapter.can_handle(file_path) {
                continue;
            }

            // Lossy conversion could map two distinct names onto one key.
            let Some(path) = normalize_path(relative) else {
                tracing::warn!("Skipping non-UTF-8 path {}", relative.display());
                facts.warnings.push(IndexWarning {
                    path: relative.to_string_lossy().into_owned(),
                    message: "path is not valid UTF-8".to_string(),
                });
                continue;
            };

            self.analyze_file(file_path, &path, &mut facts);
        }

        tracing::info!(
            "Indexed {} ({}) in {:.2?} ({})",
            root.display(),
            self.adapter.language_name(),
            started.elapsed(),
            facts
        );
        Ok(facts)
    }

    fn analyze_file(&self, file_path: &Path, path: &str, facts: &mut FactSet) {
        tracing::debug!("Processing {}", path);

        let content = match std::fs::read_to_string(file_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path, e);
                facts.warnings.push(IndexWarning {
                    path: path.to_string(),
                    message: format!("unreadable: {}", e),
                });
                return;
            }
        };

        facts.files.push(FileRecord {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            extension: Path::new(path)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{}", e))
                .unwrap_or_default(),
            size: content.len() as u64,
            lines: content.lines().count() as u64,
        });

        match self.adapter.parse_file(path, &content) {
            Ok(result) => {
                facts.functions.extend(result.functions);
                facts.dependencies.extend(result.dependencies.into_iter().map(|dependency| {
                    DependencyEdge {
                        file: path.to_string(),
                        dependency,
                    }
                }));
                facts.markers.extend(result.markers);
            }
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", path, e);
                facts.warnings.push(IndexWarning {
                    path: path.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }
}

/// `/`-joined normal components, or `None` when any component is not UTF-8
fn normalize_path(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            parts.push(part.to_str()?);
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MarkerKind;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn sample_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "main.py", "import utils\nfrom pkg.models import User\n\ndef main(argv):\n    \"\"\"Entry point.\"\"\"\n    # TODO: parse flags\n    return utils.run(argv)\n");
        write(root, "utils.py", "def run(args):\n    return args\n");
        write(root, "pkg/models.py", "import os\nimport os.path\n\nclass User:\n    def name(self):\n        return 'u'\n");
        write(root, "README.md", "# TODO: not python\n");
        write(root, ".venv/lib/site.py", "def hidden():\n    pass\n");
        write(root, "pkg/__pycache__/models.py", "def cached():\n    pass\n");
        write(root, "node_modules/tool.py", "def vendored():\n    pass\n");
        dir
    }

    #[test]
    fn test_index_tree() {
        let dir = sample_tree();
        let facts = Indexer::new().unwrap().index(dir.path()).unwrap();

        let paths: Vec<_> = facts.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["main.py", "pkg/models.py", "utils.py"]);

        let main = &facts.files[0];
        assert_eq!(main.name, "main.py");
        assert_eq!(main.extension, ".py");
        assert_eq!(main.lines, 7);

        let names: Vec<_> = facts.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["main", "name", "run"]);
        assert_eq!(facts.functions[0].docstring, "Entry point.");
        assert_eq!(facts.functions[0].args, vec!["argv"]);

        let main_deps: Vec<_> = facts.dependencies_of("main.py").collect();
        assert_eq!(main_deps, vec!["pkg", "utils"]);
        let model_deps: Vec<_> = facts.dependencies_of("pkg/models.py").collect();
        assert_eq!(model_deps, vec!["os"]);

        assert_eq!(facts.markers.len(), 1);
        assert_eq!(facts.markers[0].kind, MarkerKind::Todo);
        assert_eq!(facts.markers[0].message, "parse flags");
        assert_eq!(facts.markers[0].line, 6);
        assert!(facts.warnings.is_empty());
    }

    #[test]
    fn test_ignored_directories_never_appear() {
        let dir = sample_tree();
        let facts = Indexer::new().unwrap().index(dir.path()).unwrap();
        for name in ["hidden", "cached", "vendored"] {
            assert!(facts.functions.iter().all(|f| f.name != name));
        }
        assert!(facts.files.iter().all(|f| !f.path.contains("venv")));
    }

    #[test]
    fn test_extra_ignores() {
        let dir = sample_tree();
        let facts = Indexer::with_extra_ignores(&["pkg".to_string()])
            .unwrap()
            .index(dir.path())
            .unwrap();
        assert!(facts.files.iter().all(|f| !f.path.starts_with("pkg/")));
    }

    #[test]
    fn test_bad_files_do_not_abort_the_run() {
        let dir = sample_tree();
        write(dir.path(), "broken.py", "def broken(:\n    # TODO: unreachable\n");
        fs::write(dir.path().join("binary.py"), [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let facts = Indexer::new().unwrap().index(dir.path()).unwrap();

        // Syntax errors keep the file record but contribute no other facts.
        assert!(facts.files.iter().any(|f| f.path == "broken.py"));
        assert!(facts.markers.iter().all(|m| m.file != "broken.py"));
        // Unreadable files are skipped entirely.
        assert!(facts.files.iter().all(|f| f.path != "binary.py"));

        let warned: Vec<_> = facts.warnings.iter().map(|w| w.path.as_str()).collect();
        assert_eq!(warned, vec!["binary.py", "broken.py"]);
        assert_eq!(facts.functions.len(), 3);
    }

    #[test]
    fn test_deeply_nested_file_becomes_a_warning() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "deep.py",
            &format!("x = {}1{}\n", "(".repeat(30_000), ")".repeat(30_000)),
        );
        write(dir.path(), "good.py", "def ok():\n    pass\n");

        let facts = Indexer::new().unwrap().index(dir.path()).unwrap();

        assert_eq!(facts.functions.len(), 1);
        assert_eq!(facts.functions[0].file, "good.py");
        let warned: Vec<_> = facts.warnings.iter().map(|w| w.path.as_str()).collect();
        assert_eq!(warned, vec!["deep.py"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_are_skipped() {
        use crate::storage::SqliteStore;
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        for raw in [&b"a\xff.py"[..], &b"a\xfe.py"[..]] {
            let path = dir.path().join(OsStr::from_bytes(raw));
            if fs::write(&path, "def hidden():\n    pass\n").is_err() {
                // Filesystem refuses non-UTF-8 names
                return;
            }
        }
        write(dir.path(), "good.py", "def ok():\n    pass\n");

        let facts = Indexer::new().unwrap().index(dir.path()).unwrap();

        let paths: Vec<_> = facts.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["good.py"]);
        assert_eq!(facts.warnings.len(), 2);
        assert!(facts.warnings.iter().all(|w| w.message.contains("UTF-8")));

        let store = SqliteStore::open_in_memory().unwrap();
        store.save(&facts).unwrap();
        assert_eq!(store.overview().unwrap().file_count, 1);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(Indexer::new().unwrap().index(&missing).is_err());
    }
}
