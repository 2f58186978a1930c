//! Tool registry exposed over `tools/list` and `tools/call`

use crate::git::GitHistory;
use crate::storage::SqliteStore;
use crate::{Error, Result};
use serde_json::{Value, json};
use std::sync::Arc;

const DEFAULT_CHANGE_LIMIT: usize = 10;

pub struct ToolRegistry {
    store: Arc<SqliteStore>,
    git: GitHistory,
}

impl ToolRegistry {
    pub fn new(store: Arc<SqliteStore>, git: GitHistory) -> Self {
        Self { store, git }
    }

    pub fn list_tools(&self) -> Value {
        json!([
            {
                "name": "get_project_overview",
                "description": "Get an overview of the project structure and statistics",
                "inputSchema": {
                    "type": "object",
                    "properties": {},
                    "required": []
                }
            },
            {
                "name": "search_codebase",
                "description": "Search for functions and code patterns in the codebase",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Search query (function name, keyword, etc.)"
                        }
                    },
                    "required": ["query"]
                }
            },
            {
                "name": "get_function_context",
                "description": "Get detailed information about a specific function",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "function_name": {
                            "type": "string",
                            "description": "Name of the function to analyze"
                        }
                    },
                    "required": ["function_name"]
                }
            },
            {
                "name": "explain_recent_changes",
                "description": "Explain recent changes and commit history",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "file_path": {
                            "type": "string",
                            "description": "Optional file path to focus on"
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Number of commits to include",
                            "default": DEFAULT_CHANGE_LIMIT
                        }
                    },
                    "required": []
                }
            },
            {
                "name": "find_related_files",
                "description": "Find files related to a given file based on dependencies",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "file_path": {
                            "type": "string",
                            "description": "Path to the file to find relations for"
                        }
                    },
                    "required": ["file_path"]
                }
            }
        ])
    }

    /// Dispatch a tool call.
    ///
    /// Missing arguments and unknown entities come back as an `{"error": ...}`
    /// result; an unknown tool name or a store failure is an `Err`.
    pub fn call_tool(&self, name: &str, args: &Value) -> Result<Value> {
        tracing::debug!("Tool call {} {}", name, args);

        let result = match name {
            "get_project_overview" => self.project_overview(),
            "search_codebase" => self.search_codebase(str_arg(args, "query")),
            "get_function_context" => self.function_context(str_arg(args, "function_name")),
            "explain_recent_changes" => {
                let limit = args
                    .get("limit")
                    .and_then(Value::as_u64)
                    .map(|n| n as usize)
                    .unwrap_or(DEFAULT_CHANGE_LIMIT);
                self.explain_recent_changes(str_arg(args, "file_path"), limit)
            }
            "find_related_files" => self.find_related_files(str_arg(args, "file_path")),
            other => return Err(Error::UnknownTool(other.to_string())),
        };

        match result {
            Err(e @ (Error::MissingArgument(_) | Error::NotFound(_))) => Ok(json!({ "error": e.to_string() })),
            other => other,
        }
    }

    fn project_overview(&self) -> Result<Value> {
        let overview = self.store.overview()?;
        Ok(json!({
            "description": overview.description(),
            "overview": overview,
        }))
    }

    fn search_codebase(&self, query: &str) -> Result<Value> {
        if query.is_empty() {
            return Ok(json!({ "results": [], "message": "No search query provided" }));
        }

        let results = self.store.search_functions(query)?;
        Ok(json!({
            "count": results.len(),
            "results": results,
            "query": query,
        }))
    }

    fn function_context(&self, name: &str) -> Result<Value> {
        if name.is_empty() {
            return Err(Error::MissingArgument("Function name"));
        }

        let context = self
            .store
            .function_context(name)?
            .ok_or_else(|| Error::NotFound(format!("Function '{}'", name)))?;
        Ok(serde_json::to_value(context)?)
    }

    fn explain_recent_changes(&self, file_path: &str, limit: usize) -> Result<Value> {
        let commits = self.store.recent_commits(limit)?;

        if file_path.is_empty() {
            return Ok(json!({
                "summary": format!("Recent {} commits across the project", commits.len()),
                "commits": commits,
            }));
        }

        let file_history = self.git.file_history(file_path, limit)?;
        let file_explanation = self.git.explain_changes(file_path)?;
        Ok(json!({
            "commits": commits,
            "file_history": file_history,
            "file_explanation": file_explanation,
        }))
    }

    fn find_related_files(&self, file_path: &str) -> Result<Value> {
        if file_path.is_empty() {
            return Err(Error::MissingArgument("File path"));
        }

        let related = self.store.related_files(file_path)?;
        Ok(json!({
            "count": related.len(),
            "file_path": file_path,
            "related_files": related,
        }))
    }
}

/// String argument, empty when absent or not a string
fn str_arg<'a>(args: &'a Value, key: &str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CommitRecord, DependencyEdge, FactSet, FileRecord, FunctionRecord};
    use tempfile::TempDir;

    fn file(path: &str) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            extension: ".py".to_string(),
            size: 10,
            lines: 2,
        }
    }

    fn registry() -> (ToolRegistry, TempDir) {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .save(&FactSet {
                files: vec![file("main.py"), file("utils.py")],
                functions: vec![FunctionRecord {
                    id: None,
                    name: "run".to_string(),
                    file: "utils.py".to_string(),
                    line_start: 1,
                    line_end: 2,
                    args: vec!["args".to_string()],
                    docstring: "Run the thing.".to_string(),
                    code: "def run(args):\n    return args".to_string(),
                }],
                dependencies: vec![DependencyEdge {
                    file: "main.py".to_string(),
                    dependency: "utils".to_string(),
                }],
                ..FactSet::default()
            })
            .unwrap();
        store
            .save_commits(&[CommitRecord {
                hash: "abc".to_string(),
                message: "Add utils".to_string(),
                author: "Dev".to_string(),
                date: "2024-05-01T10:00:00+00:00".to_string(),
                files_changed: vec!["utils.py".to_string()],
            }])
            .unwrap();

        let dir = TempDir::new().unwrap();
        let git = GitHistory::new(dir.path());
        (ToolRegistry::new(Arc::new(store), git), dir)
    }

    #[test]
    fn test_list_tools() {
        let (registry, _dir) = registry();
        let tools = registry.list_tools();
        let names: Vec<_> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "get_project_overview",
                "search_codebase",
                "get_function_context",
                "explain_recent_changes",
                "find_related_files"
            ]
        );
        assert!(tools[1]["inputSchema"]["required"][0] == "query");
    }

    #[test]
    fn test_overview_tool() {
        let (registry, _dir) = registry();
        let result = registry.call_tool("get_project_overview", &json!({})).unwrap();
        assert_eq!(result["overview"]["file_count"], 2);
        assert_eq!(
            result["description"],
            "This project contains 2 files with 4 lines of code and 1 functions."
        );
    }

    #[test]
    fn test_search_tool() {
        let (registry, _dir) = registry();
        let result = registry.call_tool("search_codebase", &json!({"query": "THING"})).unwrap();
        assert_eq!(result["count"], 1);
        assert_eq!(result["query"], "THING");
        assert_eq!(result["results"][0]["name"], "run");

        let empty = registry.call_tool("search_codebase", &json!({})).unwrap();
        assert_eq!(empty, json!({"results": [], "message": "No search query provided"}));
    }

    #[test]
    fn test_function_context_tool() {
        let (registry, _dir) = registry();
        let result = registry
            .call_tool("get_function_context", &json!({"function_name": "run"}))
            .unwrap();
        assert_eq!(result["function"]["file"], "utils.py");
        assert_eq!(result["related_files"], json!(["main.py"]));

        let missing = registry
            .call_tool("get_function_context", &json!({"function_name": "doesNotExist"}))
            .unwrap();
        assert_eq!(missing, json!({"error": "Function 'doesNotExist' not found"}));

        let no_arg = registry.call_tool("get_function_context", &json!({})).unwrap();
        assert_eq!(no_arg, json!({"error": "Function name required"}));
    }

    #[test]
    fn test_related_files_tool() {
        let (registry, _dir) = registry();
        let result = registry
            .call_tool("find_related_files", &json!({"file_path": "main.py"}))
            .unwrap();
        assert_eq!(
            result,
            json!({"file_path": "main.py", "related_files": ["utils.py"], "count": 1})
        );

        let no_arg = registry.call_tool("find_related_files", &json!({"file_path": ""})).unwrap();
        assert_eq!(no_arg, json!({"error": "File path required"}));
    }

    #[test]
    fn test_recent_changes_tool() {
        let (registry, _dir) = registry();
        let result = registry.call_tool("explain_recent_changes", &json!({})).unwrap();
        assert_eq!(result["summary"], "Recent 1 commits across the project");
        assert_eq!(result["commits"][0]["hash"], "abc");

        let result = registry
            .call_tool("explain_recent_changes", &json!({"file_path": "utils.py", "limit": 3}))
            .unwrap();
        assert!(result["file_history"].is_array());
        assert!(result["file_explanation"].is_string());
    }

    #[test]
    fn test_unknown_tool() {
        let (registry, _dir) = registry();
        let err = registry.call_tool("drop_tables", &json!({})).unwrap_err();
        assert!(matches!(err, Error::UnknownTool(name) if name == "drop_tables"));
    }
}
