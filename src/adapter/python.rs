//! Python language adapter
//!
//! Extracts callables, imports and markers from Python source files using tree-sitter.

use crate::{Result, Error};
use crate::model::FunctionRecord;
use super::framework::{LanguageAdapter, AdapterResult};
use super::markers::scan_markers;
use std::collections::BTreeSet;
use std::sync::Mutex;
use tree_sitter::{Node, Parser, Tree};

/// Syntax-tree depth past which a file is rejected
const MAX_NESTING: usize = 1000;

/// Python language adapter
pub struct PythonAdapter {
    parser: Mutex<Parser>,
}

/// Per-file state threaded through the tree walk
struct Extraction<'s> {
    path: &'s str,
    source: &'s [u8],
    lines: Vec<&'s str>,
    dependencies: BTreeSet<String>,
    result: AdapterResult,
}

impl PythonAdapter {
    /// Create a new Python adapter
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| Error::Adapter(format!("Failed to set language: {}", e)))?;

        Ok(Self {
            parser: Mutex::new(parser),
        })
    }

    fn parse_tree(&self, content: &str) -> Result<Tree> {
        let mut parser = self
            .parser
            .lock()
            .map_err(|_| Error::Adapter("Parser lock poisoned".to_string()))?;
        parser
            .parse(content, None)
            .ok_or_else(|| Error::Adapter("Failed to parse file".to_string()))
    }

    /// Walk the AST in pre-order, collecting functions and imports.
    ///
    /// Iterative, so stack use does not grow with nesting depth. Anything
    /// nested deeper than `MAX_NESTING` is rejected like a syntax error.
    fn walk_tree(&self, root: Node, ex: &mut Extraction) -> Result<()> {
        let mut cursor = root.walk();
        if !cursor.goto_first_child() {
            return Ok(());
        }
        let mut depth = 1;

        loop {
            let node = cursor.node();
            let mut descend = false;
            if node.is_named() {
                match node.kind() {
                    "function_definition" => {
                        if let Some(function) = self.extract_function(node, ex) {
                            ex.result.add_function(function);
                        }
                        // Nested definitions and imports inside the body
                        descend = true;
                    }
                    "import_statement" | "import_from_statement" => {
                        self.extract_import(node, ex);
                    }
                    "future_import_statement" => {
                        ex.dependencies.insert("__future__".to_string());
                    }
                    _ => descend = true,
                }
            }

            if descend && cursor.goto_first_child() {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(Error::Parse(format!(
                        "too deeply nested near line {}",
                        cursor.node().start_position().row + 1
                    )));
                }
                continue;
            }

            while !cursor.goto_next_sibling() {
                cursor.goto_parent();
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }
    }

    /// Extract function definition
    fn extract_function(&self, node: Node, ex: &Extraction) -> Option<FunctionRecord> {
        let name = node.child_by_field_name("name")?.utf8_text(ex.source).ok()?;

        let line_start = node.start_position().row as u32 + 1;
        let end = node.end_position();
        let mut line_end = end.row as u32 + 1;
        // A span ending at column 0 stops before that line's first character.
        if end.column == 0 && line_end > line_start {
            line_end -= 1;
        }

        let args = node
            .child_by_field_name("parameters")
            .map(|params| self.extract_params(params, ex.source))
            .unwrap_or_default();

        let docstring = self.extract_docstring(node, ex.source).unwrap_or_default();

        Some(FunctionRecord {
            id: None,
            name: name.to_string(),
            file: ex.path.to_string(),
            line_start,
            line_end,
            args,
            docstring,
            code: code_snippet(&ex.lines, line_start, line_end),
        })
    }

    /// Parameter base names; annotations, defaults and `*`/`**` markers are dropped
    fn extract_params(&self, params: Node, source: &[u8]) -> Vec<String> {
        let mut cursor = params.walk();
        params
            .named_children(&mut cursor)
            .filter_map(|p| param_name(p, source))
            .map(str::to_string)
            .collect()
    }

    /// Extract docstring from a node
    fn extract_docstring(&self, node: Node, source: &[u8]) -> Option<String> {
        // Look for expression_statement with string as first statement of body
        let body = node.child_by_field_name("body")?;
        let mut cursor = body.walk();
        let first_stmt = body
            .named_children(&mut cursor)
            .find(|n| n.kind() != "comment")?;

        if first_stmt.kind() != "expression_statement" {
            return None;
        }

        let mut cursor = first_stmt.walk();
        let expr = first_stmt.named_children(&mut cursor).next()?;
        if expr.kind() != "string" {
            return None;
        }

        string_body(expr, source).map(clean_docstring)
    }

    /// Extract import statement
    fn extract_import(&self, node: Node, ex: &mut Extraction) {
        match node.kind() {
            "import_statement" => {
                // import foo.bar, baz as b
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    let dotted = match child.kind() {
                        "dotted_name" => Some(child),
                        "aliased_import" => child.child_by_field_name("name"),
                        _ => None,
                    };
                    if let Some(name) = dotted.and_then(|n| n.utf8_text(ex.source).ok()) {
                        if let Some(top) = top_level_module(name) {
                            ex.dependencies.insert(top);
                        }
                    }
                }
            }
            "import_from_statement" => {
                // from foo.bar import baz / from .foo import baz
                let Some(module) = node.child_by_field_name("module_name") else {
                    return;
                };
                let dotted = match module.kind() {
                    "relative_import" => {
                        let mut cursor = module.walk();
                        let found = module
                            .named_children(&mut cursor)
                            .find(|n| n.kind() == "dotted_name");
                        found
                    }
                    _ => Some(module),
                };
                if let Some(name) = dotted.and_then(|n| n.utf8_text(ex.source).ok()) {
                    if let Some(top) = top_level_module(name) {
                        ex.dependencies.insert(top);
                    }
                }
            }
            _ => {}
        }
    }
}

impl LanguageAdapter for PythonAdapter {
    fn language_name(&self) -> &str {
        "Python"
    }

    fn file_extensions(&self) -> &[&str] {
        &["py"]
    }

    fn parse_file(&self, path: &str, content: &str) -> Result<AdapterResult> {
        let tree = self.parse_tree(content)?;
        let root = tree.root_node();

        if root.has_error() {
            let line = first_error(root)
                .map(|n| n.start_position().row + 1)
                .unwrap_or(1);
            return Err(Error::Parse(format!("invalid syntax near line {}", line)));
        }

        let mut ex = Extraction {
            path,
            source: content.as_bytes(),
            lines: content.lines().collect(),
            dependencies: BTreeSet::new(),
            result: AdapterResult::new(),
        };

        self.walk_tree(root, &mut ex)?;

        let mut result = ex.result;
        result.dependencies = ex.dependencies.into_iter().collect();
        result.markers = scan_markers(path, content);
        Ok(result)
    }
}

fn param_name<'a>(node: Node, source: &'a [u8]) -> Option<&'a str> {
    match node.kind() {
        "identifier" => node.utf8_text(source).ok(),
        "default_parameter" | "typed_default_parameter" => {
            param_name(node.child_by_field_name("name")?, source)
        }
        "typed_parameter" | "list_splat_pattern" | "dictionary_splat_pattern" => {
            let mut cursor = node.walk();
            let inner = node.named_children(&mut cursor).next();
            inner.and_then(|n| param_name(n, source))
        }
        // keyword_separator (`*`) and positional_separator (`/`)
        _ => None,
    }
}

/// `a.b.c` -> `a`
fn top_level_module(name: &str) -> Option<String> {
    let first = name.split('.').next()?.trim();
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

/// Text between the opening and closing quotes of a plain (non f-, non byte-) string
fn string_body<'a>(string: Node, source: &'a [u8]) -> Option<&'a str> {
    let mut cursor = string.walk();
    let mut start = None;
    let mut end = None;
    for child in string.children(&mut cursor) {
        match child.kind() {
            "string_start" => start = Some(child),
            "string_end" => end = Some(child),
            _ => {}
        }
    }
    let (start, end) = (start?, end?);

    let prefix = start.utf8_text(source).ok()?;
    if prefix.chars().any(|c| matches!(c, 'f' | 'F' | 'b' | 'B')) {
        return None;
    }

    std::str::from_utf8(source.get(start.end_byte()..end.start_byte())?).ok()
}

/// First ERROR or MISSING node in pre-order
fn first_error(root: Node) -> Option<Node> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        // Only subtrees that contain an error are worth entering.
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

/// Source lines `start..=end` (1-indexed); empty when the span is out of range
fn code_snippet(lines: &[&str], start: u32, end: u32) -> String {
    let (start, end) = (start as usize, end as usize);
    if start == 0 || start > end || end > lines.len() {
        return String::new();
    }
    lines[start - 1..end].join("\n")
}

/// Normalize docstring indentation: the first line is left-stripped, the
/// common indentation of the remaining lines is removed, and blank lines at
/// either end are dropped.
pub fn clean_docstring(raw: &str) -> String {
    let lines: Vec<String> = raw
        .split('\n')
        .map(|l| expand_tabs(l.trim_end_matches('\r')))
        .collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min();

    let mut cleaned: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.trim_start()
            } else {
                match margin {
                    Some(m) => line.get(m..).unwrap_or_else(|| line.trim_start()),
                    None => line.as_str(),
                }
            }
        })
        .collect();

    while cleaned.last().is_some_and(|l| l.trim().is_empty()) {
        cleaned.pop();
    }
    let leading_blank = cleaned.iter().take_while(|l| l.trim().is_empty()).count();

    cleaned[leading_blank..].join("\n")
}

fn expand_tabs(line: &str) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + 8);
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = 8 - column % 8;
            out.extend(std::iter::repeat_n(' ', pad));
            column += pad;
        } else {
            out.push(c);
            column += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MarkerKind;

    fn parse(content: &str) -> AdapterResult {
        PythonAdapter::new().unwrap().parse_file("pkg/mod.py", content).unwrap()
    }

    #[test]
    fn test_functions_nested_and_methods() {
        let content = r#"
def hello():
    print("hello")

class Foo:
    def bar(self):
        def inner():
            pass
        return inner

async def world():
    pass
"#;
        let result = parse(content);
        let names: Vec<_> = result.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["hello", "bar", "inner", "world"]);

        let hello = &result.functions[0];
        assert_eq!(hello.file, "pkg/mod.py");
        assert_eq!(hello.line_start, 2);
        assert_eq!(hello.line_end, 3);
        assert_eq!(hello.code, "def hello():\n    print(\"hello\")");

        let bar = &result.functions[1];
        assert_eq!((bar.line_start, bar.line_end), (6, 9));
        assert!(bar.line_end >= bar.line_start);
    }

    #[test]
    fn test_parameter_base_names() {
        let content = "def f(a, b: int, c=1, d: str = 'x', *args, e, **kwargs):\n    pass\n\ndef g(x, /, y, *, z):\n    pass\n";
        let result = parse(content);
        assert_eq!(result.functions[0].args, vec!["a", "b", "c", "d", "args", "e", "kwargs"]);
        assert_eq!(result.functions[1].args, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_decorated_function_starts_at_def() {
        let content = "@decorator\ndef wrapped():\n    return 1\n";
        let result = parse(content);
        assert_eq!(result.functions.len(), 1);
        assert_eq!(result.functions[0].line_start, 2);
        assert_eq!(result.functions[0].line_end, 3);
    }

    #[test]
    fn test_docstrings() {
        let content = r#"
def documented():
    """Parses the input.

    Indented detail.
        More.
    """
    return 1

def single():
    'one line'

def fstring():
    f"not a {docstring}"

def late():
    x = 1
    """too late"""
"#;
        let result = parse(content);
        assert_eq!(result.functions[0].docstring, "Parses the input.\n\nIndented detail.\n    More.");
        assert_eq!(result.functions[1].docstring, "one line");
        assert_eq!(result.functions[2].docstring, "");
        assert_eq!(result.functions[3].docstring, "");
    }

    #[test]
    fn test_dependencies_top_level_deduplicated() {
        let content = r#"
import os.path
import json as j, collections.abc
from typing import List, Dict
from typing.io import IO
from .sibling import thing
from . import other
from __future__ import annotations

def lazy():
    import numpy.linalg
"#;
        let result = parse(content);
        assert_eq!(
            result.dependencies,
            vec!["__future__", "collections", "json", "numpy", "os", "sibling", "typing"]
        );
    }

    #[test]
    fn test_markers_collected() {
        let content = "def f():\n    # TODO: fix this\n    pass  # FIXME: later\n";
        let result = parse(content);
        assert_eq!(result.markers.len(), 2);
        assert_eq!(result.markers[0].kind, MarkerKind::Todo);
        assert_eq!(result.markers[1].line, 3);
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let adapter = PythonAdapter::new().unwrap();
        let err = adapter.parse_file("bad.py", "def broken(:\n    pass\n").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_deep_nesting_is_rejected_not_overflowed() {
        let content = format!("x = {}1{}\n", "(".repeat(30_000), ")".repeat(30_000));
        let adapter = PythonAdapter::new().unwrap();
        let err = adapter.parse_file("deep.py", &content).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));

        // Ordinary nesting is well below the cap.
        let nested = format!("def f():\n    return {}1{}\n", "(".repeat(50), ")".repeat(50));
        assert_eq!(adapter.parse_file("ok.py", &nested).unwrap().functions.len(), 1);
    }

    #[test]
    fn test_docstring_is_raw_literal_text() {
        let content = r#"
def escaped():
    """Tab\there\n"""

def concatenated():
    "first " "second"

def raw():
    r"""Raw \d+ pattern."""
"#;
        let result = parse(content);
        // Escape sequences are kept as written.
        assert_eq!(result.functions[0].docstring, r"Tab\there\n");
        // Implicit concatenation is not treated as a docstring.
        assert_eq!(result.functions[1].docstring, "");
        assert_eq!(result.functions[2].docstring, r"Raw \d+ pattern.");
    }

    #[test]
    fn test_clean_docstring() {
        assert_eq!(clean_docstring("  Summary.  "), "Summary.  ");
        assert_eq!(clean_docstring("\n    First\n      second\n    "), "First\n  second");
        assert_eq!(clean_docstring(""), "");
    }
}
