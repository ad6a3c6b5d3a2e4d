// src/index/symbols.rs
// In-memory, per-project symbol table derived from Python syntax trees:
// definitions by name, plus the call sets that power reverse lookups.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{debug, info, warn};
use tree_sitter::Node;
use walkdir::WalkDir;

use crate::pycode::{self, node_text};
use crate::workspace::project::{relative_display, EXCLUDED_DIRS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Class,
    Function,
    Method,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
        }
    }
}

/// A defined symbol (class, function, method) in the codebase.
#[derive(Debug, Clone)]
pub struct CodeSymbol {
    pub name: String,
    pub file_path: String,
    pub line: usize,
    pub kind: SymbolKind,
    pub parent_class: Option<String>,
    pub calls: HashSet<String>,
}

/// Maintains the project's symbol definitions and a reverse file map for
/// incremental updates.
#[derive(Default)]
pub struct SymbolIndex {
    definitions: HashMap<String, Vec<CodeSymbol>>,
    file_symbols: HashMap<String, Vec<String>>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans the whole project and builds the symbol index.
    pub fn build_for_project(&mut self, project_root: &Path) {
        self.definitions.clear();
        self.file_symbols.clear();

        let py_files: Vec<_> = WalkDir::new(project_root)
            .into_iter()
            .filter_entry(|e| {
                !(e.file_type().is_dir()
                    && EXCLUDED_DIRS.contains(&e.file_name().to_string_lossy().as_ref()))
            })
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_type().is_file()
                    && e.path().extension().map(|x| x == "py").unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();

        for file in py_files {
            match std::fs::read_to_string(&file) {
                Ok(content) => {
                    let relative = relative_display(project_root, &file);
                    self.update_file(&relative, &content);
                }
                Err(e) => warn!("Could not read {} for symbol index: {}", file.display(), e),
            }
        }

        info!(
            "Symbol index built. Found {} unique symbol names.",
            self.definitions.len()
        );
    }

    /// Removes every symbol attributed to `file_path` then re-indexes from
    /// `content`. A file with syntax errors ends up with no entries.
    pub fn update_file(&mut self, file_path: &str, content: &str) {
        if let Some(names) = self.file_symbols.remove(file_path) {
            for name in names {
                if let Some(symbols) = self.definitions.get_mut(&name) {
                    symbols.retain(|s| s.file_path != file_path);
                    if symbols.is_empty() {
                        self.definitions.remove(&name);
                    }
                }
            }
        }

        let symbols = match collect_symbols(file_path, content) {
            Ok(symbols) => symbols,
            Err(e) => {
                warn!("Cannot update symbol index for {}: {}", file_path, e);
                return;
            }
        };

        let mut names = Vec::new();
        for symbol in symbols {
            names.push(symbol.name.clone());
            self.definitions
                .entry(symbol.name.clone())
                .or_default()
                .push(symbol);
        }
        if !names.is_empty() {
            debug!("Indexed {} symbols from {}", names.len(), file_path);
            self.file_symbols.insert(file_path.to_string(), names);
        }
    }

    /// The definition(s) of a symbol by name.
    pub fn find_definition(&self, name: &str) -> Vec<CodeSymbol> {
        self.definitions.get(name).cloned().unwrap_or_default()
    }

    /// Every symbol whose call set contains `name`.
    pub fn find_references(&self, name: &str) -> Vec<CodeSymbol> {
        let mut references: Vec<CodeSymbol> = self
            .definitions
            .values()
            .flatten()
            .filter(|symbol| symbol.calls.contains(name))
            .cloned()
            .collect();
        references.sort_by(|a, b| (&a.file_path, a.line).cmp(&(&b.file_path, b.line)));
        references
    }

    /// The call set of the (first) definition of `name`.
    pub fn get_callees(&self, name: &str) -> HashSet<String> {
        self.definitions
            .get(name)
            .and_then(|defs| defs.first())
            .map(|symbol| symbol.calls.clone())
            .unwrap_or_default()
    }

    /// All files that define or reference a symbol; the working set for a
    /// project-wide rename.
    pub fn files_touching(&self, name: &str) -> Vec<String> {
        let mut files: HashSet<String> = HashSet::new();
        for symbol in self.find_definition(name) {
            files.insert(symbol.file_path);
        }
        for symbol in self.find_references(name) {
            files.insert(symbol.file_path);
        }
        let mut files: Vec<String> = files.into_iter().collect();
        files.sort();
        files
    }
}

/// Extract the symbols of one module: top-level functions, classes, and
/// class methods (one level deep), each with its internal call set.
fn collect_symbols(file_path: &str, content: &str) -> anyhow::Result<Vec<CodeSymbol>> {
    let tree = pycode::parse(content)?;
    if tree.root_node().has_error() {
        anyhow::bail!("syntax error in {}", file_path);
    }

    let root = tree.root_node();
    let mut symbols = Vec::new();
    for child in root.named_children(&mut root.walk()) {
        visit_top_level(child, content, file_path, &mut symbols);
    }
    Ok(symbols)
}

fn visit_top_level(node: Node, source: &str, file_path: &str, out: &mut Vec<CodeSymbol>) {
    match node.kind() {
        "decorated_definition" => {
            if let Some(inner) = node.child_by_field_name("definition") {
                visit_top_level(inner, source, file_path, out);
            }
        }
        "function_definition" => {
            if let Some(symbol) = function_symbol(node, source, file_path, None) {
                out.push(symbol);
            }
        }
        "class_definition" => {
            let Some(name_node) = node.child_by_field_name("name") else {
                return;
            };
            let class_name = node_text(name_node, source);
            out.push(CodeSymbol {
                name: class_name.clone(),
                file_path: file_path.to_string(),
                line: node.start_position().row + 1,
                kind: SymbolKind::Class,
                parent_class: None,
                calls: HashSet::new(),
            });

            if let Some(body) = node.child_by_field_name("body") {
                for stmt in body.named_children(&mut body.walk()) {
                    let method_node = match stmt.kind() {
                        "function_definition" => Some(stmt),
                        "decorated_definition" => stmt
                            .child_by_field_name("definition")
                            .filter(|d| d.kind() == "function_definition"),
                        _ => None,
                    };
                    if let Some(method) = method_node {
                        if let Some(symbol) =
                            function_symbol(method, source, file_path, Some(&class_name))
                        {
                            out.push(symbol);
                        }
                    }
                }
            }
        }
        _ => {}
    }
}

fn function_symbol(
    node: Node,
    source: &str,
    file_path: &str,
    parent_class: Option<&str>,
) -> Option<CodeSymbol> {
    let name_node = node.child_by_field_name("name")?;
    let mut calls = HashSet::new();
    if let Some(body) = node.child_by_field_name("body") {
        collect_calls(body, source, &mut calls);
    }
    Some(CodeSymbol {
        name: node_text(name_node, source),
        file_path: file_path.to_string(),
        line: node.start_position().row + 1,
        kind: if parent_class.is_some() {
            SymbolKind::Method
        } else {
            SymbolKind::Function
        },
        parent_class: parent_class.map(str::to_string),
        calls,
    })
}

/// Collect call targets inside a body: `f()` yields "f", `x.m()` yields "m".
fn collect_calls(node: Node, source: &str, calls: &mut HashSet<String>) {
    if node.kind() == "call" {
        if let Some(function) = node.child_by_field_name("function") {
            match function.kind() {
                "identifier" => {
                    calls.insert(node_text(function, source));
                }
                "attribute" => {
                    if let Some(attr) = function.child_by_field_name("attribute") {
                        calls.insert(node_text(attr, source));
                    }
                }
                _ => {}
            }
        }
    }
    for child in node.children(&mut node.walk()) {
        collect_calls(child, source, calls);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::project::write_file;

    const MODULE_A: &str = "def foo():\n    helper()\n    obj.save()\n\n\nclass Widget:\n    def render(self):\n        foo()\n";

    #[test]
    fn definitions_methods_and_calls() {
        let mut index = SymbolIndex::new();
        index.update_file("a.py", MODULE_A);

        let foo = index.find_definition("foo");
        assert_eq!(foo.len(), 1);
        assert_eq!(foo[0].kind, SymbolKind::Function);
        assert!(foo[0].calls.contains("helper"));
        assert!(foo[0].calls.contains("save"), "attribute calls use the method name");

        let widget = index.find_definition("Widget");
        assert_eq!(widget[0].kind, SymbolKind::Class);

        let render = index.find_definition("render");
        assert_eq!(render[0].kind, SymbolKind::Method);
        assert_eq!(render[0].parent_class.as_deref(), Some("Widget"));

        let refs = index.find_references("foo");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "render");

        assert!(index.get_callees("foo").contains("helper"));
        assert!(index.get_callees("nonexistent").is_empty());
    }

    #[test]
    fn update_file_replaces_prior_symbols() {
        let mut index = SymbolIndex::new();
        index.update_file("a.py", MODULE_A);
        index.update_file("a.py", "def bar():\n    pass\n");

        assert!(index.find_definition("foo").is_empty());
        assert_eq!(index.find_definition("bar").len(), 1);
    }

    #[test]
    fn syntax_errors_leave_no_entries_for_the_file() {
        let mut index = SymbolIndex::new();
        index.update_file("a.py", MODULE_A);
        index.update_file("a.py", "def broken(:\n    pass\n");
        assert!(index.find_definition("foo").is_empty());
    }

    #[test]
    fn files_touching_includes_defs_and_refs() {
        let mut index = SymbolIndex::new();
        index.update_file("a.py", "def foo():\n    pass\n");
        index.update_file("b.py", "from a import foo\n\n\ndef caller():\n    foo()\n");

        assert_eq!(index.files_touching("foo"), vec!["a.py".to_string(), "b.py".to_string()]);
    }

    #[test]
    fn build_for_project_walks_py_files() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "m.py", "def top():\n    pass\n").unwrap();
        write_file(dir.path(), "pkg/n.py", "class Deep:\n    pass\n").unwrap();
        write_file(dir.path(), "README.md", "def not_python(): pass").unwrap();
        write_file(dir.path(), ".venv/x.py", "def hidden():\n    pass\n").unwrap();

        let mut index = SymbolIndex::new();
        index.build_for_project(dir.path());

        assert_eq!(index.find_definition("top").len(), 1);
        assert_eq!(index.find_definition("Deep")[0].file_path, "pkg/n.py");
        assert!(index.find_definition("hidden").is_empty());
        assert!(index.find_definition("not_python").is_empty());
    }
}
