// src/pycode/mod.rs
// Python source analysis built on tree-sitter. Every syntax-aware feature of
// the agent funnels through here: chunk extraction, symbol collection,
// capability summaries, generated-code validation and the structure edits.

pub mod edit;

use std::collections::BTreeSet;

use anyhow::{anyhow, Result};
use tree_sitter::{Node, Parser, Tree};

/// Create a parser configured for Python.
pub fn parser() -> Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| anyhow!("failed to set Python language: {}", e))?;
    Ok(parser)
}

pub fn parse(content: &str) -> Result<Tree> {
    let mut parser = parser()?;
    parser
        .parse(content, None)
        .ok_or_else(|| anyhow!("tree-sitter failed to parse source"))
}

/// Returns the first syntax problem in the source, if any.
pub fn syntax_error(content: &str) -> Option<String> {
    let tree = match parse(content) {
        Ok(tree) => tree,
        Err(e) => return Some(e.to_string()),
    };
    let root = tree.root_node();
    if !root.has_error() {
        return None;
    }
    Some(
        find_error_node(root)
            .map(|node| format!("invalid syntax at line {}", node.start_position().row + 1))
            .unwrap_or_else(|| "invalid syntax".to_string()),
    )
}

pub fn is_valid(content: &str) -> bool {
    syntax_error(content).is_none()
}

fn find_error_node(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    for child in node.children(&mut node.walk()) {
        if child.has_error() {
            if let Some(found) = find_error_node(child) {
                return Some(found);
            }
        }
    }
    None
}

pub fn node_text(node: Node, source: &str) -> String {
    source[node.byte_range()].to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefKind {
    Function,
    Class,
}

impl DefKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefKind::Function => "function",
            DefKind::Class => "class",
        }
    }
}

/// A top-level function or class, with a byte span that includes any
/// decorators so a replacement swaps the whole construct.
#[derive(Debug, Clone)]
pub struct TopLevelDef {
    pub kind: DefKind,
    pub name: String,
    pub start_byte: usize,
    pub end_byte: usize,
    pub line: usize,
}

/// Top-level functions and classes of a module, in source order.
pub fn top_level_defs(content: &str) -> Result<Vec<TopLevelDef>> {
    let tree = parse(content)?;
    let root = tree.root_node();
    let mut defs = Vec::new();
    for child in root.named_children(&mut root.walk()) {
        let (span_node, def_node) = match child.kind() {
            "function_definition" | "class_definition" => (child, child),
            "decorated_definition" => match child.child_by_field_name("definition") {
                Some(inner) => (child, inner),
                None => continue,
            },
            _ => continue,
        };
        let kind = match def_node.kind() {
            "function_definition" => DefKind::Function,
            "class_definition" => DefKind::Class,
            _ => continue,
        };
        let Some(name_node) = def_node.child_by_field_name("name") else {
            continue;
        };
        defs.push(TopLevelDef {
            kind,
            name: node_text(name_node, content),
            start_byte: span_node.start_byte(),
            end_byte: span_node.end_byte(),
            line: span_node.start_position().row + 1,
        });
    }
    Ok(defs)
}

/// Capability summary of a module: imports, top-level functions and classes.
#[derive(Debug, Default)]
pub struct FileSummary {
    pub imports: BTreeSet<String>,
    pub functions: BTreeSet<String>,
    pub classes: BTreeSet<String>,
}

impl FileSummary {
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.functions.is_empty() && self.classes.is_empty()
    }
}

pub fn summarize(content: &str) -> Result<FileSummary> {
    let tree = parse(content)?;
    if tree.root_node().has_error() {
        return Err(anyhow!("source contains syntax errors"));
    }
    let root = tree.root_node();
    let mut summary = FileSummary::default();

    for child in root.named_children(&mut root.walk()) {
        match child.kind() {
            "import_statement" => {
                for name in child.named_children(&mut child.walk()) {
                    match name.kind() {
                        "dotted_name" => {
                            summary.imports.insert(node_text(name, content));
                        }
                        "aliased_import" => {
                            if let Some(module) = name.child_by_field_name("name") {
                                summary.imports.insert(node_text(module, content));
                            }
                        }
                        _ => {}
                    }
                }
            }
            "import_from_statement" => {
                if let Some(module) = child.child_by_field_name("module_name") {
                    summary.imports.insert(node_text(module, content));
                }
            }
            "function_definition" => {
                if let Some(name) = child.child_by_field_name("name") {
                    summary.functions.insert(node_text(name, content));
                }
            }
            "class_definition" => {
                if let Some(name) = child.child_by_field_name("name") {
                    summary.classes.insert(node_text(name, content));
                }
            }
            "decorated_definition" => {
                if let Some(inner) = child.child_by_field_name("definition") {
                    if let Some(name) = inner.child_by_field_name("name") {
                        match inner.kind() {
                            "function_definition" => {
                                summary.functions.insert(node_text(name, content));
                            }
                            "class_definition" => {
                                summary.classes.insert(node_text(name, content));
                            }
                            _ => {}
                        }
                    }
                }
            }
            _ => {}
        }
    }
    Ok(summary)
}

/// Renames every bare-name occurrence of `old_name` to `new_name`. Attribute
/// positions (`x.old_name`) and keyword-argument names are left alone, as is
/// the module part of import statements; names introduced by
/// `from m import old_name` are renamed.
pub fn rename_source(content: &str, old_name: &str, new_name: &str) -> Result<String> {
    let tree = parse(content)?;
    if tree.root_node().has_error() {
        return Err(anyhow!("source contains syntax errors"));
    }

    let mut spans: Vec<(usize, usize)> = Vec::new();
    collect_rename_spans(tree.root_node(), content, old_name, &mut spans);

    let mut result = content.to_string();
    for (start, end) in spans.into_iter().rev() {
        result.replace_range(start..end, new_name);
    }
    Ok(result)
}

fn collect_rename_spans(node: Node, source: &str, old_name: &str, spans: &mut Vec<(usize, usize)>) {
    match node.kind() {
        // Plain `import x` never introduces a bare binding we rename.
        "import_statement" => return,
        "import_from_statement" => {
            let module_span = node
                .child_by_field_name("module_name")
                .map(|m| m.byte_range());
            for child in node.children(&mut node.walk()) {
                if let Some(span) = &module_span {
                    if child.byte_range() == *span {
                        continue;
                    }
                }
                collect_rename_spans(child, source, old_name, spans);
            }
            return;
        }
        "identifier" => {
            if &source[node.byte_range()] == old_name && !is_attribute_or_keyword_name(node) {
                spans.push((node.start_byte(), node.end_byte()));
            }
            return;
        }
        _ => {}
    }
    for child in node.children(&mut node.walk()) {
        collect_rename_spans(child, source, old_name, spans);
    }
}

fn is_attribute_or_keyword_name(node: Node) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        "attribute" => parent
            .child_by_field_name("attribute")
            .map(|attr| attr.byte_range() == node.byte_range())
            .unwrap_or(false),
        "keyword_argument" => parent
            .child_by_field_name("name")
            .map(|name| name.byte_range() == node.byte_range())
            .unwrap_or(false),
        _ => false,
    }
}

/// Find a function definition by name at any nesting depth. The returned node
/// is the `function_definition` itself (not its decorators).
pub fn find_function<'a>(root: Node<'a>, source: &str, name: &str) -> Option<Node<'a>> {
    find_def(root, source, name, "function_definition")
}

pub fn find_class<'a>(root: Node<'a>, source: &str, name: &str) -> Option<Node<'a>> {
    find_def(root, source, name, "class_definition")
}

fn find_def<'a>(node: Node<'a>, source: &str, name: &str, kind: &str) -> Option<Node<'a>> {
    if node.kind() == kind {
        if let Some(name_node) = node.child_by_field_name("name") {
            if &source[name_node.byte_range()] == name {
                return Some(node);
            }
        }
    }
    for child in node.children(&mut node.walk()) {
        if let Some(found) = find_def(child, source, name, kind) {
            return Some(found);
        }
    }
    None
}

/// The byte offset where the line containing `byte` starts.
pub fn line_start(content: &str, byte: usize) -> usize {
    content[..byte].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// The whitespace prefix of the line containing `byte`.
pub fn line_indent(content: &str, byte: usize) -> String {
    let start = line_start(content, byte);
    content[start..byte]
        .chars()
        .take_while(|c| c.is_whitespace())
        .collect()
}

/// Re-indent a block of code so it can be spliced in at a position that is
/// already at the target column: the first line is left alone, every later
/// non-empty line gets the indent prefix.
pub fn reindent_block(code: &str, indent: &str) -> String {
    let mut lines = code.lines();
    let mut out = String::new();
    if let Some(first) = lines.next() {
        out.push_str(first);
    }
    for line in lines {
        out.push('\n');
        if !line.trim().is_empty() {
            out.push_str(indent);
        }
        out.push_str(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_syntax_errors() {
        assert!(is_valid("def ok():\n    return 1\n"));
        assert!(!is_valid("def broken(:\n    pass\n"));
        let err = syntax_error("def broken(:\n    pass\n").unwrap();
        assert!(err.contains("line"));
    }

    #[test]
    fn top_level_defs_include_decorated_spans() {
        let code = "import os\n\n@cached\ndef handler():\n    pass\n\nclass Widget:\n    pass\n";
        let defs = top_level_defs(code).unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "handler");
        assert_eq!(defs[0].kind, DefKind::Function);
        assert!(code[defs[0].start_byte..defs[0].end_byte].starts_with("@cached"));
        assert_eq!(defs[1].name, "Widget");
        assert_eq!(defs[1].kind, DefKind::Class);
    }

    #[test]
    fn summarize_extracts_capabilities() {
        let code = "import json\nfrom pathlib import Path\n\n\ndef load():\n    pass\n\n\nclass Store:\n    def get(self):\n        pass\n";
        let summary = summarize(code).unwrap();
        assert!(summary.imports.contains("json"));
        assert!(summary.imports.contains("pathlib"));
        assert!(summary.functions.contains("load"));
        assert!(summary.classes.contains("Store"));
        // Methods are not top-level functions.
        assert!(!summary.functions.contains("get"));
    }

    #[test]
    fn rename_covers_defs_calls_and_from_imports() {
        let code = "from a import foo\n\n\ndef wrapper():\n    return foo()\n";
        let renamed = rename_source(code, "foo", "bar").unwrap();
        assert_eq!(renamed, "from a import bar\n\n\ndef wrapper():\n    return bar()\n");
    }

    #[test]
    fn rename_skips_attribute_and_keyword_positions() {
        let code = "value = obj.foo\ncall(foo=1)\nfoo()\n";
        let renamed = rename_source(code, "foo", "bar").unwrap();
        assert_eq!(renamed, "value = obj.foo\ncall(foo=1)\nbar()\n");
    }

    #[test]
    fn rename_round_trip_is_byte_identical() {
        let code = "def foo():\n    return foo\n\n\nresult = foo()\n";
        let there = rename_source(code, "foo", "bar").unwrap();
        let back = rename_source(&there, "bar", "foo").unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn rename_leaves_module_names_alone() {
        let code = "from foo import helper\nimport foo\n";
        let renamed = rename_source(code, "foo", "bar").unwrap();
        assert_eq!(renamed, code);
    }

    #[test]
    fn finds_nested_functions() {
        let code = "class A:\n    def method(self):\n        pass\n";
        let tree = parse(code).unwrap();
        assert!(find_function(tree.root_node(), code, "method").is_some());
        assert!(find_class(tree.root_node(), code, "A").is_some());
        assert!(find_function(tree.root_node(), code, "missing").is_none());
    }

    #[test]
    fn reindent_prefixes_continuation_lines() {
        let block = "def m(self):\n    return 1";
        assert_eq!(reindent_block(block, "    "), "def m(self):\n        return 1");
    }
}
