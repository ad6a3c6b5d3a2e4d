// src/pycode/edit.rs
// Structure edits on Python sources: parse with tree-sitter, splice the
// computed byte spans, return the new source. Callers write the result back
// and refresh the indices.

use anyhow::{anyhow, bail, Result};
use tree_sitter::Node;

use super::{
    find_class, find_function, line_indent, line_start, node_text, parse, reindent_block,
    top_level_defs, DefKind,
};

const INDENT_UNIT: &str = "    ";

/// Outcome of `add_class_to_file` / `add_function_to_file`.
pub enum TopLevelEdit {
    Added { source: String, name: String },
    Replaced { source: String, name: String },
}

/// Outcome of `add_import`.
pub enum ImportEdit {
    Added { source: String, import_str: String },
    AlreadySatisfied { import_str: String },
}

fn parsed(content: &str) -> Result<tree_sitter::Tree> {
    let tree = parse(content)?;
    if tree.root_node().has_error() {
        bail!("the file contains a syntax error");
    }
    Ok(tree)
}

/// The first top-level definition of a snippet, with its name.
fn first_def_of(snippet: &str, expected: DefKind, what: &str) -> Result<String> {
    if super::syntax_error(snippet).is_some() {
        bail!("`{}` contains a syntax error", what);
    }
    let defs = top_level_defs(snippet)
        .map_err(|e| anyhow!("`{}` is not valid Python: {}", what, e))?;
    match defs.first() {
        Some(def) if def.kind == expected => Ok(def.name.clone()),
        _ => bail!("`{}` does not contain a valid {} definition", what, expected.as_str()),
    }
}

/// Adds a class to a module; a same-named top-level function or class is
/// replaced in place.
pub fn add_class_to_file(content: &str, class_code: &str) -> Result<TopLevelEdit> {
    add_or_replace(content, class_code, DefKind::Class, true)
}

/// Adds a function to a module; a same-named top-level function is replaced.
pub fn add_function_to_file(content: &str, function_code: &str) -> Result<TopLevelEdit> {
    add_or_replace(content, function_code, DefKind::Function, false)
}

fn add_or_replace(
    content: &str,
    snippet: &str,
    expected: DefKind,
    replace_any_kind: bool,
) -> Result<TopLevelEdit> {
    let what = match expected {
        DefKind::Class => "class_code",
        DefKind::Function => "function_code",
    };
    let name = first_def_of(snippet, expected, what)?;
    let defs = {
        parsed(content)?;
        top_level_defs(content)?
    };

    let snippet = snippet.trim_end();
    let existing = defs
        .iter()
        .find(|def| def.name == name && (replace_any_kind || def.kind == expected));

    let source = match existing {
        Some(def) => {
            let mut out = content.to_string();
            out.replace_range(def.start_byte..def.end_byte, snippet);
            return Ok(TopLevelEdit::Replaced { source: out, name });
        }
        None => {
            let mut out = content.trim_end().to_string();
            if out.is_empty() {
                format!("{}\n", snippet)
            } else {
                out.push_str("\n\n\n");
                out.push_str(snippet);
                out.push('\n');
                out
            }
        }
    };
    Ok(TopLevelEdit::Added { source, name })
}

/// Replaces a top-level function or class with new code carrying the same name.
pub fn replace_node_in_file(content: &str, node_name: &str, new_code: &str) -> Result<String> {
    let new_defs = top_level_defs(new_code)?;
    if super::syntax_error(new_code).is_some() {
        bail!("`new_code` contains a syntax error");
    }
    let Some(new_def) = new_defs.first() else {
        bail!("`new_code` does not contain a valid function/class definition");
    };
    if new_def.name != node_name {
        bail!(
            "node name in `new_code` ('{}') does not match `node_name` ('{}')",
            new_def.name,
            node_name
        );
    }

    parsed(content)?;
    let defs = top_level_defs(content)?;
    let Some(target) = defs.iter().find(|def| def.name == node_name) else {
        bail!("node '{}' not found", node_name);
    };

    let mut out = content.to_string();
    out.replace_range(target.start_byte..target.end_byte, new_code.trim_end());
    Ok(out)
}

/// Information about a definition body needed for insertions.
struct BodyLayout {
    indent: String,
    first_line_start: usize,
    append_at: usize,
    pass_only: Option<(usize, usize, bool)>, // span + same-line-as-header flag
    statements: Vec<(usize, usize, String)>, // start, end, kind
}

fn body_layout(def: Node, content: &str) -> Result<BodyLayout> {
    let body = def
        .child_by_field_name("body")
        .ok_or_else(|| anyhow!("definition has no body"))?;
    let mut statements = Vec::new();
    for stmt in body.named_children(&mut body.walk()) {
        statements.push((stmt.start_byte(), stmt.end_byte(), stmt.kind().to_string()));
    }
    if statements.is_empty() {
        bail!("definition body is empty");
    }

    let (first_start, _, _) = statements[0];
    let header_row = def.start_position().row;
    let first_row = content[..first_start].matches('\n').count();
    let same_line = first_row == header_row;
    let indent = if same_line {
        format!("{}{}", line_indent(content, def.start_byte()), INDENT_UNIT)
    } else {
        line_indent(content, first_start)
    };

    let pass_only = if statements.len() == 1 {
        let (start, end, ref kind) = statements[0];
        let is_pass = kind == "pass_statement"
            || (kind == "expression_statement" && content[start..end].trim() == "...");
        is_pass.then_some((start, end, same_line))
    } else {
        None
    };

    let (_, last_end, _) = *statements.last().unwrap();
    let append_at = content[last_end..]
        .find('\n')
        .map(|i| last_end + i)
        .unwrap_or(content.len());

    Ok(BodyLayout {
        indent,
        first_line_start: line_start(content, first_start),
        append_at,
        pass_only,
        statements,
    })
}

fn indent_all(code: &str, indent: &str) -> String {
    code.lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{}{}", indent, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Splice a block into a body: replaces a `pass`-only body, otherwise inserts
/// at `position` (byte offset) with the body's indentation.
fn splice_block(content: &str, layout: &BodyLayout, block: &str, position: usize) -> String {
    let mut out = content.to_string();
    if let Some((start, end, same_line)) = layout.pass_only {
        let replacement = if same_line {
            format!("\n{}", indent_all(block, &layout.indent))
        } else {
            reindent_block(block, &layout.indent)
        };
        out.replace_range(start..end, &replacement);
        return out;
    }
    out.insert_str(position, &format!("\n{}", indent_all(block, &layout.indent)));
    out
}

/// Adds a new, empty method to a class.
pub fn add_method_to_class(
    content: &str,
    class_name: &str,
    name: &str,
    args: &[String],
    is_async: bool,
) -> Result<String> {
    let tree = parsed(content)?;
    let class_node = find_class(tree.root_node(), content, class_name)
        .ok_or_else(|| anyhow!("class '{}' not found", class_name))?;
    let layout = body_layout(class_node, content)?;

    let prefix = if is_async { "async def" } else { "def" };
    let method = format!("{} {}({}):\n{}pass", prefix, name, args.join(", "), INDENT_UNIT);

    if layout.pass_only.is_some() {
        Ok(splice_block(content, &layout, &method, layout.append_at))
    } else {
        let mut out = content.to_string();
        out.insert_str(
            layout.append_at,
            &format!("\n\n{}", indent_all(&method, &layout.indent)),
        );
        Ok(out)
    }
}

/// Replaces a method inside a class with new code.
pub fn replace_method_in_class(
    content: &str,
    class_name: &str,
    method_name: &str,
    new_code: &str,
) -> Result<String> {
    let new_name = first_def_of(new_code, DefKind::Function, "new_code")?;
    if new_name != method_name {
        bail!(
            "name in `new_code` ('{}') doesn't match `method_name` ('{}')",
            new_name,
            method_name
        );
    }

    let tree = parsed(content)?;
    let class_node = find_class(tree.root_node(), content, class_name)
        .ok_or_else(|| anyhow!("class '{}' not found", class_name))?;
    let method = find_function(class_node, content, method_name)
        .ok_or_else(|| anyhow!("method '{}' not found in class '{}'", method_name, class_name))?;

    let indent = line_indent(content, method.start_byte());
    let mut out = content.to_string();
    out.replace_range(
        method.start_byte()..method.end_byte(),
        &reindent_block(new_code.trim_end(), &indent),
    );
    Ok(out)
}

/// Appends code to a function body, before its first top-level `return`.
pub fn append_to_function(content: &str, function_name: &str, code_to_append: &str) -> Result<String> {
    if super::syntax_error(code_to_append).is_some() {
        bail!("`code_to_append` contains a syntax error");
    }
    let tree = parsed(content)?;
    let func = find_function(tree.root_node(), content, function_name)
        .ok_or_else(|| anyhow!("function '{}' not found", function_name))?;
    let layout = body_layout(func, content)?;

    let block = code_to_append.trim_end();
    if layout.pass_only.is_some() {
        return Ok(splice_block(content, &layout, block, layout.append_at));
    }

    if let Some(ret_start) = layout
        .statements
        .iter()
        .find(|(_, _, kind)| kind == "return_statement")
        .map(|(start, _, _)| *start)
    {
        let insert_at = line_start(content, ret_start);
        let mut out = content.to_string();
        out.insert_str(insert_at, &format!("{}\n", indent_all(block, &layout.indent)));
        Ok(out)
    } else {
        let mut out = content.to_string();
        out.insert_str(layout.append_at, &format!("\n{}", indent_all(block, &layout.indent)));
        Ok(out)
    }
}

/// Adds a parameter to a function signature. A parameter without a default is
/// inserted after the last non-default parameter; one with a default goes last.
pub fn add_parameter_to_function(
    content: &str,
    function_name: &str,
    parameter_name: &str,
    parameter_type: Option<&str>,
    default_value: Option<&str>,
) -> Result<String> {
    let tree = parsed(content)?;
    let func = find_function(tree.root_node(), content, function_name)
        .ok_or_else(|| anyhow!("function '{}' not found", function_name))?;
    let params = func
        .child_by_field_name("parameters")
        .ok_or_else(|| anyhow!("function '{}' has no parameter list", function_name))?;

    let mut named: Vec<Node> = Vec::new();
    for child in params.named_children(&mut params.walk()) {
        named.push(child);
    }
    for param in &named {
        if param_name(*param, content).as_deref() == Some(parameter_name) {
            bail!(
                "parameter '{}' already exists in function '{}'",
                parameter_name,
                function_name
            );
        }
    }

    let mut rendered = parameter_name.to_string();
    if let Some(ty) = parameter_type {
        rendered.push_str(&format!(": {}", ty));
    }
    if let Some(default) = default_value {
        if parameter_type.is_some() {
            rendered.push_str(&format!(" = {}", default));
        } else {
            rendered.push_str(&format!("={}", default));
        }
    }

    let open_end = params.start_byte() + 1;
    let close_start = params.end_byte() - 1;

    let (insert_at, text) = if default_value.is_some() || named.is_empty() {
        let prefix = if named.is_empty() { "" } else { ", " };
        (close_start, format!("{}{}", prefix, rendered))
    } else {
        let last_plain = named
            .iter()
            .rev()
            .find(|p| !matches!(p.kind(), "default_parameter" | "typed_default_parameter"));
        match last_plain {
            Some(node) => (node.end_byte(), format!(", {}", rendered)),
            None => (open_end, format!("{}, ", rendered)),
        }
    };

    let mut out = content.to_string();
    out.insert_str(insert_at, &text);
    Ok(out)
}

fn param_name(param: Node, content: &str) -> Option<String> {
    match param.kind() {
        "identifier" => Some(node_text(param, content)),
        "default_parameter" | "typed_default_parameter" => param
            .child_by_field_name("name")
            .map(|n| node_text(n, content)),
        "typed_parameter" | "list_splat_pattern" | "dictionary_splat_pattern" => {
            let mut cursor = param.walk();
            let result = param
                .named_children(&mut cursor)
                .find(|c| c.kind() == "identifier")
                .map(|n| node_text(n, content));
            result
        }
        _ => None,
    }
}

/// Adds a decorator above a function or method, outermost position.
pub fn add_decorator_to_function(
    content: &str,
    function_name: &str,
    decorator_code: &str,
) -> Result<String> {
    let decorator = decorator_code.trim();
    if !decorator.starts_with('@') {
        bail!("`decorator_code` must be a valid decorator string starting with '@'");
    }
    if super::syntax_error(&format!("{}\ndef _probe():\n    pass\n", decorator)).is_some() {
        bail!("invalid decorator syntax");
    }

    let tree = parsed(content)?;
    let func = find_function(tree.root_node(), content, function_name)
        .ok_or_else(|| anyhow!("function or method '{}' not found", function_name))?;

    // Anchor at the whole decorated_definition so the new decorator lands on top.
    let anchor = match func.parent() {
        Some(parent) if parent.kind() == "decorated_definition" => parent,
        _ => func,
    };
    let indent = line_indent(content, anchor.start_byte());
    let insert_at = line_start(content, anchor.start_byte());

    let mut out = content.to_string();
    out.insert_str(insert_at, &format!("{}{}\n", indent, decorator));
    Ok(out)
}

/// Adds an import statement if an equivalent one is not already present.
pub fn add_import(content: &str, module: &str, names: &[String]) -> Result<ImportEdit> {
    let tree = parsed(content)?;
    let root = tree.root_node();

    let import_str = if names.is_empty() {
        format!("import {}", module)
    } else {
        format!("from {} import {}", module, names.join(", "))
    };

    let mut insert_after: usize = 0;
    let mut seen_leading_block = false;
    for (index, child) in root.named_children(&mut root.walk()).enumerate() {
        match child.kind() {
            "import_statement" => {
                if names.is_empty() && plain_import_covers(child, content, module) {
                    return Ok(ImportEdit::AlreadySatisfied { import_str });
                }
                insert_after = child.end_byte();
                seen_leading_block = true;
            }
            "import_from_statement" => {
                if !names.is_empty() && from_import_covers(child, content, module, names) {
                    return Ok(ImportEdit::AlreadySatisfied { import_str });
                }
                insert_after = child.end_byte();
                seen_leading_block = true;
            }
            "expression_statement" if index == 0 => {
                // Module docstring stays on top.
                if node_text(child, content).starts_with(['"', '\'']) {
                    insert_after = child.end_byte();
                    seen_leading_block = true;
                } else {
                    break;
                }
            }
            _ => break,
        }
    }

    let mut out = content.to_string();
    if seen_leading_block {
        let at = content[insert_after..]
            .find('\n')
            .map(|i| insert_after + i)
            .unwrap_or(content.len());
        out.insert_str(at, &format!("\n{}", import_str));
    } else {
        out.insert_str(0, &format!("{}\n", import_str));
    }
    Ok(ImportEdit::Added {
        source: out,
        import_str,
    })
}

fn plain_import_covers(node: Node, content: &str, module: &str) -> bool {
    let mut cursor = node.walk();
    let result = node.named_children(&mut cursor).any(|child| match child.kind() {
        "dotted_name" => node_text(child, content) == module,
        "aliased_import" => child
            .child_by_field_name("name")
            .map(|n| node_text(n, content) == module)
            .unwrap_or(false),
        _ => false,
    });
    result
}

fn from_import_covers(node: Node, content: &str, module: &str, names: &[String]) -> bool {
    let Some(module_node) = node.child_by_field_name("module_name") else {
        return false;
    };
    if node_text(module_node, content) != module {
        return false;
    }
    let module_span = module_node.byte_range();
    let mut imported = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.byte_range() == module_span {
            continue;
        }
        match child.kind() {
            "dotted_name" => imported.push(node_text(child, content)),
            "aliased_import" => {
                if let Some(name) = child.child_by_field_name("name") {
                    imported.push(node_text(name, content));
                }
            }
            _ => {}
        }
    }
    names.iter().all(|n| imported.contains(n))
}

/// Adds a `self.attribute = value` assignment to a class's `__init__`,
/// creating the method (at the top of the class body) when it is missing.
pub fn add_attribute_to_init(
    content: &str,
    class_name: &str,
    attribute_name: &str,
    default_value: &str,
) -> Result<String> {
    let tree = parsed(content)?;
    let class_node = find_class(tree.root_node(), content, class_name)
        .ok_or_else(|| anyhow!("class '{}' not found", class_name))?;

    let assignment = format!("self.{} = {}", attribute_name, default_value);

    if let Some(init) = find_function(class_node, content, "__init__") {
        let layout = body_layout(init, content)?;
        return Ok(splice_block(content, &layout, &assignment, layout.append_at));
    }

    let class_layout = body_layout(class_node, content)?;
    let method = format!("def __init__(self):\n{}{}", INDENT_UNIT, assignment);
    if class_layout.pass_only.is_some() {
        Ok(splice_block(content, &class_layout, &method, class_layout.append_at))
    } else {
        let mut out = content.to_string();
        out.insert_str(
            class_layout.first_line_start,
            &format!("{}\n\n", indent_all(&method, &class_layout.indent)),
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pycode::is_valid;

    #[test]
    fn add_function_appends_and_replaces() {
        let base = "import os\n\n\ndef existing():\n    return 1\n";
        let TopLevelEdit::Added { source, name } =
            add_function_to_file(base, "def fresh():\n    return 2\n").unwrap()
        else {
            panic!("expected add");
        };
        assert_eq!(name, "fresh");
        assert!(source.contains("def existing"));
        assert!(source.contains("def fresh"));
        assert!(is_valid(&source));

        let TopLevelEdit::Replaced { source, .. } =
            add_function_to_file(&source, "def existing():\n    return 99\n").unwrap()
        else {
            panic!("expected replace");
        };
        assert!(source.contains("return 99"));
        assert!(!source.contains("return 1\n"));
        assert!(is_valid(&source));
    }

    #[test]
    fn add_class_rejects_non_class_snippets() {
        assert!(add_class_to_file("", "def not_a_class():\n    pass\n").is_err());
        assert!(add_class_to_file("", "class Broken(:\n    pass\n").is_err());
    }

    #[test]
    fn add_method_to_class_handles_pass_bodies() {
        let base = "class Empty:\n    pass\n";
        let source = add_method_to_class(base, "Empty", "greet", &["self".into()], false).unwrap();
        assert!(source.contains("def greet(self):"));
        assert!(!source.contains("pass\n\n"));
        assert!(is_valid(&source));

        let source = add_method_to_class(&source, "Empty", "fetch", &["self".into()], true).unwrap();
        assert!(source.contains("async def fetch(self):"));
        assert!(is_valid(&source));
    }

    #[test]
    fn replace_method_preserves_indentation() {
        let base = "class Store:\n    def get(self):\n        return None\n";
        let source =
            replace_method_in_class(base, "Store", "get", "def get(self):\n    return 42\n").unwrap();
        assert!(source.contains("        return 42"));
        assert!(is_valid(&source));
        assert!(replace_method_in_class(base, "Store", "missing", "def missing(self):\n    pass\n").is_err());
    }

    #[test]
    fn append_to_function_inserts_before_return() {
        let base = "def total(items):\n    result = sum(items)\n    return result\n";
        let source = append_to_function(base, "total", "result += 1").unwrap();
        let body_pos = source.find("result += 1").unwrap();
        let return_pos = source.find("return result").unwrap();
        assert!(body_pos < return_pos);
        assert!(is_valid(&source));
    }

    #[test]
    fn append_to_function_replaces_pass() {
        let base = "def todo():\n    pass\n";
        let source = append_to_function(base, "todo", "x = 1\nreturn x").unwrap();
        assert!(!source.contains("pass"));
        assert!(source.contains("    x = 1\n    return x"));
        assert!(is_valid(&source));
    }

    #[test]
    fn add_parameter_respects_defaults() {
        let base = "def send(host, port=80):\n    pass\n";
        let source = add_parameter_to_function(base, "send", "timeout", Some("int"), Some("30")).unwrap();
        assert!(source.contains("def send(host, port=80, timeout: int = 30):"));
        assert!(is_valid(&source));

        let source = add_parameter_to_function(base, "send", "path", None, None).unwrap();
        assert!(source.contains("def send(host, path, port=80):"));
        assert!(is_valid(&source));

        assert!(add_parameter_to_function(base, "send", "port", None, None).is_err());
    }

    #[test]
    fn add_decorator_lands_on_top() {
        let base = "@existing\ndef handler():\n    pass\n";
        let source = add_decorator_to_function(base, "handler", "@route('/x')").unwrap();
        assert!(source.starts_with("@route('/x')\n@existing\n"));
        assert!(is_valid(&source));
        assert!(add_decorator_to_function(base, "handler", "route('/x')").is_err());
    }

    #[test]
    fn add_import_is_idempotent() {
        let base = "\"\"\"Docstring.\"\"\"\nimport os\n\nx = 1\n";
        let ImportEdit::Added { source, .. } = add_import(base, "json", &[]).unwrap() else {
            panic!("expected add");
        };
        assert!(is_valid(&source));
        let json_pos = source.find("import json").unwrap();
        assert!(json_pos < source.find("x = 1").unwrap());

        let ImportEdit::AlreadySatisfied { .. } = add_import(&source, "json", &[]).unwrap() else {
            panic!("expected already-satisfied");
        };

        let ImportEdit::Added { source, .. } =
            add_import(&source, "pathlib", &["Path".into()]).unwrap()
        else {
            panic!("expected add");
        };
        let ImportEdit::AlreadySatisfied { .. } =
            add_import(&source, "pathlib", &["Path".into()]).unwrap()
        else {
            panic!("expected already-satisfied");
        };
        assert!(is_valid(&source));
    }

    #[test]
    fn add_attribute_creates_init_when_missing() {
        let base = "class Config:\n    LIMIT = 10\n";
        let source = add_attribute_to_init(base, "Config", "retries", "3").unwrap();
        assert!(source.contains("def __init__(self):"));
        assert!(source.contains("self.retries = 3"));
        assert!(is_valid(&source));

        let source = add_attribute_to_init(&source, "Config", "timeout", "None").unwrap();
        assert!(source.contains("self.timeout = None"));
        assert_eq!(source.matches("def __init__").count(), 1);
        assert!(is_valid(&source));
    }
}
