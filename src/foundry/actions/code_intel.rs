// src/foundry/actions/code_intel.rs
// Actions over the symbol index: lookups, reverse references and the
// project-wide rename.

use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{ok, parse_args};
use crate::foundry::ToolContext;
use crate::pycode::{self, rename_source};
use crate::workspace::sandbox::resolve_in_project;

#[derive(Deserialize)]
struct SymbolArgs {
    symbol_name: String,
}

pub async fn find_definition(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: SymbolArgs = parse_args("find_definition", args)?;
    let definitions = ctx.symbols.read().find_definition(&args.symbol_name);
    if definitions.is_empty() {
        return ok(format!(
            "Symbol '{}' not found in the project index.",
            args.symbol_name
        ));
    }

    let mut lines = vec![format!(
        "Found {} definition(s) for '{}':",
        definitions.len(),
        args.symbol_name
    )];
    for symbol in definitions {
        let mut line = format!(
            "- Type: {}, File: {}, Line: {}",
            symbol.kind.as_str(),
            symbol.file_path,
            symbol.line
        );
        if let Some(parent) = &symbol.parent_class {
            line.push_str(&format!(" (in class {})", parent));
        }
        lines.push(line);
    }
    ok(lines.join("\n"))
}

pub async fn find_references(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: SymbolArgs = parse_args("find_references", args)?;
    let references = ctx.symbols.read().find_references(&args.symbol_name);
    if references.is_empty() {
        return ok(format!(
            "No references to '{}' were found in the project index.",
            args.symbol_name
        ));
    }

    let mut lines = vec![format!(
        "Found {} reference(s) to '{}':",
        references.len(),
        args.symbol_name
    )];
    for symbol in references {
        lines.push(format!(
            "- In {} '{}' at File: {}, Line: {}",
            symbol.kind.as_str(),
            symbol.name,
            symbol.file_path,
            symbol.line
        ));
    }
    ok(lines.join("\n"))
}

pub async fn get_dependencies(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: SymbolArgs = parse_args("get_dependencies", args)?;
    let definitions = ctx.symbols.read().find_definition(&args.symbol_name);
    let Some(symbol) = definitions.first() else {
        return ok(format!(
            "Symbol '{}' not found in the project index.",
            args.symbol_name
        ));
    };
    if symbol.calls.is_empty() {
        return ok(format!(
            "Symbol '{}' does not appear to call any other indexed functions or methods.",
            args.symbol_name
        ));
    }

    let mut calls: Vec<&String> = symbol.calls.iter().collect();
    calls.sort();
    let mut lines = vec![format!(
        "Symbol '{}' in '{}' calls the following symbols:",
        args.symbol_name, symbol.file_path
    )];
    for call in calls {
        lines.push(format!("- {}", call));
    }
    ok(lines.join("\n"))
}

#[derive(Deserialize)]
struct RenameArgs {
    old_name: String,
    new_name: String,
}

/// Project-wide rename: the symbol index determines every file containing a
/// definition or reference, then each is rewritten with the syntax-tree
/// rename transform.
pub async fn rename_symbol(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: RenameArgs = parse_args("rename_symbol", args)?;

    let files = {
        let symbols = ctx.symbols.read();
        if symbols.find_definition(&args.old_name).is_empty() {
            return ok(format!(
                "Error: Cannot rename. Symbol '{}' not found in the project index.",
                args.old_name
            ));
        }
        symbols.files_touching(&args.old_name)
    };

    for relative in &files {
        let path = match resolve_in_project(ctx.project_root(), relative) {
            Ok(path) => path,
            Err(e) => return ok(format!("Error: {}", e)),
        };
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => return ok(format!("Failed to rename in file {}: {}", relative, e)),
        };
        let renamed = match rename_source(&content, &args.old_name, &args.new_name) {
            Ok(renamed) => renamed,
            Err(e) => return ok(format!("Failed to rename in file {}: {}", relative, e)),
        };
        ctx.snapshot_for_diff(&path);
        std::fs::write(&path, &renamed)?;
        ctx.refresh_indices(&path, &renamed).await?;
        info!("Successfully applied rename in {}", relative);
    }

    ok(format!(
        "Successfully renamed '{}' to '{}' across {} files.",
        args.old_name,
        args.new_name,
        files.len()
    ))
}

#[derive(Deserialize)]
struct PathArgs {
    path: String,
}

pub async fn list_functions_in_file(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: PathArgs = parse_args("list_functions_in_file", args)?;
    let path = PathBuf::from(&args.path);
    let relative = ctx.relative(&path);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return ok(format!("Error: File not found at '{}'.", relative)),
    };

    if let Some(error) = pycode::syntax_error(&content) {
        return ok(format!(
            "Error: The file at '{}' contains a syntax error and could not be parsed: {}",
            relative, error
        ));
    }
    let functions: Vec<String> = pycode::top_level_defs(&content)?
        .into_iter()
        .filter(|def| def.kind == pycode::DefKind::Function)
        .map(|def| def.name)
        .collect();
    if functions.is_empty() {
        return ok(format!("No top-level functions found in '{}'.", relative));
    }

    let mut sorted = functions;
    sorted.sort();
    let listing: Vec<String> = sorted.iter().map(|name| format!("- {}", name)).collect();
    ok(format!("Functions in '{}':\n{}", relative, listing.join("\n")))
}

#[derive(Deserialize)]
struct GetCodeArgs {
    path: String,
    function_name: String,
}

pub async fn get_code_for(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: GetCodeArgs = parse_args("get_code_for", args)?;
    let path = PathBuf::from(&args.path);
    let relative = ctx.relative(&path);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return ok(format!("Error: File not found at '{}'.", relative)),
    };

    if let Some(error) = pycode::syntax_error(&content) {
        return ok(format!(
            "Error: The file at '{}' contains a syntax error and could not be parsed: {}",
            relative, error
        ));
    }
    let defs = pycode::top_level_defs(&content)?;
    let Some(def) = defs.iter().find(|def| def.name == args.function_name) else {
        return ok(format!(
            "Error: Node '{}' not found as a top-level function or class in '{}'.",
            args.function_name, relative
        ));
    };

    ok(format!(
        "Source code for '{}' from '{}':\n```python\n{}\n```",
        args.function_name,
        relative,
        &content[def.start_byte..def.end_byte]
    ))
}
