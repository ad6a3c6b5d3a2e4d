// src/foundry/actions/code_edit.rs
// Structure-editing actions: parse the target file, apply a syntax-tree
// edit, write it back and refresh both indices in the same step.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;

use super::{ok, parse_args};
use crate::foundry::ToolContext;
use crate::pycode::edit::{self, ImportEdit, TopLevelEdit};
use crate::pycode::rename_source;

/// Write an edited source back and refresh the indices. Shared tail of every
/// structure edit.
async fn commit(ctx: &ToolContext, path: &Path, source: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, source)?;
    ctx.refresh_indices(path, source).await
}

fn read_existing(ctx: &ToolContext, path: &Path) -> std::result::Result<String, String> {
    if !path.exists() {
        return Err(format!("Error: File not found at '{}'.", ctx.relative(path)));
    }
    std::fs::read_to_string(path).map_err(|e| format!("Error: could not read '{}': {}", ctx.relative(path), e))
}

#[derive(Deserialize)]
struct AddClassArgs {
    path: String,
    class_code: String,
}

pub async fn add_class_to_file(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: AddClassArgs = parse_args("add_class_to_file", args)?;
    let path = PathBuf::from(&args.path);
    let relative = ctx.relative(&path);

    if !path.exists() {
        let source = format!("{}\n", args.class_code.trim_end());
        if let Some(error) = crate::pycode::syntax_error(&source) {
            return ok(format!("Error: `class_code` is not valid Python: {}", error));
        }
        commit(ctx, &path, &source).await?;
        return ok(format!(
            "Successfully created new file {} with the provided class.",
            relative
        ));
    }

    let content = match read_existing(ctx, &path) {
        Ok(content) => content,
        Err(message) => return ok(message),
    };
    match edit::add_class_to_file(&content, &args.class_code) {
        Ok(TopLevelEdit::Added { source, name }) => {
            commit(ctx, &path, &source).await?;
            ok(format!("Successfully added class '{}' in '{}'.", name, relative))
        }
        Ok(TopLevelEdit::Replaced { source, name }) => {
            commit(ctx, &path, &source).await?;
            ok(format!("Successfully replaced class '{}' in '{}'.", name, relative))
        }
        Err(e) => ok(format!("Error: {}", e)),
    }
}

#[derive(Deserialize)]
struct AddFunctionArgs {
    path: String,
    function_code: String,
}

pub async fn add_function_to_file(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: AddFunctionArgs = parse_args("add_function_to_file", args)?;
    let path = PathBuf::from(&args.path);
    let relative = ctx.relative(&path);

    if !path.exists() {
        let source = format!("{}\n", args.function_code.trim_end());
        if let Some(error) = crate::pycode::syntax_error(&source) {
            return ok(format!("Error: `function_code` is not valid Python: {}", error));
        }
        commit(ctx, &path, &source).await?;
        return ok(format!(
            "Successfully created new file {} with the provided function.",
            relative
        ));
    }

    let content = match read_existing(ctx, &path) {
        Ok(content) => content,
        Err(message) => return ok(message),
    };
    match edit::add_function_to_file(&content, &args.function_code) {
        Ok(TopLevelEdit::Added { source, name }) => {
            commit(ctx, &path, &source).await?;
            ok(format!("Successfully added function '{}' in '{}'.", name, relative))
        }
        Ok(TopLevelEdit::Replaced { source, name }) => {
            commit(ctx, &path, &source).await?;
            ok(format!("Successfully replaced function '{}' in '{}'.", name, relative))
        }
        Err(e) => ok(format!("Error: {}", e)),
    }
}

#[derive(Deserialize)]
struct AddMethodArgs {
    path: String,
    class_name: String,
    name: String,
    args: Vec<String>,
    #[serde(default)]
    is_async: bool,
}

pub async fn add_method_to_class(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: AddMethodArgs = parse_args("add_method_to_class", args)?;
    let path = PathBuf::from(&args.path);
    let content = match read_existing(ctx, &path) {
        Ok(content) => content,
        Err(message) => return ok(message),
    };
    match edit::add_method_to_class(&content, &args.class_name, &args.name, &args.args, args.is_async)
    {
        Ok(source) => {
            commit(ctx, &path, &source).await?;
            ok(format!(
                "Successfully added method '{}' to class '{}' in '{}'.",
                args.name,
                args.class_name,
                ctx.relative(&path)
            ))
        }
        Err(e) => ok(format!("Error: {}", e)),
    }
}

#[derive(Deserialize)]
struct AddParameterArgs {
    path: String,
    function_name: String,
    parameter_name: String,
    #[serde(default)]
    parameter_type: Option<String>,
    #[serde(default)]
    default_value: Option<String>,
}

pub async fn add_parameter_to_function(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: AddParameterArgs = parse_args("add_parameter_to_function", args)?;
    let path = PathBuf::from(&args.path);
    let content = match read_existing(ctx, &path) {
        Ok(content) => content,
        Err(message) => return ok(message),
    };
    match edit::add_parameter_to_function(
        &content,
        &args.function_name,
        &args.parameter_name,
        args.parameter_type.as_deref(),
        args.default_value.as_deref(),
    ) {
        Ok(source) => {
            commit(ctx, &path, &source).await?;
            ok(format!(
                "Successfully added parameter '{}' to function '{}' in '{}'.",
                args.parameter_name,
                args.function_name,
                ctx.relative(&path)
            ))
        }
        Err(e) => ok(format!("Error: {}", e)),
    }
}

#[derive(Deserialize)]
struct AddDecoratorArgs {
    path: String,
    function_name: String,
    decorator_code: String,
}

pub async fn add_decorator_to_function(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: AddDecoratorArgs = parse_args("add_decorator_to_function", args)?;
    let path = PathBuf::from(&args.path);
    let content = match read_existing(ctx, &path) {
        Ok(content) => content,
        Err(message) => return ok(message),
    };
    match edit::add_decorator_to_function(&content, &args.function_name, &args.decorator_code) {
        Ok(source) => {
            commit(ctx, &path, &source).await?;
            ok(format!(
                "Successfully added decorator '{}' to function '{}'.",
                args.decorator_code.trim(),
                args.function_name
            ))
        }
        Err(e) => ok(format!("Error: {}", e)),
    }
}

#[derive(Deserialize)]
struct AppendToFunctionArgs {
    path: String,
    function_name: String,
    code_to_append: String,
}

pub async fn append_to_function(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: AppendToFunctionArgs = parse_args("append_to_function", args)?;
    let path = PathBuf::from(&args.path);
    let content = match read_existing(ctx, &path) {
        Ok(content) => content,
        Err(message) => return ok(message),
    };
    match edit::append_to_function(&content, &args.function_name, &args.code_to_append) {
        Ok(source) => {
            commit(ctx, &path, &source).await?;
            ok(format!(
                "Successfully appended code to function '{}' in '{}'.",
                args.function_name,
                ctx.relative(&path)
            ))
        }
        Err(e) => ok(format!("Error: {}", e)),
    }
}

#[derive(Deserialize)]
struct ReplaceNodeArgs {
    path: String,
    node_name: String,
    new_code: String,
}

pub async fn replace_node_in_file(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: ReplaceNodeArgs = parse_args("replace_node_in_file", args)?;
    let path = PathBuf::from(&args.path);
    let content = match read_existing(ctx, &path) {
        Ok(content) => content,
        Err(message) => return ok(message),
    };
    match edit::replace_node_in_file(&content, &args.node_name, &args.new_code) {
        Ok(source) => {
            commit(ctx, &path, &source).await?;
            ok(format!(
                "Successfully replaced node '{}' in '{}'.",
                args.node_name,
                ctx.relative(&path)
            ))
        }
        Err(e) => ok(format!("Error: {}", e)),
    }
}

#[derive(Deserialize)]
struct ReplaceMethodArgs {
    path: String,
    class_name: String,
    method_name: String,
    new_code: String,
}

pub async fn replace_method_in_class(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: ReplaceMethodArgs = parse_args("replace_method_in_class", args)?;
    let path = PathBuf::from(&args.path);
    let content = match read_existing(ctx, &path) {
        Ok(content) => content,
        Err(message) => return ok(message),
    };
    match edit::replace_method_in_class(&content, &args.class_name, &args.method_name, &args.new_code)
    {
        Ok(source) => {
            commit(ctx, &path, &source).await?;
            ok(format!(
                "Successfully replaced method '{}' in class '{}'.",
                args.method_name, args.class_name
            ))
        }
        Err(e) => ok(format!("Error: {}", e)),
    }
}

#[derive(Deserialize)]
struct RenameInFileArgs {
    path: String,
    old_name: String,
    new_name: String,
}

pub async fn rename_symbol_in_file(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: RenameInFileArgs = parse_args("rename_symbol_in_file", args)?;
    let path = PathBuf::from(&args.path);
    let content = match read_existing(ctx, &path) {
        Ok(content) => content,
        Err(message) => return ok(message),
    };
    match rename_source(&content, &args.old_name, &args.new_name) {
        Ok(source) => {
            commit(ctx, &path, &source).await?;
            ok(format!(
                "Successfully renamed '{}' to '{}' in '{}'.",
                args.old_name,
                args.new_name,
                ctx.relative(&path)
            ))
        }
        Err(e) => ok(format!("Error: {}", e)),
    }
}

#[derive(Deserialize)]
struct AddImportArgs {
    path: String,
    module: String,
    #[serde(default)]
    names: Vec<String>,
}

pub async fn add_import(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: AddImportArgs = parse_args("add_import", args)?;
    let path = PathBuf::from(&args.path);
    let content = match read_existing(ctx, &path) {
        Ok(content) => content,
        Err(message) => return ok(message),
    };
    match edit::add_import(&content, &args.module, &args.names) {
        Ok(ImportEdit::Added { source, import_str }) => {
            commit(ctx, &path, &source).await?;
            ok(format!(
                "Successfully added import '{}' to '{}'.",
                import_str,
                ctx.relative(&path)
            ))
        }
        Ok(ImportEdit::AlreadySatisfied { import_str }) => ok(format!(
            "Import '{}' already satisfied in '{}'.",
            import_str,
            ctx.relative(&path)
        )),
        Err(e) => ok(format!("Error: {}", e)),
    }
}

#[derive(Deserialize)]
struct AddAttributeArgs {
    path: String,
    class_name: String,
    attribute_name: String,
    default_value: String,
}

pub async fn add_attribute_to_init(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: AddAttributeArgs = parse_args("add_attribute_to_init", args)?;
    let path = PathBuf::from(&args.path);
    let content = match read_existing(ctx, &path) {
        Ok(content) => content,
        Err(message) => return ok(message),
    };
    match edit::add_attribute_to_init(
        &content,
        &args.class_name,
        &args.attribute_name,
        &args.default_value,
    ) {
        Ok(source) => {
            commit(ctx, &path, &source).await?;
            ok(format!(
                "Successfully added attribute '{}' to __init__ in class '{}'.",
                args.attribute_name, args.class_name
            ))
        }
        Err(e) => ok(format!("Error: {}", e)),
    }
}
