// src/foundry/actions/file_ops.rs
// Direct file-system actions. All path arguments arrive absolute and
// sandbox-checked from the tool runner.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{ok, parse_args};
use crate::foundry::ToolContext;

fn is_python(path: &Path) -> bool {
    path.extension().map(|e| e == "py").unwrap_or(false)
}

#[derive(Deserialize)]
struct WriteFileArgs {
    path: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    task_description: Option<String>,
}

/// Writes content to a file. When `task_description` is supplied instead of
/// `content`, the coder model generates the file body first, streaming it to
/// the user and validating the syntax before anything touches disk.
pub async fn write_file(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: WriteFileArgs = parse_args("write_file", args)?;
    let path = PathBuf::from(&args.path);
    let relative = ctx.relative(&path);

    let final_content = match (args.content, args.task_description) {
        (Some(content), _) if !content.is_empty() => content,
        (_, Some(task_description)) => {
            let Some(task_id) = ctx.current_task_id else {
                return ok("Error: write_file needs an active task context for code generation.");
            };
            info!("Generating code for '{}' based on task description.", relative);
            match ctx
                .team
                .generate_code_for_task(&relative, &task_description, &ctx.user_goal, task_id)
                .await
            {
                Ok(code) => code,
                Err(e) => return ok(format!("Error: {}", e)),
            }
        }
        (Some(content), None) => content, // explicitly-empty content is allowed
        (None, None) => {
            return ok("Error: No content was provided or generated to write to the file.")
        }
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, &final_content)?;

    if is_python(&path) {
        ctx.refresh_indices(&path, &final_content).await?;
    }

    ok(format!(
        "Successfully wrote {} bytes to {}",
        final_content.len(),
        relative
    ))
}

#[derive(Deserialize)]
struct AppendFileArgs {
    path: String,
    content: String,
}

pub async fn append_to_file(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: AppendFileArgs = parse_args("append_to_file", args)?;
    let path = PathBuf::from(&args.path);
    let relative = ctx.relative(&path);
    if !path.is_file() {
        return ok(format!("Error: File not found at path '{}'. Cannot append.", relative));
    }

    let mut existing = std::fs::read_to_string(&path)?;
    if !existing.is_empty() && !existing.ends_with('\n') {
        existing.push('\n');
    }
    existing.push_str(&args.content);
    std::fs::write(&path, &existing)?;

    if is_python(&path) {
        ctx.refresh_indices(&path, &existing).await?;
    }

    ok(format!(
        "Successfully appended {} bytes to {}",
        args.content.len(),
        relative
    ))
}

#[derive(Deserialize)]
struct PathArgs {
    path: String,
}

pub async fn read_file(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: PathArgs = parse_args("read_file", args)?;
    let path = PathBuf::from(&args.path);
    let relative = ctx.relative(&path);
    if !path.exists() {
        return ok(format!("Error: File not found at path '{}'", relative));
    }
    if !path.is_file() {
        return ok(format!("Error: Path '{}' is a directory, not a file.", relative));
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(Value::String(content))
}

#[derive(Deserialize)]
struct ListFilesArgs {
    #[serde(default)]
    path: Option<String>,
}

pub async fn list_files(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: ListFilesArgs = parse_args("list_files", args)?;
    let path = args
        .path
        .map(PathBuf::from)
        .unwrap_or_else(|| ctx.project_root().to_path_buf());
    let display = if path == ctx.project_root() {
        ".".to_string()
    } else {
        ctx.relative(&path)
    };

    if !path.exists() {
        return ok(format!("Error: Directory not found at path '{}'", display));
    }
    if !path.is_dir() {
        return ok(format!("Error: Path '{}' is a file, not a directory.", display));
    }

    let mut entries: Vec<String> = std::fs::read_dir(&path)?
        .flatten()
        .map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.path().is_dir() {
                format!("{}/", name)
            } else {
                name
            }
        })
        .collect();
    entries.sort();

    if entries.is_empty() {
        return ok(format!("Directory '{}' is empty.", display));
    }
    ok(format!("Contents of '{}':\n{}", display, entries.join("\n")))
}

pub async fn create_directory(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: PathArgs = parse_args("create_directory", args)?;
    let path = PathBuf::from(&args.path);
    let relative = ctx.relative(&path);
    if path.exists() {
        return ok(format!("Error: Directory already exists at {}", relative));
    }
    std::fs::create_dir_all(&path)?;
    ok(format!("Successfully created directory at {}", relative))
}

pub async fn create_package_init(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: PathArgs = parse_args("create_package_init", args)?;
    let dir = PathBuf::from(&args.path);
    let relative = ctx.relative(&dir);
    std::fs::create_dir_all(&dir)?;

    let init_path = dir.join("__init__.py");
    if init_path.exists() {
        return ok(format!("Package already initialized at '{}'.", relative));
    }

    let package_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let content = format!("\"\"\"Initializes the '{}' package.\"\"\"\n", package_name);
    std::fs::write(&init_path, &content)?;
    ok(format!(
        "Successfully initialized package '{}' at '{}'.",
        package_name, relative
    ))
}

pub async fn delete_directory(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: PathArgs = parse_args("delete_directory", args)?;
    let path = PathBuf::from(&args.path);
    let relative = ctx.relative(&path);
    if !path.exists() {
        return ok(format!("Error: Cannot delete. Directory not found at '{}'.", relative));
    }
    if !path.is_dir() {
        return ok(format!(
            "Error: Path '{}' is a file, not a directory. Use 'delete_file' instead.",
            relative
        ));
    }
    std::fs::remove_dir_all(&path)?;
    ok(format!("Successfully deleted directory: {}", relative))
}

pub async fn delete_file(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: PathArgs = parse_args("delete_file", args)?;
    let path = PathBuf::from(&args.path);
    let relative = ctx.relative(&path);
    if !path.exists() {
        return ok(format!("Error: Cannot delete. File not found at '{}'.", relative));
    }
    if !path.is_file() {
        return ok(format!(
            "Error: Path '{}' is a directory, not a file. This tool only deletes files.",
            relative
        ));
    }
    std::fs::remove_file(&path)?;
    ok(format!("Successfully deleted file: {}", relative))
}

#[derive(Deserialize)]
struct CopyMoveArgs {
    source_path: String,
    destination_path: String,
}

pub async fn copy_file(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: CopyMoveArgs = parse_args("copy_file", args)?;
    let source = PathBuf::from(&args.source_path);
    let destination = PathBuf::from(&args.destination_path);

    if !source.exists() {
        return ok(format!(
            "Error: Source file not found at '{}'.",
            ctx.relative(&source)
        ));
    }
    if !source.is_file() {
        return ok(format!(
            "Error: Source path '{}' is a directory, not a file. This tool only copies files.",
            ctx.relative(&source)
        ));
    }
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(&source, &destination)?;
    ok(format!(
        "Successfully copied file from '{}' to '{}'.",
        ctx.relative(&source),
        ctx.relative(&destination)
    ))
}

pub async fn move_file(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: CopyMoveArgs = parse_args("move_file", args)?;
    let source = PathBuf::from(&args.source_path);
    let destination = PathBuf::from(&args.destination_path);

    if !source.exists() {
        return ok(format!(
            "Error: Source file not found at '{}'.",
            ctx.relative(&source)
        ));
    }
    if !source.is_file() {
        return ok(format!(
            "Error: Source path '{}' is a directory, not a file. This tool only moves files.",
            ctx.relative(&source)
        ));
    }
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::rename(&source, &destination)?;
    ok(format!(
        "Successfully moved file from '{}' to '{}'.",
        ctx.relative(&source),
        ctx.relative(&destination)
    ))
}
