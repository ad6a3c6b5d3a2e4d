// src/foundry/actions/rag.rs
// Semantic-context actions over the project's vector store.

use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use walkdir::WalkDir;

use super::{ok, parse_args};
use crate::foundry::ToolContext;
use crate::index::vector::ChunkMetadata;
use crate::pycode;
use crate::workspace::project::{relative_display, EXCLUDED_DIRS};

#[derive(Deserialize)]
struct IndexArgs {
    #[serde(default)]
    path: Option<String>,
}

/// Scans a directory (sandboxed to the project by the runner) for Python
/// files and indexes their top-level functions and classes.
pub async fn index_project_context(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: IndexArgs = parse_args("index_project_context", args)?;
    let scan_path = args
        .path
        .map(PathBuf::from)
        .unwrap_or_else(|| ctx.project_root().to_path_buf());

    if !scan_path.is_dir() {
        return ok(format!(
            "Error: The specified path '{}' is not a valid directory.",
            ctx.relative(&scan_path)
        ));
    }

    info!("Starting project indexing from path: {}", scan_path.display());
    let py_files: Vec<PathBuf> = WalkDir::new(&scan_path)
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir()
                && EXCLUDED_DIRS.contains(&e.file_name().to_string_lossy().as_ref()))
        })
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file() && e.path().extension().map(|x| x == "py").unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();

    let mut documents = Vec::new();
    for file in &py_files {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };
        if !pycode::is_valid(&content) {
            continue;
        }
        let relative = relative_display(ctx.project_root(), file);
        if let Ok(defs) = pycode::top_level_defs(&content) {
            for def in defs {
                documents.push((
                    content[def.start_byte..def.end_byte].to_string(),
                    ChunkMetadata {
                        file_path: relative.clone(),
                        node_type: def.kind.as_str().to_string(),
                        node_name: def.name,
                    },
                ));
            }
        }
    }

    if documents.is_empty() {
        return ok("No new functions or classes found to index in the specified path.");
    }

    let count = documents.len();
    ctx.vector.upsert(documents).await?;
    ok(format!(
        "Successfully indexed {} new code chunks (functions/classes) from {} Python files.",
        count,
        py_files.len()
    ))
}
