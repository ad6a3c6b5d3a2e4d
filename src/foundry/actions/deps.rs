// src/foundry/actions/deps.rs
// Dependency management: idempotent requirements edits and venv installs.

use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{ok, parse_args};
use crate::foundry::ToolContext;

/// The bare package name of a requirement specifier: everything before a
/// version constraint, lowercased.
fn package_name(specifier: &str) -> String {
    specifier
        .split(['=', '>', '<', '~', '!', '['])
        .next()
        .unwrap_or(specifier)
        .trim()
        .to_lowercase()
}

#[derive(Deserialize)]
struct AddDependencyArgs {
    #[serde(default)]
    path: Option<String>,
    dependencies: Vec<String>,
}

pub async fn add_dependency_to_requirements(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: AddDependencyArgs = parse_args("add_dependency_to_requirements", args)?;
    if args.dependencies.is_empty() {
        return ok("Error: No dependencies provided.");
    }

    let path = args
        .path
        .map(PathBuf::from)
        .unwrap_or_else(|| ctx.project_root().join("requirements.txt"));
    let relative = ctx.relative(&path);
    info!(
        "Adding dependencies '{}' to '{}'",
        args.dependencies.join(", "),
        relative
    );

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut content = if path.exists() {
        std::fs::read_to_string(&path)?
    } else {
        String::new()
    };

    let mut existing: std::collections::HashSet<String> = content
        .lines()
        .map(package_name)
        .filter(|name| !name.is_empty())
        .collect();

    let mut added = Vec::new();
    let mut skipped = Vec::new();
    for dependency in &args.dependencies {
        let name = package_name(dependency);
        if existing.contains(&name) {
            skipped.push(dependency.clone());
            continue;
        }
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(dependency);
        content.push('\n');
        existing.insert(name);
        added.push(dependency.clone());
    }
    std::fs::write(&path, &content)?;

    let mut parts = Vec::new();
    if !added.is_empty() {
        parts.push(format!("Successfully added: {}.", added.join(", ")));
    }
    if !skipped.is_empty() {
        parts.push(format!("Already existed: {}.", skipped.join(", ")));
    }
    if parts.is_empty() {
        return ok("No changes made to requirements.txt.");
    }
    ok(parts.join(" "))
}

#[derive(Deserialize)]
struct PipInstallArgs {
    #[serde(default)]
    requirements_path: Option<String>,
}

pub async fn pip_install(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: PipInstallArgs = parse_args("pip_install", args)?;
    let requirements = args
        .requirements_path
        .map(PathBuf::from)
        .unwrap_or_else(|| ctx.project_root().join("requirements.txt"));

    if !requirements.exists() {
        return ok(format!(
            "Error: requirements file not found at '{}'. Please create it first.",
            ctx.relative(&requirements)
        ));
    }

    let mut command = if let Some(pip) = &ctx.project.venv_pip {
        tokio::process::Command::new(pip)
    } else if let Some(python) = &ctx.project.venv_python {
        let mut command = tokio::process::Command::new(python);
        command.arg("-m").arg("pip");
        command
    } else {
        return ok(
            "Error: No virtual environment Python or pip executable found. Cannot install dependencies.",
        );
    };

    let output = command
        .arg("install")
        .arg("-r")
        .arg(&requirements)
        .current_dir(ctx.project_root())
        .output()
        .await?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if output.status.success() {
        ok(format!(
            "Successfully installed dependencies from {}.\n---STDOUT---\n{}",
            ctx.relative(&requirements),
            stdout
        ))
    } else {
        ok(format!(
            "Error installing dependencies.\nReturn Code: {}\n---STDERR---\n{}",
            output.status.code().unwrap_or(-1),
            stderr
        ))
    }
}
