// src/foundry/actions/shell.rs
// Process-backed actions: shell commands, the project test suite, linting.

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{ok, parse_args};
use crate::foundry::ToolContext;
use crate::pycode;

#[derive(Deserialize)]
struct ShellArgs {
    command: String,
}

/// Executes a short-lived command in the project root. Leading `python` /
/// `pip` invocations are rewritten to the project's venv executables when
/// they exist.
pub async fn run_shell_command(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: ShellArgs = parse_args("run_shell_command", args)?;
    let command = args.command.trim();
    if command.is_empty() {
        return ok("Error: Empty command provided.");
    }

    let mut rewritten = command.to_string();
    if let Some(first) = command.split_whitespace().next() {
        let replacement = match first {
            "python" | "python3" => ctx.project.venv_python.as_ref(),
            "pip" | "pip3" => ctx.project.venv_pip.as_ref(),
            _ => None,
        };
        if let Some(executable) = replacement {
            rewritten = format!(
                "{}{}",
                executable.display(),
                &command[first.len()..]
            );
            info!("Intercepted '{}'. Using venv executable: {}", first, executable.display());
        }
    }

    info!("Executing shell command: '{}' in '{}'", rewritten, ctx.project_root().display());
    let output = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(&rewritten)
        .current_dir(ctx.project_root())
        .output()
        .await?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if output.status.success() {
        ok(format!(
            "Command executed successfully.\n--- STDOUT ---\n{}\n--- STDERR ---\n{}",
            stdout, stderr
        ))
    } else {
        ok(format!(
            "Error executing command: '{}'\nReturn Code: {}\n--- STDOUT ---\n{}\n--- STDERR ---\n{}",
            command,
            output.status.code().unwrap_or(-1),
            stdout,
            stderr
        ))
    }
}

/// Runs pytest inside the project's virtual environment. Exit code 0 is a
/// pass, 5 means no tests were collected, anything else is a failure.
pub async fn run_tests(ctx: &ToolContext, _args: Value) -> Result<Value> {
    let Some(python) = &ctx.project.venv_python else {
        return ok(
            "Error: The project's virtual environment is not set up. Cannot find the Python executable to run pytest.",
        );
    };

    info!("Executing test command: '{} -m pytest' in '{}'", python.display(), ctx.project_root().display());
    let output = tokio::process::Command::new(python)
        .arg("-m")
        .arg("pytest")
        .current_dir(ctx.project_root())
        .output()
        .await?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    match output.status.code() {
        Some(0) => ok(format!(
            "All tests passed successfully!\n\n--- PYTEST OUTPUT ---\n{}",
            stdout
        )),
        Some(5) => ok(format!(
            "Pytest ran, but no tests were found to execute.\n\n--- PYTEST OUTPUT ---\n{}",
            stdout
        )),
        _ => ok(format!(
            "Error: One or more tests failed.\n\n--- PYTEST STDOUT ---\n{}\n\n--- PYTEST STDERR ---\n{}",
            stdout, stderr
        )),
    }
}

#[derive(Deserialize)]
struct LintArgs {
    path: String,
}

/// A light correctness lint: parse validity plus a few mechanical checks.
pub async fn lint_file(ctx: &ToolContext, args: Value) -> Result<Value> {
    let args: LintArgs = parse_args("lint_file", args)?;
    let path = std::path::PathBuf::from(&args.path);
    let relative = ctx.relative(&path);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return ok(format!("Error: File not found at '{}'.", relative)),
    };

    let mut findings = Vec::new();
    if let Some(error) = pycode::syntax_error(&content) {
        findings.push(format!("E999 {}", error));
    }
    for (index, line) in content.lines().enumerate() {
        if line.len() > 120 {
            findings.push(format!("E501 line {} is too long ({} chars)", index + 1, line.len()));
        }
        if line.ends_with(' ') || line.ends_with('\t') {
            findings.push(format!("W291 trailing whitespace on line {}", index + 1));
        }
        if line.contains('\t') {
            findings.push(format!("W191 tab indentation on line {}", index + 1));
        }
    }

    if findings.is_empty() {
        ok(format!(
            "Linting complete for '{}': No issues found! Excellent code quality.",
            relative
        ))
    } else {
        ok(format!(
            "Linting found {} issue(s) in '{}':\n{}",
            findings.len(),
            relative,
            findings.join("\n")
        ))
    }
}
