// src/workspace/sandbox.rs
// Resolves user- and LLM-supplied paths against the active project root and
// rejects anything that would land outside it.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
#[error("path '{candidate}' escapes the project workspace")]
pub struct PathEscape {
    pub candidate: String,
}

/// Resolve `candidate` against `project_root`, producing an absolute path that
/// is guaranteed to stay inside the project. Relative paths are joined to the
/// root; absolute paths must already point inside it. `..` components are
/// folded lexically and symlinks in any existing prefix are resolved before
/// the containment check.
pub fn resolve_in_project(project_root: &Path, candidate: &str) -> Result<PathBuf, PathEscape> {
    let escape = || PathEscape {
        candidate: candidate.to_string(),
    };

    let root = project_root
        .canonicalize()
        .unwrap_or_else(|_| normalize(project_root));

    let raw = Path::new(candidate);
    let joined = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        root.join(raw)
    };
    let normalized = normalize(&joined);

    if !normalized.starts_with(&root) {
        return Err(escape());
    }

    // A symlink inside the project could still point elsewhere; resolve the
    // deepest existing ancestor and re-check containment.
    let mut probe = normalized.clone();
    while !probe.exists() {
        match probe.parent() {
            Some(parent) => probe = parent.to_path_buf(),
            None => break,
        }
    }
    if probe.exists() {
        let canonical = probe.canonicalize().map_err(|_| escape())?;
        if !canonical.starts_with(&root) {
            return Err(escape());
        }
    }

    Ok(normalized)
}

/// Lexical normalization: folds `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_root() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn relative_path_resolves_inside_root() {
        let dir = project_root();
        let resolved = resolve_in_project(dir.path(), "src/main.py").unwrap();
        assert!(resolved.starts_with(dir.path().canonicalize().unwrap()));
        assert!(resolved.ends_with("src/main.py"));
    }

    #[test]
    fn parent_traversal_is_rejected() {
        let dir = project_root();
        assert!(resolve_in_project(dir.path(), "../outside.txt").is_err());
        assert!(resolve_in_project(dir.path(), "src/../../outside.txt").is_err());
    }

    #[test]
    fn inner_parent_components_are_folded() {
        let dir = project_root();
        let resolved = resolve_in_project(dir.path(), "src/../main.py").unwrap();
        assert!(resolved.ends_with("main.py"));
        assert!(!resolved.to_string_lossy().contains(".."));
    }

    #[test]
    fn absolute_path_inside_root_is_accepted() {
        let dir = project_root();
        let inside = dir.path().canonicalize().unwrap().join("notes.md");
        let resolved = resolve_in_project(dir.path(), inside.to_str().unwrap()).unwrap();
        assert_eq!(resolved, inside);
    }

    #[test]
    fn absolute_path_outside_root_is_rejected() {
        let dir = project_root();
        assert!(resolve_in_project(dir.path(), "/etc/passwd").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escape_is_rejected() {
        let dir = project_root();
        let outside = tempfile::tempdir().unwrap();
        let link = dir.path().join("sneaky");
        std::os::unix::fs::symlink(outside.path(), &link).unwrap();
        assert!(resolve_in_project(dir.path(), "sneaky/data.txt").is_err());
    }
}
