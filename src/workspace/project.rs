// src/workspace/project.rs
// Owns the per-user workspace tree and project-level file operations.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use walkdir::WalkDir;

use super::sandbox::resolve_in_project;

/// Directories excluded from file trees, listings and index walks.
pub const EXCLUDED_DIRS: &[&str] = &[".git", ".venv", "venv", "__pycache__", ".rag_db", "node_modules"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Dir,
}

/// One node of a project file-tree snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileNode {
    pub name: String,
    pub path: String,
    pub kind: FileKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
}

/// An immutable snapshot of the active project's environment details,
/// handed to tools that shell out or need the venv executables.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub project_root: PathBuf,
    pub venv_python: Option<PathBuf>,
    pub venv_pip: Option<PathBuf>,
}

impl ProjectContext {
    pub fn detect(project_root: &Path) -> Self {
        let candidates = [
            (".venv/bin/python", ".venv/bin/pip"),
            (".venv/Scripts/python.exe", ".venv/Scripts/pip.exe"),
        ];
        let mut venv_python = None;
        let mut venv_pip = None;
        for (python, pip) in candidates {
            let python_path = project_root.join(python);
            if python_path.exists() {
                venv_python = Some(python_path);
                let pip_path = project_root.join(pip);
                if pip_path.exists() {
                    venv_pip = Some(pip_path);
                }
                break;
            }
        }
        Self {
            project_root: project_root.to_path_buf(),
            venv_python,
            venv_pip,
        }
    }
}

/// Manages one user's workspace directory and the projects inside it.
pub struct ProjectManager {
    user_id: i64,
    root: PathBuf,
}

impl ProjectManager {
    pub fn new(workspaces_root: &Path, user_id: i64) -> Result<Self> {
        let root = workspaces_root.join(user_id.to_string());
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create workspace root {}", root.display()))?;
        // Canonical form so every derived project path survives prefix checks.
        let root = root.canonicalize().unwrap_or(root);
        Ok(Self { user_id, root })
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn validated_name(name: &str) -> Result<&str> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            bail!("project name cannot be empty");
        }
        if trimmed.starts_with('.') || trimmed.contains('/') || trimmed.contains('\\') {
            bail!("invalid project name '{}'", name);
        }
        Ok(trimmed)
    }

    pub fn new_project(&self, name: &str) -> Result<PathBuf> {
        let name = Self::validated_name(name)?;
        let path = self.root.join(name);
        if path.exists() {
            bail!("project '{}' already exists", name);
        }
        std::fs::create_dir_all(&path)?;
        info!("Created project '{}' for user {}", name, self.user_id);
        Ok(path)
    }

    pub fn load_project(&self, name: &str) -> Option<PathBuf> {
        let name = Self::validated_name(name).ok()?;
        let path = self.root.join(name);
        path.is_dir().then_some(path)
    }

    pub fn list_projects(&self) -> Result<Vec<String>> {
        let mut projects = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                let name = entry.file_name().to_string_lossy().to_string();
                if !name.starts_with('.') {
                    projects.push(name);
                }
            }
        }
        projects.sort();
        Ok(projects)
    }

    pub fn delete_project(&self, name: &str) -> Result<()> {
        let name = Self::validated_name(name)?;
        let path = self.root.join(name);
        if !path.is_dir() {
            bail!("project '{}' not found", name);
        }
        std::fs::remove_dir_all(&path)
            .with_context(|| format!("failed to delete project '{}'", name))?;
        info!("Deleted project '{}' for user {}", name, self.user_id);
        Ok(())
    }
}

fn is_excluded(name: &str) -> bool {
    EXCLUDED_DIRS.contains(&name)
}

/// Recursive snapshot of the project tree, rooted at the project directory.
pub fn file_tree(project_root: &Path) -> FileNode {
    let name = project_root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    FileNode {
        name,
        path: String::new(),
        kind: FileKind::Dir,
        children: Some(tree_children(project_root, project_root)),
    }
}

fn tree_children(project_root: &Path, dir: &Path) -> Vec<FileNode> {
    let mut nodes = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not read directory {}: {}", dir.display(), e);
            return nodes;
        }
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        let path = entry.path();
        let rel = relative_display(project_root, &path);
        if path.is_dir() {
            if is_excluded(&name) {
                continue;
            }
            nodes.push(FileNode {
                name,
                path: rel,
                kind: FileKind::Dir,
                children: Some(tree_children(project_root, &path)),
            });
        } else {
            nodes.push(FileNode {
                name,
                path: rel,
                kind: FileKind::File,
                children: None,
            });
        }
    }
    nodes.sort_by(|a, b| (a.kind == FileKind::File, &a.name).cmp(&(b.kind == FileKind::File, &b.name)));
    nodes
}

/// All file paths in the project, relative, forward-slashed, sorted.
pub fn list_relative_files(project_root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(project_root)
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && is_excluded(&e.file_name().to_string_lossy())))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| relative_display(project_root, e.path()))
        .collect();
    files.sort();
    files
}

/// Project-relative display form of an absolute path, forward slashes.
pub fn relative_display(project_root: &Path, path: &Path) -> String {
    path.strip_prefix(project_root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Reads a file inside the project. Returns `Ok(None)` when it does not exist.
pub fn read_file(project_root: &Path, relative: &str) -> Result<Option<String>> {
    let path = resolve_in_project(project_root, relative)?;
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Some(content))
}

/// Writes a file inside the project, creating parent directories.
pub fn write_file(project_root: &Path, relative: &str, content: &str) -> Result<PathBuf> {
    let path = resolve_in_project(project_root, relative)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, content)
        .map_err(|e| anyhow!("failed to write {}: {}", path.display(), e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_lifecycle() {
        let workspaces = tempfile::tempdir().unwrap();
        let manager = ProjectManager::new(workspaces.path(), 7).unwrap();

        let path = manager.new_project("demo").unwrap();
        assert!(path.is_dir());
        assert!(manager.new_project("demo").is_err());
        assert_eq!(manager.list_projects().unwrap(), vec!["demo".to_string()]);
        assert!(manager.load_project("demo").is_some());
        assert!(manager.load_project("missing").is_none());

        manager.delete_project("demo").unwrap();
        assert!(manager.delete_project("demo").is_err());
        assert!(manager.list_projects().unwrap().is_empty());
    }

    #[test]
    fn rejects_hostile_project_names() {
        let workspaces = tempfile::tempdir().unwrap();
        let manager = ProjectManager::new(workspaces.path(), 7).unwrap();
        assert!(manager.new_project("").is_err());
        assert!(manager.new_project("../evil").is_err());
        assert!(manager.new_project(".hidden").is_err());
    }

    #[test]
    fn file_tree_excludes_internal_dirs() {
        let workspaces = tempfile::tempdir().unwrap();
        let manager = ProjectManager::new(workspaces.path(), 7).unwrap();
        let root = manager.new_project("demo").unwrap();

        write_file(&root, "src/main.py", "print('hi')\n").unwrap();
        write_file(&root, ".rag_db/store.json", "{}").unwrap();
        write_file(&root, "__pycache__/junk.pyc", "").unwrap();

        let tree = file_tree(&root);
        let children = tree.children.unwrap();
        let names: Vec<&str> = children.iter().map(|n| n.name.as_str()).collect();
        assert!(names.contains(&"src"));
        assert!(!names.contains(&".rag_db"));
        assert!(!names.contains(&"__pycache__"));

        let files = list_relative_files(&root);
        assert_eq!(files, vec!["src/main.py".to_string()]);
    }

    #[test]
    fn read_write_round_trip() {
        let workspaces = tempfile::tempdir().unwrap();
        let manager = ProjectManager::new(workspaces.path(), 7).unwrap();
        let root = manager.new_project("demo").unwrap();

        assert!(read_file(&root, "missing.py").unwrap().is_none());
        write_file(&root, "pkg/app.py", "x = 1\n").unwrap();
        assert_eq!(read_file(&root, "pkg/app.py").unwrap().unwrap(), "x = 1\n");
        assert!(write_file(&root, "../escape.py", "nope").is_err());
    }
}
