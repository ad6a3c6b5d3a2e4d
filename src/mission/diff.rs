// src/mission/diff.rs
// Before/after snapshots of files touched during a mission, rendered as a
// unified diff for the polish pass.

use std::collections::BTreeMap;
use std::path::Path;

use similar::TextDiff;

use crate::workspace::project::read_file;

/// Records the original content of every file a mission mutates. Only the
/// first snapshot per path is kept; `None` means the file did not exist yet.
#[derive(Default)]
pub struct DiffTracker {
    originals: BTreeMap<String, Option<String>>,
}

impl DiffTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot a file before a mutating tool runs.
    pub fn record_before(&mut self, relative_path: &str, original: Option<String>) {
        self.originals
            .entry(relative_path.to_string())
            .or_insert(original);
    }

    pub fn touched_paths(&self) -> Vec<String> {
        self.originals.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// The cumulative unified diff of every touched file against its current
    /// on-disk content. Unchanged files are omitted.
    pub fn unified_diff(&self, project_root: &Path) -> String {
        let mut sections = Vec::new();
        for (relative, original) in &self.originals {
            let before = original.clone().unwrap_or_default();
            let after = read_file(project_root, relative)
                .ok()
                .flatten()
                .unwrap_or_default();
            if before == after {
                continue;
            }
            let diff = TextDiff::from_lines(&before, &after);
            let rendered = diff
                .unified_diff()
                .header(&format!("a/{}", relative), &format!("b/{}", relative))
                .to_string();
            sections.push(rendered);
        }
        sections.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::project::write_file;

    #[test]
    fn diff_reports_changed_files_only() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "stable.py", "x = 1\n").unwrap();
        write_file(dir.path(), "changed.py", "def foo():\n    pass\n").unwrap();

        let mut tracker = DiffTracker::new();
        tracker.record_before("stable.py", Some("x = 1\n".into()));
        tracker.record_before("changed.py", Some("def foo():\n    pass\n".into()));
        tracker.record_before("created.py", None);

        write_file(dir.path(), "changed.py", "def foo():\n    return 2\n").unwrap();
        write_file(dir.path(), "created.py", "print('new')\n").unwrap();

        let diff = tracker.unified_diff(dir.path());
        assert!(diff.contains("b/changed.py"));
        assert!(diff.contains("+    return 2"));
        assert!(diff.contains("b/created.py"));
        assert!(!diff.contains("stable.py"));
    }

    #[test]
    fn first_snapshot_wins() {
        let mut tracker = DiffTracker::new();
        tracker.record_before("a.py", Some("original\n".into()));
        tracker.record_before("a.py", Some("later overwrite\n".into()));
        assert_eq!(tracker.touched_paths(), vec!["a.py".to_string()]);

        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.py", "current\n").unwrap();
        let diff = tracker.unified_diff(dir.path());
        assert!(diff.contains("-original"));
    }
}
