//! Keeps vault artefacts out of git by patching the project `.gitignore`.

use std::fs;
use std::path::Path;

use crate::cli::output;

/// Ensure every entry in `entries` has a line in `<project_dir>/.gitignore`.
///
/// Missing entries are appended in one write; the file is created when
/// absent. Returns the entries that were added; a failed write is
/// reported as a warning and adds nothing.
pub fn ignore_entries(project_dir: &Path, entries: &[&str]) -> Vec<String> {
    let path = project_dir.join(".gitignore");
    let mut content = fs::read_to_string(&path).unwrap_or_default();

    let mut missing: Vec<String> = Vec::new();
    for entry in entries.iter().map(|e| e.trim()) {
        let listed = content.lines().any(|line| line.trim() == entry);
        if !entry.is_empty() && !listed && !missing.iter().any(|m| m == entry) {
            missing.push(entry.to_string());
        }
    }

    if missing.is_empty() {
        return missing;
    }

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    for entry in &missing {
        content.push_str(entry);
        content.push('\n');
    }

    match fs::write(&path, content) {
        Ok(()) => {
            output::info(&format!("Added {} to .gitignore", missing.join(", ")));
            missing
        }
        Err(e) => {
            output::warning(&format!("Could not update .gitignore: {e}"));
            Vec::new()
        }
    }
}
