use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively collect regular files under `root` whose extension (case-insensitive)
/// is one of `extensions`. Sorted so runs are reproducible. A missing root yields
/// an empty list.
pub fn discover_inputs(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if !root.exists() {
        tracing::warn!(root = %root.display(), "input root does not exist");
        return files;
    }
    for entry in WalkDir::new(root).follow_links(true) {
        let ent = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !ent.file_type().is_file() {
            continue;
        }
        if has_extension(ent.path(), extensions) {
            files.push(ent.into_path());
        }
    }
    files.sort();
    files
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|want| want.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}
