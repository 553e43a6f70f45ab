//! Filesystem scanning: collect the Python files a run operates on.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::error::{EngineError, Result};

/// Resolve the input path to a list of Python files.
///
/// A file path is returned as-is (one-element list); a directory is walked
/// recursively for `*.py`, skipping vendor/VCS folders. Results are sorted
/// for deterministic batch order.
///
/// # Errors
/// [`EngineError::Io`] when `root` does not exist.
pub fn collect_python_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(EngineError::Io {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "input path not found"),
        });
    }
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(keep_entry);

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("py") {
            debug!("scan: found {}", path.display());
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    info!("scan: {} python file(s) under {}", files.len(), root.display());
    Ok(files)
}

/// Coarse directory filter to avoid descending into heavy/vendor folders.
fn keep_entry(entry: &DirEntry) -> bool {
    if entry.file_type().is_dir() {
        if let Some(name) = entry.file_name().to_str() {
            return !matches!(
                name,
                ".git" | "__pycache__" | ".venv" | "venv" | "node_modules" | ".idea" | ".vscode"
            );
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_is_io_error() {
        let err = collect_python_files(Path::new("/definitely/not/here.py")).unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
    }
}
