//! Path validation: filesystem sandboxing to the workspace directory.
//!
//! File tools accept paths relative to the workspace (absolute paths are
//! allowed too, as long as they land inside it). Symlinks are resolved for
//! the part of the path that exists, so a link pointing outside the
//! workspace is caught as well.

use std::path::{Component, Path, PathBuf};

/// Error returned when path validation fails.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    #[error("Path escapes workspace: {path}")]
    EscapesWorkspace { path: String },

    #[error("Failed to canonicalize path '{path}': {reason}")]
    CanonicalizeFailed { path: String, reason: String },
}

/// Resolve `path` against `workdir` and make sure the result stays inside it.
///
/// Returns the resolved path on success. The file itself need not exist.
pub fn resolve_in_workspace(workdir: &Path, path: &str) -> Result<PathBuf, PathValidationError> {
    let root = workdir
        .canonicalize()
        .map_err(|e| PathValidationError::CanonicalizeFailed {
            path: workdir.display().to_string(),
            reason: e.to_string(),
        })?;

    let resolved = resolve_existing_prefix(&normalize(&root.join(path)));

    if !resolved.starts_with(&root) {
        tracing::warn!(path, workspace = %root.display(), "Rejected path outside workspace");
        return Err(PathValidationError::EscapesWorkspace { path: path.into() });
    }

    Ok(resolved)
}

/// Lexically collapse `.` and `..` components.
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

/// Canonicalize the longest existing ancestor and re-append the rest.
fn resolve_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut rest: Vec<std::ffi::OsString> = Vec::new();

    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut full = canonical;
            for part in rest.iter().rev() {
                full.push(part);
            }
            return full;
        }
        match (existing.file_name().map(|n| n.to_os_string()), existing.parent()) {
            (Some(name), Some(parent)) => {
                rest.push(name);
                existing = parent.to_path_buf();
            }
            _ => return path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_inside_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_in_workspace(dir.path(), "src/main.rs").unwrap();
        let root = dir.path().canonicalize().unwrap();
        assert_eq!(resolved, root.join("src").join("main.rs"));
    }

    #[test]
    fn parent_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_in_workspace(dir.path(), "../../etc/passwd").unwrap_err();
        assert!(matches!(err, PathValidationError::EscapesWorkspace { .. }));
        assert_eq!(err.to_string(), "Path escapes workspace: ../../etc/passwd");
    }

    #[test]
    fn traversal_that_comes_back_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_in_workspace(dir.path(), "a/../b.txt").is_ok());
    }

    #[test]
    fn absolute_path_outside_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_in_workspace(dir.path(), "/etc/passwd").is_err());
    }

    #[test]
    fn absolute_path_inside_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let inside = dir.path().canonicalize().unwrap().join("notes.md");
        let resolved = resolve_in_workspace(dir.path(), inside.to_str().unwrap()).unwrap();
        assert_eq!(resolved, inside);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_out_of_workspace_is_rejected() {
        let outside = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        assert!(resolve_in_workspace(dir.path(), "link/secret.txt").is_err());
    }
}
