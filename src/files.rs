//! Session-scoped file areas and the /download path guard.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Per-session scratch directory for uploads/downloads.
pub fn session_dir(session_id: &str) -> PathBuf {
    let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("claudegram").join("sessions").join(session_id)
}

/// Remove a session's scratch directory, if any.
pub fn cleanup_session(session_id: &str) {
    let dir = session_dir(session_id);
    if dir.exists() {
        if let Err(err) = std::fs::remove_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %err, "failed to clean session dir");
        }
    }
}

/// Resolve a user-supplied relative path against the project directory,
/// refusing anything that escapes it.
pub fn resolve_download(project: &Path, relative: &str) -> Result<PathBuf> {
    let candidate = project.join(relative);
    let resolved = candidate
        .canonicalize()
        .with_context(|| format!("no such file: {relative}"))?;
    let project = project
        .canonicalize()
        .with_context(|| format!("project path vanished: {}", project.display()))?;
    if !resolved.starts_with(&project) {
        bail!("path escapes the project directory: {relative}");
    }
    if !resolved.is_file() {
        bail!("not a file: {relative}");
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_inside_project() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "hi").unwrap();

        let path = resolve_download(temp_dir.path(), "notes.txt").unwrap();
        assert!(path.ends_with("notes.txt"));
    }

    #[test]
    fn test_traversal_is_rejected() {
        let outer = TempDir::new().unwrap();
        let project = outer.path().join("project");
        std::fs::create_dir(&project).unwrap();
        std::fs::write(outer.path().join("secret.txt"), "no").unwrap();

        assert!(resolve_download(&project, "../secret.txt").is_err());
    }

    #[test]
    fn test_directory_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("sub")).unwrap();
        assert!(resolve_download(temp_dir.path(), "sub").is_err());
    }
}
