//! Git metadata for the /git command.

use std::path::Path;

use anyhow::{Context, Result};
use git2::{Repository, StatusOptions};

/// Branch, dirty-file count, and last commit of the repository containing
/// `path`. Plain text; the caller escapes for the messenger.
pub fn summarize(path: &Path) -> Result<String> {
    let repo = Repository::discover(path)
        .with_context(|| format!("{} is not inside a git repository", path.display()))?;

    let head = repo.head().context("repository has no HEAD")?;
    let branch = head.shorthand().unwrap_or("(detached)").to_string();

    let mut options = StatusOptions::new();
    options.include_untracked(true);
    let dirty = repo
        .statuses(Some(&mut options))
        .map(|statuses| statuses.len())
        .unwrap_or(0);

    let last_commit = head
        .peel_to_commit()
        .ok()
        .map(|commit| {
            let short = commit.id().to_string().chars().take(8).collect::<String>();
            let summary = commit.summary().unwrap_or("").to_string();
            format!("{short} {summary}")
        })
        .unwrap_or_else(|| "(no commits)".to_string());

    Ok(format!(
        "branch: {branch}\ndirty files: {dirty}\nlast commit: {last_commit}"
    ))
}
