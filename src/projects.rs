//! Project discovery: subdirectories of the configured root.

use std::path::{Path, PathBuf};

use anyhow::Result;

/// A directory the agent can be started in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub path: PathBuf,
}

/// Enumerate candidate project directories up to `depth` levels below the
/// root. Hidden directories are skipped; names are the path relative to
/// the root, sorted.
pub fn scan(root: &Path, depth: usize) -> Result<Vec<Project>> {
    let mut projects = Vec::new();
    walk(root, root, depth, &mut projects)?;
    projects.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(projects)
}

/// Look up one project by its listed name.
pub fn find(root: &Path, depth: usize, name: &str) -> Result<Option<Project>> {
    Ok(scan(root, depth)?
        .into_iter()
        .find(|project| project.name == name))
}

fn walk(root: &Path, dir: &Path, depth: usize, out: &mut Vec<Project>) -> Result<()> {
    if depth == 0 {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if file_name.starts_with('.') {
            continue;
        }
        let name = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();
        out.push(Project {
            name,
            path: path.clone(),
        });
        walk(root, &path, depth - 1, out)?;
    }
    Ok(())
}
