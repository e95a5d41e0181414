//! Path resolution for workspace-relative tool arguments

use std::path::{Path, PathBuf};

use super::ToolError;

/// Resolve a path argument without any containment check.
///
/// `~/` expands to the home directory, relative paths join the workspace.
pub fn resolve_path(path: &str, workspace_root: &Path) -> PathBuf {
    if path.starts_with('/') || path.starts_with('~') {
        expand_tilde(path)
    } else {
        workspace_root.join(path)
    }
}

/// Resolve a path argument and require it to stay inside the workspace.
///
/// Existing paths are canonicalized so symlinks and `..` cannot escape. For
/// paths that do not exist yet the parent is canonicalized instead.
pub async fn validate_workspace_path(
    path: &str,
    workspace_root: &Path,
) -> Result<PathBuf, ToolError> {
    let expanded = resolve_path(path, workspace_root);

    let absolute = if expanded.exists() {
        match tokio::fs::canonicalize(&expanded).await {
            Ok(p) => p,
            // Broken symlink
            Err(_) => std::env::current_dir()?.join(&expanded),
        }
    } else {
        let parent = expanded.parent().filter(|p| !p.as_os_str().is_empty());
        match parent {
            Some(parent) => {
                let canonical_parent = if parent.exists() {
                    match tokio::fs::canonicalize(parent).await {
                        Ok(p) => p,
                        Err(_) => std::env::current_dir()?.join(parent),
                    }
                } else {
                    std::env::current_dir()?.join(parent)
                };
                match expanded.file_name() {
                    Some(file_name) => canonical_parent.join(file_name),
                    None => canonical_parent,
                }
            }
            None => std::env::current_dir()?.join(&expanded),
        }
    };

    let canonical_workspace = if workspace_root.exists() {
        tokio::fs::canonicalize(workspace_root)
            .await
            .unwrap_or_else(|_| workspace_root.to_path_buf())
    } else {
        workspace_root.to_path_buf()
    };

    if !is_path_within_workspace(&absolute, &canonical_workspace) {
        return Err(ToolError::OutsideWorkspace {
            path: path.to_string(),
            workspace: canonical_workspace.display().to_string(),
        });
    }

    Ok(absolute)
}

fn is_path_within_workspace(path: &Path, workspace: &Path) -> bool {
    let path_components: Vec<_> = path.components().collect();
    let workspace_components: Vec<_> = workspace.components().collect();

    if path_components.len() < workspace_components.len() {
        return false;
    }

    workspace_components
        .iter()
        .enumerate()
        .all(|(i, comp)| path_components.get(i) == Some(comp))
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
