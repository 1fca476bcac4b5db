//! Workspace path validation
//!
//! Every filesystem tool resolves caller-supplied paths through
//! [`validate_path`] before touching disk. The check is lexical first, so it
//! does not depend on the target existing, and then confirms on the real
//! filesystem that nothing already on disk (such as a symlink stored inside
//! the workspace) leads outside of it.

use std::path::{Component, Path, PathBuf};

use crate::error::{GolemError, Result};

/// Lexically normalizes a path: drops `.` segments, folds `..` into its
/// parent, and never walks above the root of an absolute path.
///
/// Symlinks are not consulted.
///
/// # Example
/// ```
/// use golem::security::clean_path;
/// use std::path::PathBuf;
///
/// assert_eq!(clean_path("/a/./b/../c"), PathBuf::from("/a/c"));
/// assert_eq!(clean_path("/../etc"), PathBuf::from("/etc"));
/// assert_eq!(clean_path("../x/.."), PathBuf::from(".."));
/// ```
pub fn clean_path(path: impl AsRef<Path>) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

fn absolute_clean(path: &str) -> Result<PathBuf> {
    let path = Path::new(path);
    if path.is_absolute() {
        Ok(clean_path(path))
    } else {
        Ok(clean_path(std::env::current_dir()?.join(path)))
    }
}

fn access_denied(target: &str, workspace: &Path) -> GolemError {
    GolemError::SecurityViolation(format!(
        "access denied: '{}' is outside workspace '{}'",
        target,
        workspace.display()
    ))
}

/// Resolves `target` against `workspace` and rejects anything that escapes it.
///
/// - An empty `workspace` disables the sandbox and returns `target` as-is.
/// - Absolute targets are cleaned as given; relative targets are joined under
///   the workspace root.
/// - The cleaned target must lie at or below the cleaned workspace root.
/// - If the target (or its nearest existing ancestor) exists, its canonical
///   form must also lie below the canonical workspace root.
///
/// # Errors
/// Returns `GolemError::SecurityViolation` whose message starts with
/// `access denied`.
///
/// # Example
/// ```
/// use golem::security::validate_path;
///
/// let inside = validate_path("/srv/ws", "notes/todo.md").unwrap();
/// assert_eq!(inside, std::path::PathBuf::from("/srv/ws/notes/todo.md"));
///
/// assert!(validate_path("/srv/ws", "../etc/passwd").is_err());
/// assert!(validate_path("/srv/ws", "/etc/passwd").is_err());
/// ```
pub fn validate_path(workspace: &str, target: &str) -> Result<PathBuf> {
    if workspace.trim().is_empty() {
        return Ok(PathBuf::from(target));
    }

    let root = absolute_clean(workspace)?;
    let candidate = if Path::new(target).is_absolute() {
        clean_path(target)
    } else {
        clean_path(root.join(target))
    };

    if candidate.strip_prefix(&root).is_err() {
        return Err(access_denied(target, &root));
    }

    check_real_path(&root, &candidate, target)?;
    Ok(candidate)
}

/// Follows whatever already exists on disk and confirms it stays inside.
fn check_real_path(root: &Path, candidate: &Path, target: &str) -> Result<()> {
    let Ok(real_root) = root.canonicalize() else {
        // Nothing on disk yet, so nothing can point outside.
        return Ok(());
    };

    for ancestor in candidate.ancestors() {
        match ancestor.canonicalize() {
            Ok(real) => {
                if real.starts_with(&real_root) {
                    return Ok(());
                }
                return Err(access_denied(target, root));
            }
            Err(_) => {
                // A dangling symlink cannot be followed safely.
                let is_symlink = std::fs::symlink_metadata(ancestor)
                    .map(|m| m.file_type().is_symlink())
                    .unwrap_or(false);
                if is_symlink {
                    return Err(access_denied(target, root));
                }
            }
        }
        if ancestor == root {
            break;
        }
    }
    Ok(())
}
