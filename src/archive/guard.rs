//! Traversal guard shared by every container format.

use std::path::{Component, Path, PathBuf};

use super::ArchiveError;
use crate::runtime::{is_path_under, normalize_path};

/// Resolve an archive entry name against the extraction root.
///
/// Returns `Ok(None)` when the entry names the root itself (e.g. `./`), and
/// [`ArchiveError::TraversalViolation`] when it is absolute or resolves
/// outside the root.
pub(crate) fn entry_target(root: &Path, entry_name: &Path) -> Result<Option<PathBuf>, ArchiveError> {
    let violation = || ArchiveError::TraversalViolation {
        entry: entry_name.display().to_string(),
        root: root.to_path_buf(),
    };

    if entry_name
        .components()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
    {
        return Err(violation());
    }

    let normalized_root = normalize_path(root);
    let target = normalize_path(&root.join(entry_name));
    if !is_path_under(&target, &normalized_root) {
        return Err(violation());
    }
    if target == normalized_root {
        return Ok(None);
    }
    Ok(Some(target))
}
