use anyhow::{Context, Result, bail};
use log::debug;
use std::path::{Path, PathBuf};

use crate::runtime::{Runtime, normalize_path, relative_symlink_path};

/// How an alias refers to its version directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasMode {
    Symlink,
    /// A full copy of the version directory. Used on Windows, where creating
    /// directory symlinks needs elevated rights or Developer Mode.
    Copy,
}

impl AliasMode {
    pub fn native() -> Self {
        if cfg!(windows) {
            AliasMode::Copy
        } else {
            AliasMode::Symlink
        }
    }
}

/// Point the alias `name` at an installed version directory.
///
/// A relative `name` lives in `destination`. Returns the path of the alias.
pub fn update_alias<R: Runtime>(
    runtime: &R,
    destination: &Path,
    target: &Path,
    name: &str,
) -> Result<PathBuf> {
    update_alias_with(runtime, AliasMode::native(), destination, target, name)
}

#[tracing::instrument(skip(runtime))]
pub fn update_alias_with<R: Runtime>(
    runtime: &R,
    mode: AliasMode,
    destination: &Path,
    target: &Path,
    name: &str,
) -> Result<PathBuf> {
    if name.trim().is_empty() {
        bail!("Alias name must not be empty");
    }

    let name_path = Path::new(name);
    let link = if name_path.is_absolute() {
        name_path.to_path_buf()
    } else {
        destination.join(name_path)
    };

    match mode {
        AliasMode::Symlink => link_alias(runtime, &link, target)?,
        AliasMode::Copy => copy_alias(runtime, &link, target)?,
    }
    Ok(link)
}

/// The link is stored relative to its own directory when possible, so the
/// whole destination can be moved.
fn link_alias<R: Runtime>(runtime: &R, link: &Path, target: &Path) -> Result<()> {
    let link_target = relative_symlink_path(link, target).unwrap_or_else(|| target.to_path_buf());

    if runtime.is_symlink(link) {
        match runtime.read_link(link) {
            Ok(existing) if points_to(link, &existing, target) => {
                debug!("{:?} already points to {:?}", link, target);
                return Ok(());
            }
            Ok(existing) => {
                debug!(
                    "{:?} points to {:?}, but should point to {:?}. Updating...",
                    link, existing, link_target
                );
                runtime.remove_symlink(link)?;
            }
            Err(_) => {
                debug!("{:?} is unreadable, recreating...", link);
                runtime.remove_symlink(link)?;
            }
        }
    } else if runtime.exists(link) {
        bail!("{} exists but is not a symlink", link.display());
    }

    runtime
        .symlink(&link_target, link)
        .with_context(|| format!("Failed to link {} to {}", link.display(), target.display()))
}

/// Replace whatever is at `link` with a fresh copy of `target`.
fn copy_alias<R: Runtime>(runtime: &R, link: &Path, target: &Path) -> Result<()> {
    if normalize_path(link) == normalize_path(target) {
        bail!("Alias {} is the installed version itself", link.display());
    }

    if runtime.is_symlink(link) {
        debug!("Removing symlink {:?} before copying", link);
        runtime.remove_symlink(link)?;
    } else if runtime.is_dir(link) {
        debug!("Removing previous copy {:?}", link);
        runtime.remove_dir_all(link)?;
    } else if runtime.exists(link) {
        bail!("{} exists but is not a directory", link.display());
    }

    runtime
        .copy_dir(target, link)
        .with_context(|| format!("Failed to copy {} to {}", target.display(), link.display()))
}

fn points_to(link: &Path, existing: &Path, target: &Path) -> bool {
    let resolved = match link.parent() {
        Some(parent) if existing.is_relative() => parent.join(existing),
        _ => existing.to_path_buf(),
    };
    normalize_path(&resolved) == normalize_path(target)
}
