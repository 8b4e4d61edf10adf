use anyhow::{Context, Result, bail};
use log::info;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Directory name of the default destination under the home directory.
const DEFAULT_DESTINATION_DIR: &str = "sdk";

/// Resolve the directory versions are installed into.
///
/// A user-supplied destination must already exist. The default `~/sdk` is
/// created on first use.
#[tracing::instrument(skip(runtime))]
pub fn resolve_destination<R: Runtime>(runtime: &R, destination: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = destination {
        if !runtime.is_dir(&path) {
            bail!(
                "Destination {} does not exist or is not a directory",
                path.display()
            );
        }
        return Ok(path);
    }

    let path = default_destination(runtime)?;
    if !runtime.is_dir(&path) {
        info!("Creating destination {}", path.display());
        runtime
            .create_dir_all(&path)
            .with_context(|| format!("Failed to create destination {}", path.display()))?;
    }
    Ok(path)
}

/// `$HOME/sdk`
#[tracing::instrument(skip(runtime))]
pub fn default_destination<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    let home_dir = runtime
        .home_dir()
        .context("Could not find home directory")?;
    Ok(home_dir.join(DEFAULT_DESTINATION_DIR))
}

/// Where a version is unpacked before it is moved into place.
pub fn staging_dir(destination: &Path, version: &str) -> PathBuf {
    destination.join(format!("_{}", version))
}

/// Final location of an installed version.
pub fn install_dir(destination: &Path, version: &str) -> PathBuf {
    destination.join(version)
}
