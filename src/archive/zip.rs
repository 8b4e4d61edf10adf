use crate::runtime::Runtime;
use anyhow::Context;
use log::{debug, info};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use super::guard::entry_target;
use super::{ArchiveError, ArchiveExtractor};

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Extractor for .zip archives
#[derive(Debug, Default)]
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    #[tracing::instrument(skip(self, runtime))]
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<(), ArchiveError> {
        debug!("Extracting zip archive to {:?}...", extract_to);
        let file = runtime
            .open_seekable(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;
        let mut archive = ZipArchive::new(file).context("Failed to parse ZIP archive")?;

        // Every name in the central directory is checked before anything is written
        let targets = (0..archive.len())
            .map(|i| {
                let name = archive
                    .name_for_index(i)
                    .with_context(|| format!("Failed to read ZIP entry {}", i))?;
                entry_target(extract_to, Path::new(name))
            })
            .collect::<Result<Vec<Option<PathBuf>>, ArchiveError>>()?;

        runtime
            .create_dir_all(extract_to)
            .with_context(|| format!("Failed to create extraction directory {:?}", extract_to))?;

        for (i, target) in targets.into_iter().enumerate() {
            let Some(target) = target else {
                continue;
            };
            let mut entry = archive
                .by_index(i)
                .with_context(|| format!("Failed to read ZIP entry {}", i))?;

            if entry.is_dir() {
                debug!("Extracting {:?}", target);
                if !runtime.is_dir(&target) {
                    runtime.create_dir_all(&target)?;
                }
                continue;
            }

            let mode = entry.unix_mode();
            if mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
                debug!("Skipping symlink entry {:?}", entry.name());
                continue;
            }

            debug!("Extracting {:?}", target);
            if let Some(parent) = target.parent()
                && !runtime.is_dir(parent)
            {
                runtime.create_dir_all(parent)?;
            }

            let mut writer = runtime.create_file(&target)?;
            std::io::copy(&mut entry, &mut writer)
                .with_context(|| format!("Failed to extract file {:?}", target))?;
            writer
                .flush()
                .with_context(|| format!("Failed to flush file {:?}", target))?;
            drop(writer);

            if let Some(mode) = mode {
                runtime.set_permissions(&target, mode & 0o7777)?;
            }
        }

        info!("Extraction complete.");
        Ok(())
    }
}
