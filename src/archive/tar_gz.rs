use crate::runtime::Runtime;
use anyhow::Context;
use flate2::read::GzDecoder;
use log::{debug, info};
use std::io::{Read, Write};
use std::path::Path;
use tar::{Archive, EntryType};

use super::guard::entry_target;
use super::{ArchiveError, ArchiveExtractor};

/// Extractor for .tar.gz archives
#[derive(Debug, Default)]
pub struct TarGzExtractor;

impl ArchiveExtractor for TarGzExtractor {
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<(), ArchiveError> {
        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;
        self.extract_stream(runtime, file, extract_to)
    }
}

impl TarGzExtractor {
    /// Decompress and unpack a gzip-compressed tar stream into `dest`.
    ///
    /// Entries are validated and written one at a time, so a rejected entry
    /// leaves the earlier ones on disk.
    #[tracing::instrument(skip(self, runtime, source))]
    pub fn extract_stream<R: Runtime, S: Read>(
        &self,
        runtime: &R,
        source: S,
        dest: &Path,
    ) -> Result<(), ArchiveError> {
        debug!("Extracting tar.gz archive to {:?}...", dest);
        runtime
            .create_dir_all(dest)
            .with_context(|| format!("Failed to create extraction directory {:?}", dest))?;

        let mut archive = Archive::new(GzDecoder::new(source));
        let entries = archive
            .entries()
            .context("Failed to read tar.gz archive")?;

        for entry in entries {
            let mut entry = entry.context("Failed to read tar entry")?;
            let entry_path = entry
                .path()
                .context("Failed to read tar entry path")?
                .into_owned();

            let Some(target) = entry_target(dest, &entry_path)? else {
                continue;
            };

            match entry.header().entry_type() {
                EntryType::Directory => {
                    debug!("Extracting {:?}", target);
                    if !runtime.is_dir(&target) {
                        runtime.create_dir_all(&target)?;
                    }
                }
                EntryType::Regular | EntryType::Continuous => {
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

                    let mode = entry
                        .header()
                        .mode()
                        .with_context(|| format!("Invalid mode for {:?}", entry_path))?;
                    runtime.set_permissions(&target, mode & 0o7777)?;
                }
                other => {
                    debug!("Skipping {:?} entry {:?}", other, entry_path);
                }
            }
        }

        info!("Extraction complete.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::test_support::{TarEntry, capture_logs, tar_gz_bytes, was_logged};
    use crate::runtime::RealRuntime;
    use anyhow::Result;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn test_extract_reproduces_tree() -> Result<()> {
        let dir = tempdir()?;
        let dest = dir.path().join("_1.21.3");
        let bytes = tar_gz_bytes(&[
            TarEntry::Dir("./"),
            TarEntry::Dir("go/"),
            TarEntry::File("go/VERSION", "go1.21.3", 0o644),
            TarEntry::Dir("go/bin/"),
            TarEntry::File("go/bin/go", "binary", 0o755),
            // Parent directory never listed
            TarEntry::File("go/src/cmd/main.go", "package main", 0o644),
        ])?;

        TarGzExtractor.extract_stream(&RealRuntime, Cursor::new(bytes), &dest)?;

        assert_eq!(fs::read_to_string(dest.join("go/VERSION"))?, "go1.21.3");
        assert_eq!(fs::read_to_string(dest.join("go/bin/go"))?, "binary");
        assert_eq!(
            fs::read_to_string(dest.join("go/src/cmd/main.go"))?,
            "package main"
        );
        Ok(())
    }

    #[test]
    fn test_extract_logs_each_entry() -> Result<()> {
        capture_logs();
        let dir = tempdir()?;
        let dest = dir.path().join("_1.21.3");
        let bytes = tar_gz_bytes(&[
            TarEntry::Dir("go/"),
            TarEntry::File("go/VERSION", "go1.21.3", 0o644),
            TarEntry::Symlink("go/link", "VERSION"),
        ])?;

        TarGzExtractor.extract_stream(&RealRuntime, Cursor::new(bytes), &dest)?;

        let go = dest.join("go");
        assert!(was_logged(&format!("Extracting {:?}", go)));
        assert!(was_logged(&format!("Extracting {:?}", go.join("VERSION"))));
        assert!(!was_logged(&format!("Extracting {:?}", go.join("link"))));
        Ok(())
    }

    #[test]
    fn test_extract_from_file() -> Result<()> {
        let dir = tempdir()?;
        let archive_path = dir.path().join("go1.21.3.linux-amd64.tar.gz");
        let dest = dir.path().join("out");
        fs::write(
            &archive_path,
            tar_gz_bytes(&[TarEntry::File("go/VERSION", "go1.21.3", 0o644)])?,
        )?;

        TarGzExtractor.extract(&RealRuntime, &archive_path, &dest)?;

        assert!(dest.join("go/VERSION").is_file());
        Ok(())
    }

    #[test]
    fn test_extract_rejects_traversal() -> Result<()> {
        let dir = tempdir()?;
        let dest = dir.path().join("out");
        let bytes = tar_gz_bytes(&[
            TarEntry::File("go/VERSION", "go1.21.3", 0o644),
            TarEntry::RawFile("../evil.txt", "pwned"),
            TarEntry::File("go/after.txt", "never written", 0o644),
        ])?;

        let result = TarGzExtractor.extract_stream(&RealRuntime, Cursor::new(bytes), &dest);

        assert!(matches!(
            result,
            Err(ArchiveError::TraversalViolation { ref entry, .. }) if entry == "../evil.txt"
        ));
        assert!(!dir.path().join("evil.txt").exists());
        // Entries before the violation stay in place, later ones are never reached
        assert!(dest.join("go/VERSION").exists());
        assert!(!dest.join("go/after.txt").exists());
        Ok(())
    }

    #[test]
    fn test_extract_rejects_nested_traversal() -> Result<()> {
        let dir = tempdir()?;
        let dest = dir.path().join("out");
        let bytes = tar_gz_bytes(&[TarEntry::RawFile("go/../../evil.txt", "pwned")])?;

        let result = TarGzExtractor.extract_stream(&RealRuntime, Cursor::new(bytes), &dest);

        assert!(matches!(
            result,
            Err(ArchiveError::TraversalViolation { .. })
        ));
        assert!(!dir.path().join("evil.txt").exists());
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_extract_skips_symlinks() -> Result<()> {
        let dir = tempdir()?;
        let dest = dir.path().join("out");
        let bytes = tar_gz_bytes(&[
            TarEntry::File("go/VERSION", "go1.21.3", 0o644),
            TarEntry::Symlink("go/passwd", "/etc/passwd"),
        ])?;

        TarGzExtractor.extract_stream(&RealRuntime, Cursor::new(bytes), &dest)?;

        assert!(dest.join("go/VERSION").exists());
        assert!(fs::symlink_metadata(dest.join("go/passwd")).is_err());
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_extract_leaves_existing_directories_alone() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir()?;
        let dest = dir.path().join("out");
        let existing = dest.join("go");
        fs::create_dir_all(&existing)?;
        fs::write(existing.join("local.txt"), "keep me")?;
        fs::set_permissions(&existing, fs::Permissions::from_mode(0o700))?;

        let bytes = tar_gz_bytes(&[
            TarEntry::Dir("go/"),
            TarEntry::File("go/VERSION", "go1.21.3", 0o644),
        ])?;
        TarGzExtractor.extract_stream(&RealRuntime, Cursor::new(bytes), &dest)?;

        assert_eq!(fs::read_to_string(existing.join("local.txt"))?, "keep me");
        let mode = fs::metadata(&existing)?.permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_extract_preserves_file_permissions() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir()?;
        let dest = dir.path().join("out");
        let bytes = tar_gz_bytes(&[
            TarEntry::File("go/bin/go", "#!/bin/sh", 0o755),
            TarEntry::File("go/secret", "token", 0o600),
        ])?;

        TarGzExtractor.extract_stream(&RealRuntime, Cursor::new(bytes), &dest)?;

        let exe = fs::metadata(dest.join("go/bin/go"))?.permissions().mode();
        assert_eq!(exe & 0o777, 0o755);
        let secret = fs::metadata(dest.join("go/secret"))?.permissions().mode();
        assert_eq!(secret & 0o777, 0o600);
        Ok(())
    }

    #[test]
    fn test_extract_overwrites_existing_file() -> Result<()> {
        let dir = tempdir()?;
        let dest = dir.path().join("out");
        fs::create_dir_all(dest.join("go"))?;
        fs::write(dest.join("go/VERSION"), "a much longer stale version string")?;

        let bytes = tar_gz_bytes(&[TarEntry::File("go/VERSION", "go1.21.3", 0o644)])?;
        TarGzExtractor.extract_stream(&RealRuntime, Cursor::new(bytes), &dest)?;

        assert_eq!(fs::read_to_string(dest.join("go/VERSION"))?, "go1.21.3");
        Ok(())
    }

    #[test]
    fn test_extract_empty_archive() -> Result<()> {
        let dir = tempdir()?;
        let dest = dir.path().join("out");
        let bytes = tar_gz_bytes(&[])?;

        TarGzExtractor.extract_stream(&RealRuntime, Cursor::new(bytes), &dest)?;

        assert!(dest.is_dir());
        assert_eq!(fs::read_dir(&dest)?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_extract_corrupted_stream() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out");

        let result = TarGzExtractor.extract_stream(
            &RealRuntime,
            Cursor::new(b"definitely not gzip".to_vec()),
            &dest,
        );

        assert!(matches!(result, Err(ArchiveError::Io(_))));
    }

    #[test]
    fn test_extract_failing_source() {
        struct FailingReader;

        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("connection reset"))
            }
        }

        let dir = tempdir().unwrap();
        let dest = dir.path().join("out");

        let result = TarGzExtractor.extract_stream(&RealRuntime, FailingReader, &dest);

        assert!(matches!(result, Err(ArchiveError::Io(_))));
    }

    #[test]
    fn test_extract_missing_archive() {
        let dir = tempdir().unwrap();
        let result = TarGzExtractor.extract(
            &RealRuntime,
            &dir.path().join("missing.tar.gz"),
            &dir.path().join("out"),
        );

        let err = result.unwrap_err();
        assert!(matches!(err, ArchiveError::Io(_)));
        assert!(err.to_string().contains("Failed to open archive"));
    }
}
