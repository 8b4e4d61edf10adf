mod guard;
mod tar_gz;
mod zip;

use crate::runtime::Runtime;
use std::path::{Path, PathBuf};

pub use tar_gz::TarGzExtractor;
pub use zip::ZipExtractor;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Unsupported archive format: {}", .0.display())]
    UnsupportedContainer(PathBuf),

    #[error("Archive entry {entry:?} escapes the extraction directory {}", .root.display())]
    TraversalViolation { entry: String, root: PathBuf },

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// Container formats a release may be published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Zip,
}

impl ArchiveKind {
    /// Detect the container kind from a file name suffix.
    pub fn from_file_name(path: &Path) -> Result<Self, ArchiveError> {
        let name = path.to_string_lossy().to_lowercase();
        if name.ends_with(".tar.gz") {
            Ok(ArchiveKind::TarGz)
        } else if name.ends_with(".zip") {
            Ok(ArchiveKind::Zip)
        } else {
            Err(ArchiveError::UnsupportedContainer(path.to_path_buf()))
        }
    }
}

/// Trait for format-specific archive extractors
pub trait ArchiveExtractor: Send + Sync {
    /// Extract the archive into `extract_to`, reproducing its internal tree.
    ///
    /// The destination is created if needed. A failure leaves whatever was
    /// already written in place.
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<(), ArchiveError>;
}

/// Dispatcher that selects the appropriate extractor based on archive format.
#[derive(Default)]
pub struct ArchiveExtractorImpl {
    tar_gz: TarGzExtractor,
    zip: ZipExtractor,
}

impl ArchiveExtractorImpl {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArchiveExtractor for ArchiveExtractorImpl {
    #[tracing::instrument(skip(self, runtime))]
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<(), ArchiveError> {
        match ArchiveKind::from_file_name(archive_path)? {
            ArchiveKind::TarGz => self.tar_gz.extract(runtime, archive_path, extract_to),
            ArchiveKind::Zip => self.zip.extract(runtime, archive_path, extract_to),
        }
    }
}
