use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    archive::ArchiveExtractor,
    catalog::{Catalog, CatalogConfig, CatalogError, Download},
    cleanup::{self, CleanupGuard, InterruptHandler, SharedCleanupContext},
    download::download_file,
    http::HttpClient,
    runtime::Runtime,
    source::ListingSource,
    version,
};

use super::alias::update_alias;
use super::config::Config;
use super::paths::{install_dir, resolve_destination, staging_dir};

/// How many versions to suggest when the requested one is missing.
const SUGGESTED_VERSIONS: usize = 5;

/// What to install and where.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    pub version: String,
    pub destination: Option<PathBuf>,
    pub link: Option<String>,
}

pub struct Installer<R: Runtime, S: ListingSource, E: ArchiveExtractor> {
    runtime: R,
    source: S,
    http_client: HttpClient,
    extractor: E,
    catalog: CatalogConfig,
}

impl<R: Runtime + 'static, S: ListingSource, E: ArchiveExtractor> Installer<R, S, E> {
    pub fn new(config: Config<R, S, E>) -> Self {
        Self {
            runtime: config.runtime,
            source: config.source,
            http_client: config.http_client,
            extractor: config.extractor,
            catalog: config.catalog,
        }
    }

    /// Install a version into the destination and return its directory.
    #[tracing::instrument(skip(self))]
    pub async fn install(&self, options: &InstallOptions) -> Result<PathBuf> {
        let version = options.version.as_str();
        version::parse_strict(version).with_context(|| {
            format!(
                "Invalid version {:?}: expected a release such as 1.21.3 or 1.22rc1",
                version
            )
        })?;

        let destination = resolve_destination(&self.runtime, options.destination.clone())?;
        let target = install_dir(&destination, version);

        let interrupt = if self.runtime.exists(&target) {
            println!("   {} is already installed at {}", version, target.display());
            None
        } else {
            let download = self.resolve(version).await?;

            let cleanup_ctx = cleanup::new_shared();
            let interrupt = InterruptHandler::spawn(Arc::clone(&cleanup_ctx));
            self.install_download(&download, &destination, &target, cleanup_ctx)
                .await?;

            println!("   installed {} to {}", version, target.display());
            Some(interrupt)
        };

        if let Some(name) = &options.link {
            let link = update_alias(&self.runtime, &destination, &target, name)?;
            println!("   linked {} -> {}", link.display(), target.display());
        }

        drop(interrupt);
        Ok(target)
    }

    /// Fetch the listing and find the download for `version`.
    async fn resolve(&self, version: &str) -> Result<Download> {
        let mut catalog = Catalog::new(self.catalog.clone())?;
        let base_url = catalog.config().base_url.clone();
        let platform = catalog.config().platform.clone();

        println!("   resolving {} for {}", version, platform);
        let markup = self.source.fetch_listing(&base_url).await?;
        catalog.discover(&markup);

        match catalog.lookup(version) {
            Ok(download) => {
                debug!("Resolved {} to {}", version, download.url);
                Ok(download.clone())
            }
            Err(e @ CatalogError::NotFound(_)) => {
                let newest: Vec<&str> = catalog
                    .downloads()
                    .iter()
                    .take(SUGGESTED_VERSIONS)
                    .map(|d| d.version.as_str())
                    .collect();
                if newest.is_empty() {
                    Err(e).with_context(|| {
                        format!("No downloads for {} found at {}", platform, base_url)
                    })
                } else {
                    Err(e).with_context(|| {
                        format!(
                            "{} is not available for {}. Newest available: {}",
                            version,
                            platform,
                            newest.join(", ")
                        )
                    })
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Download, extract and move one release into `target`.
    ///
    /// All work happens in a staging directory next to the target, which is
    /// removed afterwards whatever the outcome.
    async fn install_download(
        &self,
        download: &Download,
        destination: &Path,
        target: &Path,
        cleanup_ctx: SharedCleanupContext,
    ) -> Result<()> {
        let staging = staging_dir(destination, &download.version);
        if self.runtime.exists(&staging) {
            warn!(
                "Removing leftover staging directory {} from an earlier run",
                staging.display()
            );
            self.runtime
                .remove_dir_all(&staging)
                .with_context(|| format!("Failed to remove {}", staging.display()))?;
        }

        let guard = CleanupGuard::new(cleanup_ctx, staging.clone());
        self.runtime
            .create_dir_all(guard.path())
            .with_context(|| format!("Failed to create {}", staging.display()))?;

        let archive_path = staging.join(&download.file_name);
        println!("   downloading {}", download.url);
        download_file(
            &self.runtime,
            download.url.as_str(),
            &archive_path,
            &self.http_client,
        )
        .await?;

        info!("Extracting {:?} into {:?}", archive_path, staging);
        self.extractor
            .extract(&self.runtime, &archive_path, &staging)
            .with_context(|| format!("Failed to extract {}", download.file_name))?;

        let extracted = staging.join(&self.catalog.name);
        if !self.runtime.is_dir(&extracted) {
            let found: Vec<String> = self
                .runtime
                .read_dir(&staging)
                .unwrap_or_default()
                .iter()
                .filter(|p| **p != archive_path)
                .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect();
            bail!(
                "{} has no top-level {:?} directory (found: {})",
                download.file_name,
                self.catalog.name,
                if found.is_empty() {
                    "nothing".to_string()
                } else {
                    found.join(", ")
                }
            );
        }

        self.runtime
            .rename(&extracted, target)
            .with_context(|| format!("Failed to move {:?} to {:?}", extracted, target))?;

        drop(guard);
        Ok(())
    }
}
