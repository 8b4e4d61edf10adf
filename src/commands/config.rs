use anyhow::{Context, Result};
use log::debug;
use url::Url;

use crate::{
    archive::{ArchiveExtractor, ArchiveExtractorImpl},
    catalog::CatalogConfig,
    http::HttpClient,
    platform::Platform,
    runtime::Runtime,
    source::{ListingSource, WebSource},
};

/// Catalog-related options shared by every subcommand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogOptions {
    pub base_url: Option<String>,
    pub os: Option<String>,
    pub arch: Option<String>,
    pub include_release_candidates: bool,
}

impl CatalogOptions {
    /// Resolve the options against the defaults.
    pub fn catalog_config(&self) -> Result<CatalogConfig> {
        let mut config = CatalogConfig::default()
            .with_platform(
                Platform::detect().with_overrides(self.os.as_deref(), self.arch.as_deref()),
            )
            .with_release_candidates(self.include_release_candidates);

        if let Some(base_url) = &self.base_url {
            let url = Url::parse(base_url)
                .with_context(|| format!("Invalid base URL: {}", base_url))?;
            if url.cannot_be_a_base() {
                anyhow::bail!("Invalid base URL: {}", base_url);
            }
            config = config.with_base_url(url);
        }

        debug!(
            "Catalog: {} for {} (release candidates: {})",
            config.base_url, config.platform, config.include_release_candidates
        );
        Ok(config)
    }
}

pub struct Config<R: Runtime, S: ListingSource, E: ArchiveExtractor> {
    pub runtime: R,
    pub source: S,
    pub http_client: HttpClient,
    pub extractor: E,
    pub catalog: CatalogConfig,
}

impl<R: Runtime> Config<R, WebSource, ArchiveExtractorImpl> {
    pub fn new(runtime: R, options: &CatalogOptions) -> Result<Self> {
        let catalog = options.catalog_config()?;
        let http_client = HttpClient::with_default_agent()?;
        let source = WebSource::new(http_client.clone());

        Ok(Self {
            runtime,
            source,
            http_client,
            extractor: ArchiveExtractorImpl::new(),
            catalog,
        })
    }
}
