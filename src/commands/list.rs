use anyhow::{Context, Result};
use log::debug;
use std::io::Write;

use crate::catalog::{Catalog, CatalogConfig};
use crate::source::ListingSource;

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Print the downloads as a JSON array.
    pub json: bool,
    /// Print only the newest download.
    pub latest: bool,
}

/// Print the downloads available for the configured platform, newest first.
///
/// Returns the number of downloads printed.
#[tracing::instrument(skip(source, config, out))]
pub async fn list_downloads<S: ListingSource, W: Write>(
    source: &S,
    config: CatalogConfig,
    options: &ListOptions,
    out: &mut W,
) -> Result<usize> {
    let mut catalog = Catalog::new(config)?;
    let base_url = catalog.config().base_url.clone();
    let platform = catalog.config().platform.clone();

    let markup = source.fetch_listing(&base_url).await?;
    catalog.discover(&markup);
    debug!("{} downloads listed at {}", catalog.downloads().len(), base_url);

    let downloads = if options.latest {
        catalog
            .latest()
            .map(std::slice::from_ref)
            .unwrap_or_default()
    } else {
        catalog.downloads()
    };

    if options.json {
        serde_json::to_writer_pretty(&mut *out, downloads)
            .context("Failed to serialize downloads")?;
        writeln!(out)?;
    } else {
        if downloads.is_empty() {
            eprintln!("No downloads found for {} at {}", platform, base_url);
        }
        for download in downloads {
            writeln!(out, "{}\t{}", download.version, download.url)?;
        }
    }
    Ok(downloads.len())
}
