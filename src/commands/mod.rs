use anyhow::Result;

use crate::{http::HttpClient, runtime::Runtime, source::WebSource};

pub mod alias;
pub mod config;
mod install;
mod list;
mod paths;

pub use config::{CatalogOptions, Config};
pub use install::{InstallOptions, Installer};
pub use list::{ListOptions, list_downloads};

/// Install a version from the listing and optionally alias it.
#[tracing::instrument(skip(runtime))]
pub async fn install<R: Runtime + 'static>(
    runtime: R,
    catalog: &CatalogOptions,
    options: InstallOptions,
) -> Result<()> {
    let config = Config::new(runtime, catalog)?;
    Installer::new(config).install(&options).await?;
    Ok(())
}

/// Print the downloads available for the configured platform.
#[tracing::instrument]
pub async fn list(catalog: &CatalogOptions, options: ListOptions) -> Result<()> {
    let config = catalog.catalog_config()?;
    let source = WebSource::new(HttpClient::with_default_agent()?);
    let mut out = std::io::stdout();
    list_downloads(&source, config, &options, &mut out).await?;
    Ok(())
}
