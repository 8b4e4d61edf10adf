use crate::http::HttpClient;
use crate::runtime::Runtime;
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

/// Streams a release archive into `archive_path` with retry support.
#[tracing::instrument(skip(runtime, http_client))]
pub async fn download_file<R: Runtime>(
    runtime: &R,
    url: &str,
    archive_path: &Path,
    http_client: &HttpClient,
) -> Result<u64> {
    info!("Downloading file from {}...", url);

    let bytes = http_client
        .download_file(url, || {
            runtime
                .create_file(archive_path)
                .with_context(|| format!("Failed to create archive file at {:?}", archive_path))
        })
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    info!("Download complete.");
    Ok(bytes)
}
