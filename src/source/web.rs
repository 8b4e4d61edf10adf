//! Listing source backed by HTTP.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use url::Url;

use crate::http::HttpClient;

use super::ListingSource;

pub struct WebSource {
    http_client: HttpClient,
}

impl WebSource {
    pub fn new(http_client: HttpClient) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl ListingSource for WebSource {
    #[tracing::instrument(skip(self))]
    async fn fetch_listing(&self, url: &Url) -> Result<String> {
        debug!("Fetching listing from {}...", url);
        let markup = self
            .http_client
            .get_text(url.as_str())
            .await
            .with_context(|| format!("Failed to fetch release listing from {}", url))?;
        debug!("Fetched {} bytes of listing markup", markup.len());
        Ok(markup)
    }
}
