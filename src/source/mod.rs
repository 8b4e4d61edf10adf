//! Where listing documents come from.
//!
//! The catalog only ever sees markup; fetching it sits behind
//! [`ListingSource`] so commands can be tested without a network.

mod web;

use anyhow::Result;
use async_trait::async_trait;
use url::Url;

pub use web::WebSource;

/// Fetches the listing document that enumerates release archives.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch the listing at `url` and return its markup.
    async fn fetch_listing(&self, url: &Url) -> Result<String>;
}
