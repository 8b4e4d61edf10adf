//! Release catalog built from a listing page.
//!
//! The catalog turns raw listing markup into an ordered sequence of
//! [`Download`] records for a single platform. It never fetches anything
//! itself; callers hand it the markup obtained through a
//! [`ListingSource`](crate::source::ListingSource).

mod label;

use log::debug;
use scraper::{Html, Selector};
use serde::Serialize;
use url::Url;

use crate::platform::Platform;
use crate::version;

pub use label::{LabelParser, ReleaseLabel};

/// Listing of official Go releases.
pub const DEFAULT_BASE_URL: &str = "https://go.dev/dl/";

/// Distribution name prefixing every archive label.
pub const DEFAULT_NAME: &str = "go";

/// CSS selector for candidate download links.
pub const DEFAULT_SELECTOR: &str = ".download";

const ARCHIVE_SUFFIXES: [&str; 2] = [".tar.gz", ".zip"];

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("No such version: {0}")]
    NotFound(String),

    #[error("Invalid release label pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid listing selector {selector:?}: {message}")]
    Selector { selector: String, message: String },
}

/// A downloadable release archive for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Download {
    pub url: Url,
    pub version: String,
    pub os: String,
    pub arch: String,
    pub file_name: String,
}

/// Settings fixed for the lifetime of a [`Catalog`].
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    pub base_url: Url,
    pub platform: Platform,
    pub include_release_candidates: bool,
    pub name: String,
    pub selector: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            platform: Platform::detect(),
            include_release_candidates: false,
            name: DEFAULT_NAME.to_string(),
            selector: DEFAULT_SELECTOR.to_string(),
        }
    }
}

impl CatalogConfig {
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_release_candidates(mut self, include: bool) -> Self {
        self.include_release_candidates = include;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }
}

pub struct Catalog {
    config: CatalogConfig,
    parser: LabelParser,
    selector: Selector,
    downloads: Vec<Download>,
}

impl Catalog {
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        let parser = LabelParser::new(&config.name, config.include_release_candidates)?;
        let selector = Selector::parse(&config.selector).map_err(|e| CatalogError::Selector {
            selector: config.selector.clone(),
            message: e.to_string(),
        })?;
        Ok(Self {
            config,
            parser,
            selector,
            downloads: Vec::new(),
        })
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Replace the catalog contents with the downloads found in `markup`,
    /// newest first.
    ///
    /// Nodes that do not look like an archive link for the configured
    /// platform are skipped; markup without any yields an empty catalog.
    #[tracing::instrument(skip(self, markup))]
    pub fn discover(&mut self, markup: &str) -> &[Download] {
        let document = Html::parse_document(markup);
        let origin = self.origin();

        let mut downloads = Vec::new();
        for element in document.select(&self.selector) {
            let label = element.text().collect::<String>();
            let label = label.trim();
            if let Some(href) = element.value().attr("href")
                && let Some(download) = self.to_download(&origin, label, href)
            {
                downloads.push(download);
            }
        }

        sort_newest_first(&mut downloads);
        debug!(
            "Discovered {} downloads for {}",
            downloads.len(),
            self.config.platform
        );
        self.downloads = downloads;
        &self.downloads
    }

    pub fn downloads(&self) -> &[Download] {
        &self.downloads
    }

    /// Newest download in the catalog.
    pub fn latest(&self) -> Option<&Download> {
        self.downloads.first()
    }

    /// Find the download whose version string equals `version` exactly.
    pub fn lookup(&self, version: &str) -> Result<&Download, CatalogError> {
        self.downloads
            .iter()
            .find(|d| d.version == version)
            .ok_or_else(|| CatalogError::NotFound(version.to_string()))
    }

    fn origin(&self) -> Url {
        let mut origin = self.config.base_url.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);
        origin
    }

    fn to_download(&self, origin: &Url, label: &str, href: &str) -> Option<Download> {
        if !ARCHIVE_SUFFIXES.iter().any(|suffix| label.ends_with(suffix)) {
            return None;
        }

        let Some(release) = self.parser.parse(label) else {
            debug!("Skipping unrecognized label {:?}", label);
            return None;
        };

        let platform = &self.config.platform;
        if release.os != platform.os || release.arch != platform.arch {
            return None;
        }

        let url = match origin.join(href) {
            Ok(url) => url,
            Err(e) => {
                debug!("Skipping {:?}: cannot resolve href {:?}: {}", label, href, e);
                return None;
            }
        };

        Some(Download {
            url,
            version: release.version,
            os: release.os,
            arch: release.arch,
            file_name: label.to_string(),
        })
    }
}

/// Sort downloads newest first. Equal versions keep their relative order.
pub fn sort_newest_first(downloads: &mut [Download]) {
    downloads.sort_by(|a, b| version::compare(&b.version, &a.version));
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<!DOCTYPE html>
<html>
<body>
  <a class="download downloadBox" href="/dl/go1.21.3.linux-amd64.tar.gz">
    <div class="platform">Linux</div>
    <span class="filename">go1.21.3.linux-amd64.tar.gz</span>
  </a>
  <table>
    <tr><td><a class="download" href="/dl/go1.20.10.linux-amd64.tar.gz">go1.20.10.linux-amd64.tar.gz</a></td></tr>
    <tr><td><a class="download" href="/dl/go1.21.3.linux-amd64.tar.gz">go1.21.3.linux-amd64.tar.gz</a></td></tr>
    <tr><td><a class="download" href="/dl/go1.21.3.linux-arm64.tar.gz">go1.21.3.linux-arm64.tar.gz</a></td></tr>
    <tr><td><a class="download" href="/dl/go1.21.3.windows-amd64.zip">go1.21.3.windows-amd64.zip</a></td></tr>
    <tr><td><a class="download" href="/dl/go1.21.3.windows-amd64.msi">go1.21.3.windows-amd64.msi</a></td></tr>
    <tr><td><a class="download" href="/dl/go1.21.3.src.tar.gz">go1.21.3.src.tar.gz</a></td></tr>
    <tr><td><a class="download" href="/dl/go1.22rc2.linux-amd64.tar.gz">go1.22rc2.linux-amd64.tar.gz</a></td></tr>
    <tr><td><a class="download" href="/dl/go1.22rc1.linux-amd64.tar.gz">go1.22rc1.linux-amd64.tar.gz</a></td></tr>
    <tr><td><a class="download">go1.19.linux-amd64.tar.gz</a></td></tr>
    <tr><td><a href="/dl/go1.18.linux-amd64.tar.gz">go1.18.linux-amd64.tar.gz</a></td></tr>
  </table>
</body>
</html>"#;

    fn config(os: &str, arch: &str) -> CatalogConfig {
        CatalogConfig::default()
            .with_base_url(Url::parse("https://go.dev/dl/").unwrap())
            .with_platform(Platform::new(os, arch))
    }

    fn versions(downloads: &[Download]) -> Vec<&str> {
        downloads.iter().map(|d| d.version.as_str()).collect()
    }

    fn bare_download(version: &str) -> Download {
        Download {
            url: Url::parse("https://example.com/").unwrap(),
            version: version.to_string(),
            os: String::new(),
            arch: String::new(),
            file_name: String::new(),
        }
    }

    #[test]
    fn test_discover_stable_for_platform() {
        let mut catalog = Catalog::new(config("linux", "amd64")).unwrap();
        let downloads = catalog.discover(LISTING);

        assert_eq!(versions(downloads), vec!["1.21.3", "1.20.10"]);

        let newest = &downloads[0];
        assert_eq!(
            newest.url.as_str(),
            "https://go.dev/dl/go1.21.3.linux-amd64.tar.gz"
        );
        assert_eq!(newest.file_name, "go1.21.3.linux-amd64.tar.gz");
        assert_eq!(newest.os, "linux");
        assert_eq!(newest.arch, "amd64");
    }

    #[test]
    fn test_discover_including_release_candidates() {
        let mut catalog =
            Catalog::new(config("linux", "amd64").with_release_candidates(true)).unwrap();
        let downloads = catalog.discover(LISTING);

        assert_eq!(
            versions(downloads),
            vec!["1.22rc2", "1.22rc1", "1.21.3", "1.20.10"]
        );
    }

    #[test]
    fn test_discover_filters_platform_exactly() {
        let mut catalog = Catalog::new(config("linux", "arm64")).unwrap();
        let downloads = catalog.discover(LISTING);
        assert_eq!(versions(downloads), vec!["1.21.3"]);
        assert!(downloads.iter().all(|d| d.arch == "arm64"));

        let mut catalog = Catalog::new(config("windows", "amd64")).unwrap();
        let downloads = catalog.discover(LISTING);
        assert_eq!(versions(downloads), vec!["1.21.3"]);
        assert_eq!(downloads[0].file_name, "go1.21.3.windows-amd64.zip");

        let mut catalog = Catalog::new(config("darwin", "amd64")).unwrap();
        assert!(catalog.discover(LISTING).is_empty());
    }

    #[test]
    fn test_discover_replaces_previous_results() {
        let mut catalog = Catalog::new(config("linux", "amd64")).unwrap();
        catalog.discover(LISTING);
        assert_eq!(catalog.downloads().len(), 2);

        catalog.discover("<html></html>");
        assert!(catalog.downloads().is_empty());
    }

    #[test]
    fn test_discover_keeps_duplicates() {
        let markup = r#"
            <a class="download" href="/a/go1.21.3.linux-amd64.tar.gz">go1.21.3.linux-amd64.tar.gz</a>
            <a class="download" href="/b/go1.21.3.linux-amd64.tar.gz">go1.21.3.linux-amd64.tar.gz</a>
        "#;
        let mut catalog = Catalog::new(config("linux", "amd64")).unwrap();
        let downloads = catalog.discover(markup);

        assert_eq!(downloads.len(), 2);
        assert_eq!(downloads[0].url.path(), "/a/go1.21.3.linux-amd64.tar.gz");
        assert_eq!(downloads[1].url.path(), "/b/go1.21.3.linux-amd64.tar.gz");
        assert_eq!(
            catalog.lookup("1.21.3").unwrap().url.path(),
            "/a/go1.21.3.linux-amd64.tar.gz"
        );
    }

    #[test]
    fn test_discover_resolves_hrefs_against_origin() {
        let markup = r#"
            <a class="download" href="go1.21.3.linux-amd64.tar.gz">go1.21.3.linux-amd64.tar.gz</a>
            <a class="download" href="https://dl.google.com/go/go1.21.2.linux-amd64.tar.gz">go1.21.2.linux-amd64.tar.gz</a>
        "#;
        let base = Url::parse("http://127.0.0.1:8080/dl/?mode=json").unwrap();
        let mut catalog =
            Catalog::new(config("linux", "amd64").with_base_url(base)).unwrap();
        let downloads = catalog.discover(markup);

        assert_eq!(
            downloads[0].url.as_str(),
            "http://127.0.0.1:8080/go1.21.3.linux-amd64.tar.gz"
        );
        assert_eq!(
            downloads[1].url.as_str(),
            "https://dl.google.com/go/go1.21.2.linux-amd64.tar.gz"
        );
    }

    #[test]
    fn test_discover_malformed_markup_is_empty() {
        let mut catalog = Catalog::new(config("linux", "amd64")).unwrap();
        assert!(catalog.discover("<<<not html at all").is_empty());
        assert!(catalog.discover("").is_empty());
    }

    #[test]
    fn test_lookup_exact_match_only() {
        let mut catalog = Catalog::new(config("linux", "amd64")).unwrap();
        catalog.discover(LISTING);

        assert_eq!(catalog.lookup("1.21.3").unwrap().version, "1.21.3");
        assert!(matches!(
            catalog.lookup("1.21"),
            Err(CatalogError::NotFound(v)) if v == "1.21"
        ));
        assert!(matches!(
            catalog.lookup("1.21.3.0"),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[test]
    fn test_lookup_on_empty_catalog() {
        let mut catalog = Catalog::new(config("linux", "amd64")).unwrap();
        catalog.discover("<html><body><p>nothing here</p></body></html>");

        for version in ["1.21.3", "", "latest"] {
            assert!(matches!(
                catalog.lookup(version),
                Err(CatalogError::NotFound(_))
            ));
        }
        assert!(catalog.latest().is_none());
    }

    #[test]
    fn test_latest() {
        let mut catalog = Catalog::new(config("linux", "amd64")).unwrap();
        catalog.discover(LISTING);
        assert_eq!(catalog.latest().unwrap().version, "1.21.3");
    }

    #[test]
    fn test_custom_name_and_selector() {
        let markup = r#"<ul><li><a class="file" href="/r/tool2.1.linux-amd64.zip">tool2.1.linux-amd64.zip</a></li></ul>"#;
        let mut catalog = Catalog::new(
            config("linux", "amd64")
                .with_name("tool")
                .with_selector("a.file"),
        )
        .unwrap();

        assert_eq!(versions(catalog.discover(markup)), vec!["2.1"]);
    }

    #[test]
    fn test_invalid_selector() {
        let result = Catalog::new(config("linux", "amd64").with_selector("[[["));
        assert!(matches!(result, Err(CatalogError::Selector { .. })));
    }

    #[test]
    fn test_sort_newest_first() {
        let mut downloads: Vec<Download> = ["1.19.1rc1", "1.19.1", "1.20rc3", "1.3"]
            .into_iter()
            .map(bare_download)
            .collect();

        sort_newest_first(&mut downloads);

        assert_eq!(
            versions(&downloads),
            vec!["1.20rc3", "1.19.1", "1.19.1rc1", "1.3"]
        );
    }
}
