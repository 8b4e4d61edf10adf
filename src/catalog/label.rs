use regex::Regex;

/// Fields extracted from a listing label such as `go1.21.3.linux-amd64.tar.gz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseLabel {
    pub version: String,
    pub os: String,
    pub arch: String,
}

/// Matches archive labels of the shape `<name><version>.<os>-<arch><suffix>`.
#[derive(Debug, Clone)]
pub struct LabelParser {
    regex: Regex,
}

impl LabelParser {
    /// Build a parser for labels starting with `name`.
    ///
    /// When `include_release_candidates` is false, labels whose version carries
    /// an `rc<n>` suffix do not match.
    pub fn new(name: &str, include_release_candidates: bool) -> Result<Self, regex::Error> {
        let release_candidate = if include_release_candidates {
            r"(?:rc\d{1,2})?"
        } else {
            ""
        };
        let pattern = format!(
            r"^{}(?P<version>\d{{1,2}}\.\d{{1,3}}(?:\.\d{{1,3}})?{})\.(?P<goos>[^-]+)-(?P<goarch>[^.]+)",
            regex::escape(name),
            release_candidate
        );
        Ok(Self {
            regex: Regex::new(&pattern)?,
        })
    }

    pub fn parse(&self, label: &str) -> Option<ReleaseLabel> {
        let caps = self.regex.captures(label)?;
        Some(ReleaseLabel {
            version: caps.name("version")?.as_str().to_string(),
            os: caps.name("goos")?.as_str().to_string(),
            arch: caps.name("goarch")?.as_str().to_string(),
        })
    }
}
