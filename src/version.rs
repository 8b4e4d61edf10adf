//! Version parsing and ordering for distribution releases.
//!
//! Versions follow the `<major>.<minor>[.<patch>][rc<n>]` shape used by the
//! release listing (e.g. `1.21.3`, `1.22rc1`). Two entry points exist:
//! [`parse`] never fails and degrades to the zero tuple, which is what the
//! catalog ordering relies on; [`parse_strict`] rejects anything that is not
//! exactly a version and is meant for validating user input.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::cmp::Ordering;
use std::fmt;

const VERSION_PATTERN: &str =
    r"(?P<major>\d{1,2})\.(?P<minor>\d{1,3})(?:\.(?P<patch>\d{1,3}))?(?:rc(?P<rc>\d{1,3}))?";

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(VERSION_PATTERN).expect("version pattern is valid"));

static STRICT_VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^(?:{})$", VERSION_PATTERN)).expect("version pattern is valid")
});

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("'{0}' is not a valid version (expected <major>.<minor>[.<patch>][rc<n>])")]
    Malformed(String),
}

/// Numeric decomposition of a version string.
///
/// `release_candidate == 0` means a stable release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct VersionTuple {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub release_candidate: u32,
}

impl VersionTuple {
    pub const fn new(major: u32, minor: u32, patch: u32, release_candidate: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            release_candidate,
        }
    }

    pub fn is_release_candidate(&self) -> bool {
        self.release_candidate != 0
    }

    fn from_captures(caps: &Captures<'_>) -> Option<Self> {
        let number = |name: &str| -> Option<u32> {
            match caps.name(name) {
                Some(m) => m.as_str().parse().ok(),
                None => Some(0),
            }
        };
        // major and minor are mandatory in the pattern; a missing group here means no match
        caps.name("major")?;
        caps.name("minor")?;
        Some(Self {
            major: number("major")?,
            minor: number("minor")?,
            patch: number("patch")?,
            release_candidate: number("rc")?,
        })
    }
}

impl Ord for VersionTuple {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (self.release_candidate, other.release_candidate) {
                (0, 0) => Ordering::Equal,
                (0, _) => Ordering::Greater,
                (_, 0) => Ordering::Less,
                (a, b) => a.cmp(&b),
            })
    }
}

impl PartialOrd for VersionTuple {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.is_release_candidate() {
            write!(f, "rc{}", self.release_candidate)?;
        }
        Ok(())
    }
}

/// Lenient parse: returns the zero tuple when `version` does not contain a
/// recognizable version.
pub fn parse(version: &str) -> VersionTuple {
    VERSION_RE
        .captures(version)
        .and_then(|caps| VersionTuple::from_captures(&caps))
        .unwrap_or_default()
}

/// Strict parse: the whole string must be a version.
pub fn parse_strict(version: &str) -> Result<VersionTuple, VersionError> {
    STRICT_VERSION_RE
        .captures(version)
        .and_then(|caps| VersionTuple::from_captures(&caps))
        .ok_or_else(|| VersionError::Malformed(version.to_string()))
}

/// Orders two version strings by their lenient tuples.
pub fn compare(a: &str, b: &str) -> Ordering {
    parse(a).cmp(&parse(b))
}
