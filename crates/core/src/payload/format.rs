//! Document formats.
//!
//! A [`Format`] is a mime-type-like string such as
//! `application/vnd.cyclonedx+json` or `text/spdx+json;version=2.3`. The
//! mime type, encoding and version are derived from the string on demand.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between the mime/encoding segment and the version.
const VERSION_SEPARATOR: &str = ";version=";
/// Separator between the mime type and the encoding.
const ENCODING_SEPARATOR: char = '+';

/// In-toto predicate type for CycloneDX SBOMs.
pub const PREDICATE_CYCLONEDX: &str = "https://cyclonedx.org/bom";
/// In-toto predicate type for SPDX SBOMs.
pub const PREDICATE_SPDX: &str = "https://spdx.dev/Document";
/// In-toto predicate type for SLSA provenance v1.
pub const PREDICATE_SLSA_PROVENANCE_V1: &str = "https://slsa.dev/provenance/v1";
/// In-toto predicate type for SLSA provenance v0.2.
pub const PREDICATE_SLSA_PROVENANCE_V02: &str = "https://slsa.dev/provenance/v0.2";
/// OpenVEX namespace. Predicate types append a `/v<version>` segment.
pub const OPENVEX_CONTEXT: &str = "https://openvex.dev/ns";

/// The format of a security document.
///
/// An empty format means "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Format(String);

/// The parts of a parsed [`Format`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatParts {
    /// Bare mime type, e.g. `text/spdx`.
    pub mime: String,
    /// Version, e.g. `2.3`. Empty when absent.
    pub version: String,
    /// Encoding suffix, e.g. `json`. Empty when absent.
    pub encoding: String,
}

impl Format {
    /// Create a format from any string.
    #[must_use]
    pub fn new(format: impl Into<String>) -> Self {
        Self(format.into())
    }

    /// The unknown format.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this is the unknown format.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The raw format string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the format into mime type, version and encoding.
    #[must_use]
    pub fn parse(&self) -> FormatParts {
        let s = self.0.trim();
        let (head, version) = s.split_once(VERSION_SEPARATOR).unwrap_or((s, ""));
        let (mime, encoding) = head.split_once(ENCODING_SEPARATOR).unwrap_or((head, ""));
        FormatParts {
            mime: mime.to_string(),
            version: version.to_string(),
            encoding: encoding.to_string(),
        }
    }

    /// The mime type part of the format.
    #[must_use]
    pub fn mime_type(&self) -> String {
        self.parse().mime
    }

    /// The version part of the format.
    #[must_use]
    pub fn version(&self) -> String {
        self.parse().version
    }

    /// The encoding part of the format.
    #[must_use]
    pub fn encoding(&self) -> String {
        self.parse().encoding
    }

    /// Map an in-toto predicate type to a format.
    ///
    /// Unrecognized predicate types map to the empty format.
    #[must_use]
    pub fn from_predicate_type(predicate_type: &str) -> Self {
        if let Some(rest) = predicate_type.strip_prefix(OPENVEX_CONTEXT) {
            let version = openvex_version(rest);
            return match version {
                Some("") => Self::new("application/vnd.openvex+json"),
                Some(v) => Self::new(format!("application/vnd.openvex+json{VERSION_SEPARATOR}{v}")),
                None => Self::empty(),
            };
        }

        match predicate_type {
            PREDICATE_CYCLONEDX => Self::new("application/vnd.cyclonedx+json"),
            PREDICATE_SPDX => Self::new("text/spdx+json"),
            PREDICATE_SLSA_PROVENANCE_V1 => Self::new("application/vnd.slsa+json;version=1"),
            PREDICATE_SLSA_PROVENANCE_V02 => Self::new("application/vnd.slsa+json;version=0.2"),
            _ => Self::empty(),
        }
    }
}

/// Extract the version from what follows the OpenVEX namespace.
///
/// `""`, `"/"` -> `Some("")`; `"/v0.2.0"` -> `Some("0.2.0")`; anything that
/// is not a path segment of the namespace -> `None`.
fn openvex_version(rest: &str) -> Option<&str> {
    if rest.is_empty() {
        return Some("");
    }
    let segment = rest.strip_prefix('/')?;
    if segment.contains('/') {
        return None;
    }
    Some(segment.strip_prefix('v').unwrap_or(segment))
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Format {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.trim()))
    }
}

impl From<&str> for Format {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Format {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An allow-list of document formats.
///
/// An empty list accepts every recognized format. Entries are compared by
/// mime type only, so `text/spdx` accepts `text/spdx+json;version=2.3`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatList(Vec<Format>);

impl FormatList {
    /// Create an empty list (accepts everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The document families docprobe knows how to recognize.
    #[must_use]
    pub fn known() -> Self {
        Self(vec![
            Format::new("application/vnd.cyclonedx"),
            Format::new("text/spdx"),
            Format::new("application/vnd.slsa"),
            Format::new("application/vnd.openvex"),
        ])
    }

    /// Whether any entry has the same mime type as `format`.
    #[must_use]
    pub fn has(&self, format: &Format) -> bool {
        let mime = format.mime_type();
        self.0.iter().any(|f| f.mime_type() == mime)
    }

    /// Whether `format` passes this allow-list.
    #[must_use]
    pub fn accepts(&self, format: &Format) -> bool {
        self.0.is_empty() || self.has(format)
    }

    /// Add a format to the list.
    pub fn push(&mut self, format: impl Into<Format>) {
        self.0.push(format.into());
    }

    /// Iterate over the entries.
    pub fn iter(&self) -> impl Iterator<Item = &Format> {
        self.0.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Format> for FormatList {
    fn from_iter<I: IntoIterator<Item = Format>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for FormatList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Format::as_str).collect();
        f.write_str(&names.join(", "))
    }
}
