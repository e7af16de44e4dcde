//! Package identifiers.
//!
//! Wraps the `packageurl` parser and keeps an owned, immutable copy of the
//! parts docprobe needs.

use packageurl::PackageUrl;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A parsed package URL (`pkg:type/namespace/name@version?qualifiers#subpath`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageIdentifier {
    scheme: String,
    namespace: Option<String>,
    name: String,
    version: Option<String>,
    qualifiers: BTreeMap<String, String>,
    subpath: Option<String>,
}

impl PackageIdentifier {
    /// Build an identifier from its scheme and name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] if either part is empty.
    pub fn new(scheme: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let scheme = scheme.into();
        let name = name.into();
        if scheme.is_empty() {
            return Err(Error::invalid_identifier(&name, "package type is empty"));
        }
        if name.is_empty() {
            return Err(Error::invalid_identifier(&scheme, "package name is empty"));
        }
        Ok(Self {
            scheme,
            namespace: None,
            name,
            version: None,
            qualifiers: BTreeMap::new(),
            subpath: None,
        })
    }

    /// Parse a package URL string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] if the string is not a valid
    /// package URL or its type or name is empty.
    pub fn parse(purl: &str) -> Result<Self> {
        let parsed = PackageUrl::from_str(purl)
            .map_err(|e| Error::invalid_identifier(purl, e.to_string()))?;

        if parsed.ty().is_empty() {
            return Err(Error::invalid_identifier(purl, "package type is empty"));
        }
        if parsed.name().is_empty() {
            return Err(Error::invalid_identifier(purl, "package name is empty"));
        }

        Ok(Self {
            scheme: parsed.ty().to_string(),
            namespace: parsed.namespace().map(ToString::to_string),
            name: parsed.name().to_string(),
            version: parsed
                .version()
                .filter(|v| !v.is_empty())
                .map(ToString::to_string),
            qualifiers: parsed
                .qualifiers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            subpath: parsed.subpath().map(ToString::to_string),
        })
    }

    /// Set the version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        self.version = (!version.is_empty()).then_some(version);
        self
    }

    /// Set the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Add a qualifier.
    #[must_use]
    pub fn with_qualifier(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.qualifiers.insert(key.into(), value.into());
        self
    }

    /// The package type (`oci`, `npm`, ...).
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The namespace, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The package name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The version, if any. Never empty.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Look up a qualifier.
    #[must_use]
    pub fn qualifier(&self, key: &str) -> Option<&str> {
        self.qualifiers.get(key).map(String::as_str)
    }

    /// All qualifiers.
    #[must_use]
    pub fn qualifiers(&self) -> &BTreeMap<String, String> {
        &self.qualifiers
    }

    /// The subpath, if any.
    #[must_use]
    pub fn subpath(&self) -> Option<&str> {
        self.subpath.as_deref()
    }
}

impl FromStr for PackageIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PackageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkg:{}/", self.scheme)?;
        if let Some(namespace) = &self.namespace {
            write!(f, "{namespace}/")?;
        }
        f.write_str(&self.name)?;
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        let mut sep = '?';
        for (key, value) in &self.qualifiers {
            write!(f, "{sep}{key}={value}")?;
            sep = '&';
        }
        if let Some(subpath) = &self.subpath {
            write!(f, "#{subpath}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_parse_oci_purl_with_qualifiers() {
        let id = PackageIdentifier::parse(
            "pkg:oci/curl@sha256%3A2f3c?repository_url=cgr.dev/chainguard&tag=latest",
        )
        .unwrap();
        assert_eq!(id.scheme(), "oci");
        assert_eq!(id.name(), "curl");
        assert_eq!(id.version(), Some("sha256:2f3c"));
        assert_eq!(id.qualifier("repository_url"), Some("cgr.dev/chainguard"));
        assert_eq!(id.qualifier("tag"), Some("latest"));
        assert_eq!(id.qualifier("arch"), None);
    }

    #[test]
    fn test_parse_with_namespace_and_subpath() {
        let id = PackageIdentifier::parse("pkg:npm/%40angular/core@16.0.0#packages/core").unwrap();
        assert_eq!(id.scheme(), "npm");
        assert_eq!(id.namespace(), Some("@angular"));
        assert_eq!(id.name(), "core");
        assert_eq!(id.subpath(), Some("packages/core"));
    }

    #[test]
    fn test_parse_invalid() {
        for input in ["", "curl", "oci/curl", "pkg:"] {
            let err = PackageIdentifier::parse(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidIdentifier, "{input}");
        }
    }

    #[test]
    fn test_new_rejects_empty_parts() {
        assert!(PackageIdentifier::new("", "curl").is_err());
        assert!(PackageIdentifier::new("oci", "").is_err());
    }

    #[test]
    fn test_builder() {
        let id = PackageIdentifier::new("oci", "curl")
            .unwrap()
            .with_version("sha256:abcd")
            .with_qualifier("tag", "latest");
        assert_eq!(id.version(), Some("sha256:abcd"));
        assert_eq!(id.qualifier("tag"), Some("latest"));

        let id = id.with_version("");
        assert_eq!(id.version(), None);
    }

    #[test]
    fn test_display() {
        let id = PackageIdentifier::new("oci", "curl")
            .unwrap()
            .with_qualifier("tag", "latest")
            .with_qualifier("repository_url", "cgr.dev/chainguard");
        assert_eq!(
            id.to_string(),
            "pkg:oci/curl?repository_url=cgr.dev/chainguard&tag=latest"
        );
    }
}
