//! Platform specs and multi-arch image selection.
//!
//! Platform strings follow the registry convention
//! `os[/arch[/variant]][:osversion]`, e.g. "linux/arm64/v8" or
//! "windows/amd64:10.0.17763". Empty fields act as wildcards when matching.

use docprobe_core::error::ResultExt;
use docprobe_core::{Error, Result};
use oci_distribution::Reference;
use std::fmt;
use tracing::{debug, instrument};

use crate::transport::{IndexEntry, RegistryTransport, SignedEntity};

/// OS family whose OS versions may match on a shorter prefix.
const WINDOWS: &str = "windows";

/// A platform spec. Empty fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Platform {
    /// Operating system (linux, darwin, windows).
    pub os: String,
    /// Architecture (amd64, arm64, ...).
    pub architecture: String,
    /// Architecture variant (v7, v8, ...).
    pub variant: String,
    /// Operating system version.
    pub os_version: String,
}

impl Platform {
    /// Create a platform from OS and architecture.
    #[must_use]
    pub fn new(os: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            architecture: architecture.into(),
            ..Self::default()
        }
    }

    /// Set the variant.
    #[must_use]
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = variant.into();
        self
    }

    /// Set the OS version.
    #[must_use]
    pub fn with_os_version(mut self, os_version: impl Into<String>) -> Self {
        self.os_version = os_version.into();
        self
    }

    /// Parse `os[/arch[/variant]][:osversion]`. The empty string parses to
    /// the empty spec.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the string has more than three
    /// path segments.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (path, os_version) = s.split_once(':').unwrap_or((s, ""));
        let parts: Vec<&str> = if path.is_empty() {
            Vec::new()
        } else {
            path.split('/').collect()
        };
        if parts.len() > 3 {
            return Err(Error::invalid_request(format!(
                "parsing platform '{s}': too many segments, expected os/arch[/variant]"
            )));
        }

        let part = |i: usize| parts.get(i).copied().unwrap_or_default().to_string();
        Ok(Self {
            os: part(0),
            architecture: part(1),
            variant: part(2),
            os_version: os_version.to_string(),
        })
    }

    /// Whether every field is a wildcard.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.os.is_empty()
            && self.architecture.is_empty()
            && self.variant.is_empty()
            && self.os_version.is_empty()
    }

    /// Whether `candidate` satisfies this spec.
    ///
    /// Every non-empty field must equal the candidate's. For Windows a
    /// `major.minor.build` OS version also matches a candidate
    /// `major.minor.build.revision`.
    #[must_use]
    pub fn matches(&self, candidate: &Self) -> bool {
        if !self.os.is_empty() && self.os != candidate.os {
            return false;
        }
        if !self.architecture.is_empty() && self.architecture != candidate.architecture {
            return false;
        }
        if !self.variant.is_empty() && self.variant != candidate.variant {
            return false;
        }
        if !self.os_version.is_empty() && self.os_version != candidate.os_version {
            return self.os == WINDOWS && windows_build_matches(&self.os_version, &candidate.os_version);
        }
        true
    }
}

fn windows_build_matches(target: &str, candidate: &str) -> bool {
    if target.matches('.').count() != 2 || candidate.matches('.').count() != 3 {
        return false;
    }
    candidate
        .rsplit_once('.')
        .is_some_and(|(prefix, _)| prefix == target)
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.os)?;
        if !self.architecture.is_empty() {
            write!(f, "/{}", self.architecture)?;
        }
        if !self.variant.is_empty() {
            write!(f, "/{}", self.variant)?;
        }
        if !self.os_version.is_empty() {
            write!(f, ":{}", self.os_version)?;
        }
        Ok(())
    }
}

impl From<&oci_distribution::manifest::Platform> for Platform {
    fn from(p: &oci_distribution::manifest::Platform) -> Self {
        Self {
            os: p.os.clone(),
            architecture: p.architecture.clone(),
            variant: p.variant.clone().unwrap_or_default(),
            os_version: p.os_version.clone().unwrap_or_default(),
        }
    }
}

/// Index entries whose platform satisfies `target`. Entries without a
/// platform never match.
#[must_use]
pub fn match_platforms<'a>(target: &Platform, manifests: &'a [IndexEntry]) -> Vec<&'a IndexEntry> {
    manifests
        .iter()
        .filter(|m| m.platform.as_ref().is_some_and(|p| target.matches(p)))
        .collect()
}

/// Narrow a resolved entity to the single image matching `target`.
///
/// An empty spec returns the entity untouched. Otherwise the entity must be
/// a multi-arch index and exactly one of its images must match; that image
/// is resolved through the transport and returned.
///
/// # Errors
///
/// - [`Error::InvalidRequest`] if a platform is given for a single-arch image
/// - [`Error::NotFound`] if no image matches
/// - [`Error::AmbiguousPlatform`] if several images match
#[instrument(skip(transport, entity), fields(reference = %entity.reference()))]
pub async fn select_platform<T>(
    transport: &T,
    entity: SignedEntity,
    target: &Platform,
) -> Result<SignedEntity>
where
    T: RegistryTransport + ?Sized,
{
    if target.is_empty() {
        return Ok(entity);
    }

    let SignedEntity::Index(index) = entity else {
        return Err(Error::invalid_request(format!(
            "platform {target} was requested but the reference is not a multi-arch image"
        )));
    };

    let matches = match_platforms(target, &index.manifests);
    let selected = match matches.as_slice() {
        [] => {
            return Err(Error::not_found(format!(
                "no image for platform {target} in {}",
                index.reference
            )));
        }
        [only] => *only,
        several => {
            let candidates: Vec<String> = several
                .iter()
                .filter_map(|m| m.platform.as_ref().map(ToString::to_string))
                .collect();
            return Err(Error::ambiguous_platform(
                target.to_string(),
                candidates.join(", "),
            ));
        }
    };

    debug!(%target, digest = %selected.digest, "Selected platform image");
    let image_ref = Reference::with_digest(
        index.reference.registry().to_string(),
        index.reference.repository().to_string(),
        selected.digest.clone(),
    );
    transport
        .resolve(&image_ref)
        .await
        .context(format!("resolving image {}", selected.digest))
}
