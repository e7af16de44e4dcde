//! Package prober trait.
//!
//! Each purl type that docprobe understands is handled by a
//! [`PackageProbe`]. Probers are registered with the
//! [`ProbeRegistry`](super::ProbeRegistry) and selected by the identifier's
//! scheme.

use async_trait::async_trait;

use crate::Result;
use crate::options::FetchOptions;
use crate::payload::Document;
use crate::purl::PackageIdentifier;

/// Trait for package probers (OCI images, ...).
///
/// # Example
///
/// ```ignore
/// pub struct OciProber { /* ... */ }
///
/// #[async_trait]
/// impl PackageProbe for OciProber {
///     fn scheme(&self) -> &'static str { "oci" }
///     fn description(&self) -> &'static str { "Attestations attached to OCI images" }
///     // ...
/// }
/// ```
#[async_trait]
pub trait PackageProbe: Send + Sync {
    /// The purl type this prober handles (e.g. "oci").
    fn scheme(&self) -> &'static str;

    /// Human-readable description for help text.
    fn description(&self) -> &'static str;

    /// Retrieve every security document attached to the package.
    ///
    /// Documents are returned in the order the backend discovered them.
    /// Attachments that are not recognized, or not in `options.formats`,
    /// are skipped rather than reported as errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier cannot be resolved or the backend
    /// fails.
    async fn fetch_documents(
        &self,
        options: &FetchOptions,
        identifier: &PackageIdentifier,
    ) -> Result<Vec<Document>>;
}
