//! Probing packages for security documents.
//!
//! - [`PackageProbe`] - Trait implemented by each purl type backend
//! - [`ProbeRegistry`] - Collection of registered probers
//! - [`Probe`] - Entry point: parses a purl, picks the prober and fetches
//!
//! # Example
//!
//! ```ignore
//! use docprobe_core::probe::{Probe, ProbeRegistry};
//!
//! let registry = ProbeRegistry::new();
//! registry.register(OciProber::new(RegistryClient::new(), OciOptions::from_env()));
//!
//! let probe = Probe::new(Arc::new(registry));
//! let docs = probe.fetch("pkg:oci/curl?repository_url=cgr.dev/chainguard").await?;
//! ```

mod provider;
mod registry;

pub use provider::PackageProbe;
pub use registry::ProbeRegistry;

use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::ResultExt;
use crate::options::FetchOptions;
use crate::payload::Document;
use crate::purl::PackageIdentifier;
use crate::{Error, Result};

/// Fetches security documents for package URLs.
#[derive(Debug, Clone)]
pub struct Probe {
    registry: Arc<ProbeRegistry>,
    options: FetchOptions,
}

impl Probe {
    /// Create a probe over a registry, accepting every recognized format.
    #[must_use]
    pub fn new(registry: Arc<ProbeRegistry>) -> Self {
        Self {
            registry,
            options: FetchOptions::default(),
        }
    }

    /// Set the options passed to probers.
    #[must_use]
    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    /// The options passed to probers.
    #[must_use]
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// The prober registry.
    #[must_use]
    pub fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    /// Parse `purl` and retrieve every security document attached to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the purl is malformed, no prober handles its
    /// type, or the prober fails. Errors are never retried here.
    #[instrument(name = "probe_fetch", skip(self))]
    pub async fn fetch(&self, purl: &str) -> Result<Vec<Document>> {
        let identifier = PackageIdentifier::parse(purl).context("validating purl")?;
        self.fetch_identifier(&identifier).await
    }

    /// Retrieve every security document attached to an already parsed
    /// identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if no prober handles the identifier's type or the
    /// prober fails.
    pub async fn fetch_identifier(&self, identifier: &PackageIdentifier) -> Result<Vec<Document>> {
        let scheme = identifier.scheme();
        let probe = self
            .registry
            .get(scheme)
            .ok_or_else(|| Error::unsupported_scheme(scheme))
            .context(format!("getting package probe for purl type {scheme}"))?;

        let docs = probe
            .fetch_documents(&self.options, identifier)
            .await
            .context("fetching documents")?;

        info!(%identifier, count = docs.len(), "Fetched documents");
        Ok(docs)
    }
}
