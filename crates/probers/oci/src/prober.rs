//! The `oci` package prober.

use async_trait::async_trait;
use docprobe_core::error::ResultExt;
use docprobe_core::{Document, FetchOptions, PackageIdentifier, PackageProbe, Result};
use tracing::{info, instrument};

use crate::OCI_SCHEME;
use crate::attestation::filter_attestations;
use crate::options::OciOptions;
use crate::platform::select_platform;
use crate::reference::resolve_reference;
use crate::registry::RegistryClient;
use crate::transport::RegistryTransport;

/// Finds documents attested to container images.
///
/// The purl is translated to an image reference, resolved (narrowed to one
/// platform when requested) and the in-toto attestations attached to it are
/// turned into documents.
#[derive(Debug)]
pub struct OciProber<T = RegistryClient> {
    transport: T,
    options: OciOptions,
}

impl OciProber<RegistryClient> {
    /// A prober talking to real registries, configured from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(RegistryClient::new(), OciOptions::from_env())
    }
}

impl<T: RegistryTransport> OciProber<T> {
    /// Create a prober over `transport`.
    #[must_use]
    pub fn new(transport: T, options: OciOptions) -> Self {
        Self { transport, options }
    }

    /// The prober's options.
    #[must_use]
    pub fn options(&self) -> &OciOptions {
        &self.options
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: OciOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl<T: RegistryTransport> PackageProbe for OciProber<T> {
    fn scheme(&self) -> &'static str {
        OCI_SCHEME
    }

    fn description(&self) -> &'static str {
        "Reads SBOM, VEX and provenance attestations attached to OCI images"
    }

    #[instrument(name = "oci_fetch", skip_all, fields(purl = %identifier))]
    async fn fetch_documents(
        &self,
        options: &FetchOptions,
        identifier: &PackageIdentifier,
    ) -> Result<Vec<Document>> {
        let platform = self.options.platform_spec().context("verifying options")?;

        let reference = resolve_reference(identifier, &self.options)
            .context("translating purl to image reference")?;

        let entity = self
            .transport
            .resolve(&reference)
            .await
            .context("resolving image reference")?;

        let entity = select_platform(&self.transport, entity, &platform)
            .await
            .context("selecting image platform")?;

        let envelopes = self
            .transport
            .fetch_attestations(&entity)
            .await
            .context("fetching attestations")?;

        let docs = filter_attestations(envelopes, &options.formats)
            .context("downloading documents from registry")?;

        info!(
            reference = %entity.reference(),
            documents = docs.len(),
            "Fetched image documents"
        );
        Ok(docs)
    }
}
