//! OCI registry client for resolving images and reading their attestations.
//!
//! Uses `oci-distribution` for registry operations. Attestations are looked
//! up with the cosign convention: a manifest tagged `<alg>-<hex>.att` next to
//! the image, with one DSSE envelope per layer.

use async_trait::async_trait;
use docprobe_core::{Error, Result};
use oci_distribution::client::{ClientConfig, ClientProtocol};
use oci_distribution::errors::{OciDistributionError, OciErrorCode};
use oci_distribution::manifest::OciManifest;
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::{Client, Reference};
use tracing::{debug, info, trace};

use crate::attestation::{DSSE_ENVELOPE_MEDIA_TYPE, Envelope};
use crate::platform::Platform;
use crate::transport::{Image, ImageIndex, IndexEntry, RegistryTransport, SignedEntity};

/// Tag suffix of attestation manifests.
const ATTESTATION_TAG_SUFFIX: &str = ".att";

/// OCI registry client backed by `oci-distribution`.
pub struct RegistryClient {
    client: Client,
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient").finish_non_exhaustive()
    }
}

impl RegistryClient {
    /// Create a new client speaking HTTPS.
    #[must_use]
    pub fn new() -> Self {
        let config = ClientConfig {
            protocol: ClientProtocol::Https,
            ..Default::default()
        };
        let client = Client::new(config);
        Self { client }
    }

    /// Get authentication for a registry.
    ///
    /// GitHub tokens from the environment are used for ghcr.io; everything
    /// else is pulled anonymously.
    fn get_auth(&self, reference: &Reference) -> RegistryAuth {
        if reference.registry() == "ghcr.io" {
            let token = ["GITHUB_TOKEN", "GH_TOKEN"]
                .iter()
                .find_map(|var| std::env::var(var).ok().filter(|t| !t.is_empty()));
            if let Some(token) = token {
                return RegistryAuth::Basic(String::new(), token);
            }
        }

        RegistryAuth::Anonymous
    }

    async fn pull_manifest(&self, reference: &Reference) -> Result<(OciManifest, String)> {
        let auth = self.get_auth(reference);
        self.client
            .pull_manifest(reference, &auth)
            .await
            .map_err(|e| transport_error(reference, &e))
    }
}

#[async_trait]
impl RegistryTransport for RegistryClient {
    async fn resolve(&self, reference: &Reference) -> Result<SignedEntity> {
        info!(%reference, "Resolving image reference");
        let (manifest, digest) = self.pull_manifest(reference).await?;
        trace!(?manifest, "Got manifest");

        let entity = match manifest {
            OciManifest::Image(_) => SignedEntity::Image(Image {
                reference: reference.clone(),
                digest,
            }),
            OciManifest::ImageIndex(index) => SignedEntity::Index(ImageIndex {
                reference: reference.clone(),
                digest,
                manifests: index
                    .manifests
                    .iter()
                    .map(|m| IndexEntry {
                        digest: m.digest.clone(),
                        media_type: m.media_type.clone(),
                        platform: m.platform.as_ref().map(Platform::from),
                    })
                    .collect(),
            }),
        };

        debug!(%reference, digest = %entity.digest(), index = entity.is_index(), "Resolved image");
        Ok(entity)
    }

    async fn fetch_attestations(&self, entity: &SignedEntity) -> Result<Vec<Envelope>> {
        let base = entity.reference();
        let att_ref = Reference::with_tag(
            base.registry().to_string(),
            base.repository().to_string(),
            attestation_tag(entity.digest()),
        );
        debug!(reference = %att_ref, "Looking up attestations");

        let manifest = match self.pull_manifest(&att_ref).await {
            Ok((manifest, _)) => manifest,
            Err(e) if e.kind() == docprobe_core::ErrorKind::NotFound => {
                debug!(reference = %att_ref, "Image has no attestations");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let OciManifest::Image(manifest) = manifest else {
            return Err(Error::decode(
                "attestation manifest",
                format!("{att_ref} is an index, expected an image manifest"),
            ));
        };

        let mut envelopes = Vec::new();
        for layer in &manifest.layers {
            if layer.media_type != DSSE_ENVELOPE_MEDIA_TYPE {
                trace!(media_type = %layer.media_type, "Skipping non DSSE layer");
                continue;
            }

            // Reuses the token stored by pull_manifest for this repository.
            let mut body = Vec::new();
            self.client
                .pull_blob(&att_ref, layer, &mut body)
                .await
                .map_err(|e| transport_error(&att_ref, &e))?;

            let envelope: Envelope = serde_json::from_slice(&body).map_err(|e| {
                Error::decode(format!("DSSE envelope {}", layer.digest), e.to_string())
            })?;
            envelopes.push(envelope);
        }

        debug!(count = envelopes.len(), "Fetched attestation envelopes");
        Ok(envelopes)
    }
}

/// Tag of the attestation manifest for a digest (`sha256:ab` -> `sha256-ab.att`).
fn attestation_tag(digest: &str) -> String {
    format!("{}{ATTESTATION_TAG_SUFFIX}", digest.replace(':', "-"))
}

fn is_not_found(err: &OciDistributionError) -> bool {
    match err {
        OciDistributionError::ImageManifestNotFoundError(_) => true,
        OciDistributionError::ServerError { code, .. } => *code == 404,
        OciDistributionError::RegistryError { envelope, .. } => envelope
            .errors
            .iter()
            .any(|e| matches!(e.code, OciErrorCode::ManifestUnknown | OciErrorCode::NameUnknown)),
        _ => false,
    }
}

fn transport_error(reference: &Reference, err: &OciDistributionError) -> Error {
    if is_not_found(err) {
        Error::not_found(format!("{reference}: {err}"))
    } else {
        Error::transport(format!("contacting registry for {reference}"), err.to_string())
    }
}
