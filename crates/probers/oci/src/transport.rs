//! Boundary to the registry.
//!
//! The prober only needs two things from a registry: resolving a reference
//! to an image or image index, and listing the attestation envelopes stored
//! for one of those. [`RegistryTransport`] captures exactly that so tests can
//! substitute an in-memory registry.

use std::sync::Arc;

use async_trait::async_trait;
use docprobe_core::Result;
use oci_distribution::Reference;

use crate::attestation::Envelope;
use crate::platform::Platform;

/// A single-platform image manifest.
#[derive(Debug, Clone)]
pub struct Image {
    /// Reference the image was resolved from.
    pub reference: Reference,
    /// Manifest digest.
    pub digest: String,
}

/// A multi-platform image index.
#[derive(Debug, Clone)]
pub struct ImageIndex {
    /// Reference the index was resolved from.
    pub reference: Reference,
    /// Index manifest digest.
    pub digest: String,
    /// The images fronted by the index.
    pub manifests: Vec<IndexEntry>,
}

/// One image listed in an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Manifest digest of the image.
    pub digest: String,
    /// Manifest media type.
    pub media_type: String,
    /// Platform of the image, when the index declares one.
    pub platform: Option<Platform>,
}

/// What a reference resolves to.
#[derive(Debug, Clone)]
pub enum SignedEntity {
    /// A single-platform image.
    Image(Image),
    /// A multi-platform index.
    Index(ImageIndex),
}

impl SignedEntity {
    /// The reference the entity was resolved from.
    #[must_use]
    pub fn reference(&self) -> &Reference {
        match self {
            Self::Image(image) => &image.reference,
            Self::Index(index) => &index.reference,
        }
    }

    /// The manifest digest.
    #[must_use]
    pub fn digest(&self) -> &str {
        match self {
            Self::Image(image) => &image.digest,
            Self::Index(index) => &index.digest,
        }
    }

    /// Whether this is a multi-platform index.
    #[must_use]
    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }
}

/// Registry operations the OCI prober depends on.
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    /// Resolve a reference to the image or index it points at.
    ///
    /// # Errors
    ///
    /// Returns [`docprobe_core::Error::Transport`] if the registry cannot be
    /// reached or the manifest does not exist.
    async fn resolve(&self, reference: &Reference) -> Result<SignedEntity>;

    /// List the attestation envelopes attached to an entity, in registry
    /// order. An entity without attestations yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry fails or an envelope is not valid
    /// JSON.
    async fn fetch_attestations(&self, entity: &SignedEntity) -> Result<Vec<Envelope>>;
}

#[async_trait]
impl<T: RegistryTransport + ?Sized> RegistryTransport for Arc<T> {
    async fn resolve(&self, reference: &Reference) -> Result<SignedEntity> {
        (**self).resolve(reference).await
    }

    async fn fetch_attestations(&self, entity: &SignedEntity) -> Result<Vec<Envelope>> {
        (**self).fetch_attestations(entity).await
    }
}
