//! OCI image prober for docprobe.
//!
//! This crate handles `pkg:oci/...` package URLs:
//! - Translates the purl into an image reference (`repository_url`, `tag`
//!   and the digest version)
//! - Resolves the reference and narrows multi-arch indexes to one platform
//! - Reads the in-toto attestations attached to the image and returns their
//!   predicates as documents
//!
//! # Example
//!
//! ```ignore
//! use docprobe_core::{Probe, ProbeRegistry};
//! use docprobe_oci::OciProber;
//!
//! let registry = ProbeRegistry::new();
//! registry.register(OciProber::from_env());
//!
//! let probe = Probe::new(std::sync::Arc::new(registry));
//! let docs = probe
//!     .fetch("pkg:oci/curl?repository_url=cgr.dev/chainguard&tag=latest")
//!     .await?;
//! ```

#![warn(missing_docs)]

pub mod attestation;
mod options;
pub mod platform;
mod prober;
pub mod reference;
mod registry;
pub mod transport;

pub use attestation::{Envelope, Statement, filter_attestations};
pub use options::{OciOptions, REPOSITORY_OVERRIDE_ENV};
pub use platform::{Platform, select_platform};
pub use prober::OciProber;
pub use reference::resolve_reference;
pub use registry::RegistryClient;
pub use transport::{RegistryTransport, SignedEntity};

/// Package URL type handled by this crate.
pub const OCI_SCHEME: &str = "oci";
