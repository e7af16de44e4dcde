//! Core types for docprobe.
//!
//! docprobe finds the security documents (SBOMs, VEX statements, provenance)
//! attached to a software artifact named by a package URL. This crate holds
//! the parts every package type shares:
//!
//! - [`payload`] - The [`Document`] container and document [`Format`]s
//! - [`purl`] - Parsed package identifiers
//! - [`probe`] - The prober trait, the registry and the [`Probe`] entry point
//! - [`options`] - Options passed to every prober
//!
//! Package types are implemented in their own crates (e.g. `docprobe-oci`)
//! and registered with a [`ProbeRegistry`] at startup.

pub mod error;
pub mod options;
pub mod payload;
pub mod probe;
pub mod purl;

pub use error::{Error, ErrorKind, Result, ResultExt};
pub use options::FetchOptions;
pub use payload::{Document, Format, FormatList};
pub use probe::{PackageProbe, Probe, ProbeRegistry};
pub use purl::PackageIdentifier;
