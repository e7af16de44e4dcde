//! Security document payloads and their formats.

mod document;
mod format;

pub use document::{Document, MAX_IN_MEMORY_SIZE};
pub use format::{
    Format, FormatList, FormatParts, OPENVEX_CONTEXT, PREDICATE_CYCLONEDX,
    PREDICATE_SLSA_PROVENANCE_V1, PREDICATE_SLSA_PROVENANCE_V02, PREDICATE_SPDX,
};
