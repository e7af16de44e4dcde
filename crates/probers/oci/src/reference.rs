//! Translating OCI package URLs into image references.

use docprobe_core::{Error, PackageIdentifier, Result};
use oci_distribution::Reference;
use tracing::debug;

use crate::OCI_SCHEME;
use crate::options::{OciOptions, non_empty};

/// Qualifier naming the registry path of the image.
pub const REPOSITORY_URL_QUALIFIER: &str = "repository_url";
/// Qualifier naming the image tag.
pub const TAG_QUALIFIER: &str = "tag";

/// Build the image reference string for an OCI purl.
///
/// The repository is picked from, in order: the repository override, the
/// `repository_url` qualifier, the default repository. The first one set
/// wins outright; with none set the bare name is used. A version pins the
/// digest (`@version`) and takes precedence over a `tag` qualifier.
///
/// # Errors
///
/// Returns [`Error::InvalidIdentifier`] if the purl is not of type `oci` or
/// has no name.
pub fn reference_string(identifier: &PackageIdentifier, options: &OciOptions) -> Result<String> {
    if identifier.scheme() != OCI_SCHEME {
        return Err(Error::invalid_identifier(
            identifier.to_string(),
            "package URL is not of type oci",
        ));
    }
    let name = identifier.name();
    if name.is_empty() {
        return Err(Error::invalid_identifier(
            identifier.to_string(),
            "package URL has no name",
        ));
    }

    let repository = non_empty(options.repository_override.clone())
        .or_else(|| {
            identifier
                .qualifier(REPOSITORY_URL_QUALIFIER)
                .map(ToString::to_string)
        })
        .or_else(|| non_empty(options.repository.clone()));

    let mut reference = match repository {
        Some(repo) => format!("{}/{}", repo.trim_end_matches('/'), name),
        None => name.to_string(),
    };

    if let Some(version) = identifier.version() {
        reference.push('@');
        reference.push_str(version);
    } else if let Some(tag) = identifier.qualifier(TAG_QUALIFIER) {
        reference.push(':');
        reference.push_str(tag);
    }

    Ok(reference)
}

/// Build and parse the image reference for an OCI purl.
///
/// # Errors
///
/// Returns [`Error::InvalidIdentifier`] for unusable purls and
/// [`Error::InvalidRequest`] if the composed string is not a valid
/// reference.
pub fn resolve_reference(identifier: &PackageIdentifier, options: &OciOptions) -> Result<Reference> {
    let image = reference_string(identifier, options)?;
    let reference = parse_reference(&image)?;
    debug!(%identifier, %reference, "Resolved image reference");
    Ok(reference)
}

/// Parse an image reference string.
pub(crate) fn parse_reference(image: &str) -> Result<Reference> {
    image.parse().map_err(|e: oci_distribution::ParseError| {
        Error::invalid_request(format!("parsing reference {image}: {e}"))
    })
}
