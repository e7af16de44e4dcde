//! Error types shared by docprobe and its package probers.

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Result type for docprobe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`], independent of how many context
/// layers wrap it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The package identifier is malformed or not usable by the prober.
    InvalidIdentifier,
    /// No prober is registered for the identifier's scheme.
    UnsupportedScheme,
    /// The combination of identifier and options makes no sense.
    InvalidRequest,
    /// Nothing matched the request.
    NotFound,
    /// More than one platform matched the request.
    AmbiguousPlatform,
    /// The registry transport failed.
    Transport,
    /// An envelope or statement could not be decoded.
    Decode,
    /// Document buffering or filesystem failure.
    Io,
}

/// Errors that can occur while probing a package for documents.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The package identifier could not be parsed or used.
    #[error("Invalid package identifier '{identifier}': {message}")]
    #[diagnostic(
        code(docprobe::invalid_identifier),
        help("Package identifiers look like pkg:oci/curl?repository_url=cgr.dev/chainguard")
    )]
    InvalidIdentifier {
        /// The offending identifier.
        identifier: String,
        /// Why it was rejected.
        message: String,
    },

    /// No prober handles this scheme.
    #[error("Package type '{scheme}' is not supported")]
    #[diagnostic(code(docprobe::unsupported_scheme))]
    UnsupportedScheme {
        /// The purl type that has no prober.
        scheme: String,
    },

    /// Semantically invalid request.
    #[error("Invalid request: {message}")]
    #[diagnostic(code(docprobe::invalid_request))]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },

    /// Nothing matched.
    #[error("Not found: {message}")]
    #[diagnostic(code(docprobe::not_found))]
    NotFound {
        /// Description of what was missing.
        message: String,
    },

    /// A platform filter matched more than one image.
    #[error("Platform spec '{platform}' matches more than one image: {candidates}")]
    #[diagnostic(
        code(docprobe::ambiguous_platform),
        help("Add an architecture or variant to the platform to narrow the match")
    )]
    AmbiguousPlatform {
        /// The requested platform.
        platform: String,
        /// Comma separated list of matching platforms.
        candidates: String,
    },

    /// The registry transport returned an error.
    #[error("Transport error while {operation}: {message}")]
    #[diagnostic(code(docprobe::transport))]
    Transport {
        /// What was being attempted.
        operation: String,
        /// Message reported by the transport.
        message: String,
    },

    /// An envelope or statement was malformed.
    #[error("Failed to decode {what}: {message}")]
    #[diagnostic(code(docprobe::decode))]
    Decode {
        /// What was being decoded.
        what: String,
        /// Decoder message.
        message: String,
    },

    /// I/O error while buffering a document.
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(docprobe::io),
        help("Check that the temporary directory is writable")
    )]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Path involved, if any.
        path: Option<Box<Path>>,
        /// Operation that failed (e.g. "read", "spill").
        operation: String,
    },

    /// An error from a lower layer, annotated with the operation that failed.
    #[error("{operation}")]
    #[diagnostic(code(docprobe::context))]
    Context {
        /// The operation that failed.
        operation: String,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an invalid identifier error.
    #[must_use]
    pub fn invalid_identifier(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported scheme error.
    #[must_use]
    pub fn unsupported_scheme(scheme: impl Into<String>) -> Self {
        Self::UnsupportedScheme {
            scheme: scheme.into(),
        }
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an ambiguous platform error.
    #[must_use]
    pub fn ambiguous_platform(platform: impl Into<String>, candidates: impl Into<String>) -> Self {
        Self::AmbiguousPlatform {
            platform: platform.into(),
            candidates: candidates.into(),
        }
    }

    /// Create a transport error.
    #[must_use]
    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a decode error.
    #[must_use]
    pub fn decode(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with path context.
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context.
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }

    /// Wrap this error with the name of the operation that failed.
    #[must_use]
    pub fn context(self, operation: impl Into<String>) -> Self {
        Self::Context {
            operation: operation.into(),
            source: Box::new(self),
        }
    }

    /// The kind of the innermost error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidIdentifier { .. } => ErrorKind::InvalidIdentifier,
            Self::UnsupportedScheme { .. } => ErrorKind::UnsupportedScheme,
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AmbiguousPlatform { .. } => ErrorKind::AmbiguousPlatform,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Io { .. } => ErrorKind::Io,
            Self::Context { source, .. } => source.kind(),
        }
    }
}

/// Adds operation context to fallible results.
pub trait ResultExt<T> {
    /// Wrap the error, if any, with the name of the failed operation.
    fn context(self, operation: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, operation: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(operation))
    }
}
