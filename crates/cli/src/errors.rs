//! CLI errors with miette diagnostics.

use miette::{Diagnostic, SourceSpan};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the CLI itself. Probe failures are reported through
/// [`docprobe_core::Error`].
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Configuration parsing failed: {message}")]
    #[diagnostic(code(docprobe::cli::config_parse_error))]
    ConfigParse {
        config_file: String,
        message: String,
        #[source_code]
        src: String,
        #[label("error occurred here")]
        error_span: Option<SourceSpan>,
        #[help]
        help_text: Option<String>,
    },

    #[error("File operation failed: {operation} {}", path.display())]
    #[diagnostic(
        code(docprobe::cli::file_error),
        help("Check file permissions and ensure the path exists")
    )]
    File {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Writing output failed")]
    #[diagnostic(code(docprobe::cli::output_error))]
    Output {
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    #[must_use]
    pub fn config_parse(
        config_file: impl Into<String>,
        src: impl Into<String>,
        message: impl Into<String>,
        error_span: Option<SourceSpan>,
    ) -> Self {
        Self::ConfigParse {
            config_file: config_file.into(),
            message: message.into(),
            src: src.into(),
            error_span,
            help_text: Some(
                "Expected `formats = [\"...\"]` and an optional [oci] table".to_string(),
            ),
        }
    }

    #[must_use]
    pub fn file(
        operation: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::File {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn output(source: std::io::Error) -> Self {
        Self::Output { source }
    }
}
