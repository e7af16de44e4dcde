//! Configuration file support.
//!
//! ```toml
//! formats = ["text/spdx+json", "application/vnd.cyclonedx+json"]
//!
//! [oci]
//! platform = "linux/amd64"
//! repository = "cgr.dev/chainguard"
//! ```

use std::path::Path;

use docprobe_core::FormatList;
use docprobe_oci::OciOptions;
use serde::Deserialize;
use tracing::debug;

use crate::errors::CliError;

/// Settings read from a docprobe TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Document formats to keep.
    pub formats: FormatList,
    /// OCI prober settings.
    pub oci: OciOptions,
}

impl Config {
    /// Parse a config from TOML text. `origin` names the source in errors.
    pub fn parse(origin: &str, src: &str) -> Result<Self, CliError> {
        toml::from_str(src).map_err(|e| {
            let span = e.span().map(|range| (range.start, range.len()).into());
            CliError::config_parse(origin, src, e.message(), span)
        })
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let src = std::fs::read_to_string(path)
            .map_err(|e| CliError::file("reading config", path, e))?;
        let config = Self::parse(&path.display().to_string(), &src)?;
        debug!(path = %path.display(), formats = %config.formats, "Loaded config file");
        Ok(config)
    }

    /// Load `path` if given, otherwise use the defaults.
    pub fn load_optional(path: Option<&Path>) -> Result<Self, CliError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }
}
