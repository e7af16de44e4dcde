//! OCI prober options.

use docprobe_core::Result;
use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// Environment variable that forces the repository attestations are read
/// from, as understood by cosign.
pub const REPOSITORY_OVERRIDE_ENV: &str = "COSIGN_REPOSITORY";

/// Options for the OCI prober.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct OciOptions {
    /// Platform to select from multi-arch images (`os/arch[/variant]`).
    pub platform: Option<String>,
    /// Registry path used when the purl has no `repository_url`.
    pub repository: Option<String>,
    /// Registry path that replaces any other repository setting.
    pub repository_override: Option<String>,
}

impl OciOptions {
    /// Create empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with the repository override taken from `COSIGN_REPOSITORY`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            repository_override: std::env::var(REPOSITORY_OVERRIDE_ENV)
                .ok()
                .filter(|v| !v.is_empty()),
            ..Self::default()
        }
    }

    /// Set the platform filter.
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Set the default repository.
    #[must_use]
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    /// Set the repository override.
    #[must_use]
    pub fn with_repository_override(mut self, repository: impl Into<String>) -> Self {
        self.repository_override = Some(repository.into());
        self
    }

    /// Fill unset fields from `other`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self {
            platform: non_empty(self.platform).or(other.platform),
            repository: non_empty(self.repository).or(other.repository),
            repository_override: non_empty(self.repository_override)
                .or(other.repository_override),
        }
    }

    /// The parsed platform filter. Unset means "no filter".
    ///
    /// # Errors
    ///
    /// Returns an error if the platform string is malformed.
    pub fn platform_spec(&self) -> Result<Platform> {
        self.platform.as_deref().map_or_else(|| Ok(Platform::default()), Platform::parse)
    }
}

/// Treat empty strings as unset.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
