//! Options shared by every package prober.

use serde::{Deserialize, Serialize};

use crate::payload::{Format, FormatList};

/// Options passed to a prober on every fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    /// Document formats the caller wants. Documents in other formats are
    /// skipped. An empty list accepts every recognized format.
    pub formats: FormatList,
}

impl FetchOptions {
    /// Create options that accept every recognized format.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the accepted formats.
    #[must_use]
    pub fn with_formats(mut self, formats: FormatList) -> Self {
        self.formats = formats;
        self
    }

    /// Add one accepted format.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<Format>) -> Self {
        self.formats.push(format);
        self
    }
}
