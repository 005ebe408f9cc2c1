//! Scan configuration
//!
//! An immutable value handed to the orchestrator; nothing in the core reads
//! ambient state.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Legacy container registry API
pub const LEGACY_REGISTRY_API: &str = "containerregistry.googleapis.com";

/// Next-gen artifact registry API
pub const NEXT_GEN_REGISTRY_API: &str = "artifactregistry.googleapis.com";

/// Bucket name prefixes used by the legacy registry
pub const LEGACY_BUCKET_PREFIXES: [&str; 4] =
    ["gcr.io", "eu.artifacts", "us.artifacts", "asia.artifacts"];

/// Scan configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Worker pool width
    pub concurrency: usize,
    /// Deadline for each gateway call, in seconds
    pub call_timeout_secs: u64,
    /// API whose enablement marks the legacy registry
    pub legacy_api: String,
    /// API whose enablement marks the next-gen registry
    pub next_gen_api: String,
    /// Bucket name prefixes that indicate legacy registry storage
    pub legacy_bucket_prefixes: Vec<String>,
    /// Skip usage detection when the legacy API is confirmed disabled
    pub skip_usage_when_legacy_disabled: bool,
}

impl ScanConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With worker pool width
    #[inline]
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// With per-call timeout
    #[inline]
    #[must_use]
    pub fn with_call_timeout_secs(mut self, secs: u64) -> Self {
        self.call_timeout_secs = secs;
        self
    }

    /// With bucket prefixes
    #[must_use]
    pub fn with_legacy_bucket_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.legacy_bucket_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// With usage detection gated on legacy API enablement
    #[inline]
    #[must_use]
    pub fn with_skip_usage_when_legacy_disabled(mut self, skip: bool) -> Self {
        self.skip_usage_when_legacy_disabled = skip;
        self
    }

    /// Per-call deadline
    #[inline]
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Check settings before any external call is made
    ///
    /// # Errors
    /// `ConfigurationError` for a zero pool width, zero timeout or blank API name
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.concurrency == 0 {
            return Err(ConfigurationError::InvalidConcurrency);
        }
        if self.call_timeout_secs == 0 {
            return Err(ConfigurationError::InvalidTimeout);
        }
        if self.legacy_api.trim().is_empty() {
            return Err(ConfigurationError::EmptyApiName("legacy registry"));
        }
        if self.next_gen_api.trim().is_empty() {
            return Err(ConfigurationError::EmptyApiName("next-gen registry"));
        }
        Ok(())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            call_timeout_secs: 60,
            legacy_api: LEGACY_REGISTRY_API.to_string(),
            next_gen_api: NEXT_GEN_REGISTRY_API.to_string(),
            legacy_bucket_prefixes: LEGACY_BUCKET_PREFIXES
                .iter()
                .map(ToString::to_string)
                .collect(),
            skip_usage_when_legacy_disabled: false,
        }
    }
}
