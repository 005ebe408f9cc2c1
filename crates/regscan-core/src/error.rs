//! Error types for regscan Core
//!
//! Only two failures ever abort a run:
//! - Invalid scope or configuration, reported before any external call
//! - Project enumeration failures, since a partial roster is worse than none
//!
//! Everything else is absorbed per project and recorded as an `Unknown` or
//! `Assumed` signal in the affected row.

use std::fmt;
use std::time::Duration;

/// Errors returned by a scan run
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Invalid scope selection or configuration
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Control plane failure during enumeration
    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),
}

impl ScanError {
    /// Check if the run failed before touching the control plane
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Invalid or missing scope selection or scan settings
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// No scope was selected
    #[error("no scan scope selected; supply exactly one organization, folder or project")]
    NoScope,

    /// More than one scope was selected
    #[error("conflicting scope selection: {}", .0.join(", "))]
    ConflictingScopes(Vec<&'static str>),

    /// A selected identifier is blank
    #[error("{0} identifier must not be empty")]
    EmptyIdentifier(&'static str),

    /// Worker pool width of zero
    #[error("concurrency must be at least 1")]
    InvalidConcurrency,

    /// Per-call timeout of zero
    #[error("call timeout must be at least 1 second")]
    InvalidTimeout,

    /// An API name to probe is blank
    #[error("{0} API name must not be empty")]
    EmptyApiName(&'static str),
}

/// Typed failure from a control plane call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Registry namespace (or other resource) does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller lacks permission
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Call exceeded its deadline
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Response could not be decoded
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Control plane could not be reached
    #[error("control plane unavailable: {0}")]
    Unavailable(String),

    /// Call failed in a way that matches no recognized pattern
    #[error("ambiguous response: {0}")]
    Ambiguous(String),
}

impl GatewayError {
    /// Check if this is the recognized not-found condition
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if a retry could plausibly succeed
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unavailable(_))
    }
}

/// Pipeline stage a gateway call belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Project enumeration
    Enumeration,
    /// Enabled-API listing
    ApiProbe,
    /// Storage bucket listing
    StorageHeuristic,
    /// Legacy registry image listing
    ImageListing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enumeration => "project enumeration",
            Self::ApiProbe => "API probe",
            Self::StorageHeuristic => "storage bucket listing",
            Self::ImageListing => "image listing",
        })
    }
}

/// Gateway failure attributed to a pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{stage} failed: {source}")]
pub struct CollaboratorError {
    /// Stage that issued the call
    pub stage: Stage,
    /// Underlying gateway failure
    pub source: GatewayError,
}

impl CollaboratorError {
    /// Attribute a gateway failure to a stage
    #[inline]
    #[must_use]
    pub fn new(stage: Stage, source: GatewayError) -> Self {
        Self { stage, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn configuration_error_display() {
        let err = ConfigurationError::ConflictingScopes(vec!["organization", "folder"]);
        assert_eq!(
            err.to_string(),
            "conflicting scope selection: organization, folder"
        );
    }

    #[test]
    fn scan_error_wraps_configuration() {
        let err = ScanError::from(ConfigurationError::NoScope);
        assert!(err.is_configuration());
        assert!(err.to_string().contains("configuration error"));
    }

    #[test]
    fn collaborator_error_exposes_source() {
        let err = CollaboratorError::new(
            Stage::Enumeration,
            GatewayError::Unavailable("connection refused".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "project enumeration failed: control plane unavailable: connection refused"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn gateway_error_classification() {
        assert!(GatewayError::NotFound("x".to_string()).is_not_found());
        assert!(!GatewayError::Ambiguous("x".to_string()).is_not_found());
        assert!(GatewayError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!GatewayError::PermissionDenied("x".to_string()).is_transient());
    }
}
