//! Legacy registry usage detection
//!
//! Two stages, short-circuiting:
//! 1. Storage heuristic: a bucket named like legacy registry storage
//! 2. Image listing, only when stage 1 found nothing
//!
//! A failed bucket listing falls through to stage 2. Image listing failures
//! other than the recognized not-found condition yield an `Assumed` negative.

use crate::error::{CollaboratorError, Stage};
use crate::gateway::{bounded, ControlPlaneGateway};
use crate::types::{ProjectId, UsageEvidence};
use std::sync::Arc;
use std::time::Duration;

/// Detects resident legacy registry images
#[derive(Clone)]
pub struct UsageDetector {
    gateway: Arc<dyn ControlPlaneGateway>,
    bucket_prefixes: Arc<[String]>,
    timeout: Duration,
}

impl UsageDetector {
    /// Create new detector
    #[must_use]
    pub fn new(
        gateway: Arc<dyn ControlPlaneGateway>,
        bucket_prefixes: impl Into<Arc<[String]>>,
        timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            bucket_prefixes: bucket_prefixes.into(),
            timeout,
        }
    }

    /// Detect legacy registry usage for `project`
    pub async fn detect_usage(&self, project: &ProjectId) -> UsageEvidence {
        if self.storage_heuristic(project).await {
            tracing::debug!(project = %project, "legacy bucket found");
            return UsageEvidence::storage_hit();
        }
        self.image_listing(project).await
    }

    /// Whether `name` follows a legacy registry bucket convention
    #[must_use]
    pub fn is_legacy_bucket(&self, name: &str) -> bool {
        self.bucket_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }

    async fn storage_heuristic(&self, project: &ProjectId) -> bool {
        match bounded(self.timeout, self.gateway.list_storage_buckets(project)).await {
            Ok(buckets) => buckets.iter().any(|name| self.is_legacy_bucket(name)),
            Err(source) => {
                let err = CollaboratorError::new(Stage::StorageHeuristic, source);
                tracing::warn!(project = %project, error = %err, "falling back to image listing");
                false
            }
        }
    }

    async fn image_listing(&self, project: &ProjectId) -> UsageEvidence {
        match bounded(self.timeout, self.gateway.list_registry_images(project)).await {
            Ok(images) => UsageEvidence::listed(!images.is_empty()),
            Err(source) if source.is_not_found() => UsageEvidence::namespace_absent(),
            Err(source) => {
                let err = CollaboratorError::new(Stage::ImageListing, source);
                tracing::warn!(project = %project, error = %err, "usage assumed absent");
                UsageEvidence::assumed_absent()
            }
        }
    }
}

impl std::fmt::Debug for UsageDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageDetector")
            .field("bucket_prefixes", &self.bucket_prefixes)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LEGACY_BUCKET_PREFIXES;
    use crate::error::GatewayError;
    use crate::gateway::MockControlPlaneGateway;
    use crate::types::{Confidence, UsageSource};

    fn detector(mock: MockControlPlaneGateway) -> UsageDetector {
        let prefixes: Vec<String> = LEGACY_BUCKET_PREFIXES.iter().map(ToString::to_string).collect();
        UsageDetector::new(Arc::new(mock), prefixes, Duration::from_secs(5))
    }

    fn project() -> ProjectId {
        ProjectId::new("proj")
    }

    #[tokio::test]
    async fn storage_hit_skips_image_listing() {
        let mut mock = MockControlPlaneGateway::new();
        mock.expect_list_storage_buckets()
            .times(1)
            .returning(|_| Ok(vec!["logs".to_string(), "eu.artifacts.proj.appspot.com".to_string()]));
        mock.expect_list_registry_images().times(0);

        let usage = detector(mock).detect_usage(&project()).await;
        assert_eq!(usage, UsageEvidence::storage_hit());
    }

    #[tokio::test]
    async fn not_found_is_confirmed_negative() {
        let mut mock = MockControlPlaneGateway::new();
        mock.expect_list_storage_buckets().returning(|_| Ok(Vec::new()));
        mock.expect_list_registry_images()
            .times(1)
            .returning(|_| Err(GatewayError::NotFound("NAME_UNKNOWN".to_string())));

        let usage = detector(mock).detect_usage(&project()).await;
        assert!(!usage.found);
        assert_eq!(usage.source, UsageSource::ImageListing);
        assert_eq!(usage.confidence, Confidence::Confirmed);
    }

    #[tokio::test]
    async fn non_empty_listing_is_found() {
        let mut mock = MockControlPlaneGateway::new();
        mock.expect_list_storage_buckets()
            .returning(|_| Ok(vec!["data-bucket".to_string()]));
        mock.expect_list_registry_images()
            .returning(|_| Ok(vec!["gcr.io/proj/app".to_string()]));

        let usage = detector(mock).detect_usage(&project()).await;
        assert_eq!(usage, UsageEvidence::listed(true));
    }

    #[tokio::test]
    async fn empty_listing_is_confirmed_negative() {
        let mut mock = MockControlPlaneGateway::new();
        mock.expect_list_storage_buckets().returning(|_| Ok(Vec::new()));
        mock.expect_list_registry_images().returning(|_| Ok(Vec::new()));

        let usage = detector(mock).detect_usage(&project()).await;
        assert_eq!(usage, UsageEvidence::listed(false));
        assert!(!usage.is_assumed());
    }

    #[tokio::test]
    async fn unrecognized_failure_is_assumed() {
        let mut mock = MockControlPlaneGateway::new();
        mock.expect_list_storage_buckets().returning(|_| Ok(Vec::new()));
        mock.expect_list_registry_images()
            .returning(|_| Err(GatewayError::Ambiguous("unexpected".to_string())));

        let usage = detector(mock).detect_usage(&project()).await;
        assert_eq!(usage, UsageEvidence::assumed_absent());
        assert_eq!(usage.label(), "No (assumed)");
    }

    #[tokio::test]
    async fn bucket_failure_falls_through_to_listing() {
        let mut mock = MockControlPlaneGateway::new();
        mock.expect_list_storage_buckets()
            .returning(|_| Err(GatewayError::PermissionDenied("storage".to_string())));
        mock.expect_list_registry_images()
            .times(1)
            .returning(|_| Ok(vec!["gcr.io/proj/app".to_string()]));

        let usage = detector(mock).detect_usage(&project()).await;
        assert_eq!(usage, UsageEvidence::listed(true));
    }

    #[test]
    fn bucket_prefix_matching() {
        let detector = detector(MockControlPlaneGateway::new());
        assert!(detector.is_legacy_bucket("us.artifacts.proj.appspot.com"));
        assert!(detector.is_legacy_bucket("asia.artifacts.proj.appspot.com"));
        assert!(!detector.is_legacy_bucket("artifacts-backup"));
        assert!(!detector.is_legacy_bucket("my-us.artifacts"));
    }
}
