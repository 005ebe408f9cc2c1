//! Control plane gateway seam
//!
//! The four read-only queries the engine needs. Implementations own the
//! transport and authentication; the core only sees typed results.

use crate::error::GatewayError;
use crate::types::{ProjectId, Scope};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Read-only access to the cloud control plane
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ControlPlaneGateway: Send + Sync {
    /// Projects directly under `scope`, in control plane order
    async fn list_projects(&self, scope: &Scope) -> Result<Vec<ProjectId>, GatewayError>;

    /// Names of the APIs enabled on `project`
    async fn list_enabled_apis(&self, project: &ProjectId) -> Result<Vec<String>, GatewayError>;

    /// Names of the storage buckets owned by `project`
    async fn list_storage_buckets(&self, project: &ProjectId)
        -> Result<Vec<String>, GatewayError>;

    /// Images held by the legacy registry for `project`
    ///
    /// # Errors
    /// `GatewayError::NotFound` when the project has no registry namespace
    async fn list_registry_images(&self, project: &ProjectId)
        -> Result<Vec<String>, GatewayError>;
}

/// Run a gateway call under a deadline
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(limit)),
    }
}
