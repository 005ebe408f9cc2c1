//! gcloud-backed control plane gateway
//!
//! Implements [`ControlPlaneGateway`] by invoking the `gcloud` CLI with
//! `--format=json`:
//! - No shell is involved; identifiers are passed as discrete arguments
//! - Payloads are decoded into typed records
//! - Failures are classified from exit status and stderr into `GatewayError`
//!
//! Authentication is whatever the local `gcloud` installation is configured
//! with.

#![warn(unreachable_pub)]

pub mod command;
pub mod payload;

pub use command::{classify_failure, GcloudCommand};

use async_trait::async_trait;
use regscan_core::{ControlPlaneGateway, GatewayError, ProjectId, Scope};
use std::path::PathBuf;

/// Default executable name
pub const DEFAULT_GCLOUD_BINARY: &str = "gcloud";

/// Gateway that shells out to `gcloud`
#[derive(Debug, Clone)]
pub struct GcloudGateway {
    binary: PathBuf,
}

impl GcloudGateway {
    /// Gateway using `gcloud` from `PATH`
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_binary(DEFAULT_GCLOUD_BINARY)
    }

    /// Gateway using a specific executable
    #[inline]
    #[must_use]
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self) -> GcloudCommand {
        GcloudCommand::new(&self.binary)
    }
}

impl Default for GcloudGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ControlPlaneGateway for GcloudGateway {
    async fn list_projects(&self, scope: &Scope) -> Result<Vec<ProjectId>, GatewayError> {
        let stdout = self
            .command()
            .args(["projects", "list"])
            .arg(format!("--filter={}", command::parent_filter(scope)))
            .output()
            .await?;
        payload::project_ids(&stdout)
    }

    async fn list_enabled_apis(&self, project: &ProjectId) -> Result<Vec<String>, GatewayError> {
        let stdout = self
            .command()
            .args(["services", "list", "--enabled"])
            .project(project)
            .output()
            .await?;
        payload::service_names(&stdout)
    }

    async fn list_storage_buckets(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<String>, GatewayError> {
        let stdout = self
            .command()
            .args(["storage", "buckets", "list"])
            .project(project)
            .output()
            .await?;
        payload::bucket_names(&stdout)
    }

    async fn list_registry_images(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<String>, GatewayError> {
        let stdout = self
            .command()
            .args(["container", "images", "list"])
            .project(project)
            .output()
            .await?;
        payload::image_names(&stdout)
    }
}
