//! Project enumeration
//!
//! Resolves an organization or folder into the ordered list of projects to
//! scan. Any control plane failure aborts the run: there is no partial roster.

use crate::error::{CollaboratorError, ScanError, Stage};
use crate::gateway::{bounded, ControlPlaneGateway};
use crate::types::{Project, Scope};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Resolves a scope into projects
#[derive(Clone)]
pub struct ProjectEnumerator {
    gateway: Arc<dyn ControlPlaneGateway>,
    timeout: Duration,
}

impl ProjectEnumerator {
    /// Create new enumerator
    #[inline]
    #[must_use]
    pub fn new(gateway: Arc<dyn ControlPlaneGateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    /// Enumerate the projects under `scope`
    ///
    /// Returns an empty list for a well-formed empty scope; the caller decides
    /// what that means. Duplicate ids keep their first position.
    ///
    /// # Errors
    /// - `ScanError::Configuration` if the scope id is blank (no call is made)
    /// - `ScanError::Collaborator` if the listing fails or times out
    pub async fn enumerate(&self, scope: &Scope) -> Result<Vec<Project>, ScanError> {
        scope.validate()?;

        let ids = bounded(self.timeout, self.gateway.list_projects(scope))
            .await
            .map_err(|source| {
                tracing::error!(scope = %scope, error = %source, "project enumeration failed");
                CollaboratorError::new(Stage::Enumeration, source)
            })?;

        let mut seen = HashSet::with_capacity(ids.len());
        let projects: Vec<Project> = ids
            .into_iter()
            .filter(|id| {
                let fresh = seen.insert(id.clone());
                if !fresh {
                    tracing::warn!(scope = %scope, project = %id, "duplicate project in listing ignored");
                }
                fresh
            })
            .map(|id| Project::enumerated(id, scope.clone()))
            .collect();

        tracing::info!(scope = %scope, count = projects.len(), "enumerated projects");
        Ok(projects)
    }
}

impl std::fmt::Debug for ProjectEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectEnumerator")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
