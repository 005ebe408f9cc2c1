//! Testing utilities for regscan workspace
//!
//! Shared gateway fakes, fixtures, and call accounting.

#![allow(missing_docs)]

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::Rng;
use regscan_core::{ControlPlaneGateway, GatewayError, ProjectId, Scope, ScanConfig};
use regscan_core::config::{LEGACY_REGISTRY_API, NEXT_GEN_REGISTRY_API};
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Gateway operation, for call accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    ListProjects,
    EnabledApis,
    StorageBuckets,
    RegistryImages,
}

/// Canned responses for one project
#[derive(Debug, Clone)]
pub struct ProjectScript {
    pub enabled_apis: Result<Vec<String>, GatewayError>,
    pub buckets: Result<Vec<String>, GatewayError>,
    pub images: Result<Vec<String>, GatewayError>,
    pub panics: bool,
}

impl Default for ProjectScript {
    /// No APIs, no buckets, no registry namespace
    fn default() -> Self {
        Self {
            enabled_apis: Ok(Vec::new()),
            buckets: Ok(Vec::new()),
            images: Err(GatewayError::NotFound("NAME_UNKNOWN".to_string())),
            panics: false,
        }
    }
}

impl ProjectScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_apis(mut self, apis: &[&str]) -> Self {
        self.enabled_apis = Ok(apis.iter().map(ToString::to_string).collect());
        self
    }

    pub fn with_legacy_api(self) -> Self {
        self.with_apis(&[LEGACY_REGISTRY_API])
    }

    pub fn with_next_gen_api(self) -> Self {
        self.with_apis(&[NEXT_GEN_REGISTRY_API])
    }

    pub fn with_both_apis(self) -> Self {
        self.with_apis(&[LEGACY_REGISTRY_API, NEXT_GEN_REGISTRY_API])
    }

    pub fn with_buckets(mut self, buckets: &[&str]) -> Self {
        self.buckets = Ok(buckets.iter().map(ToString::to_string).collect());
        self
    }

    pub fn with_images(mut self, images: &[&str]) -> Self {
        self.images = Ok(images.iter().map(ToString::to_string).collect());
        self
    }

    pub fn failing_apis(mut self, err: GatewayError) -> Self {
        self.enabled_apis = Err(err);
        self
    }

    pub fn failing_buckets(mut self, err: GatewayError) -> Self {
        self.buckets = Err(err);
        self
    }

    pub fn failing_images(mut self, err: GatewayError) -> Self {
        self.images = Err(err);
        self
    }

    /// Every call for this project fails
    pub fn failing_everything(self, err: &GatewayError) -> Self {
        self.failing_apis(err.clone())
            .failing_buckets(err.clone())
            .failing_images(err.clone())
    }

    /// The API listing panics instead of returning
    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }
}

/// In-memory gateway with scripted responses, latency and call counters
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    projects: Mutex<Option<Result<Vec<ProjectId>, GatewayError>>>,
    scripts: DashMap<ProjectId, ProjectScript>,
    calls: DashMap<(Option<ProjectId>, Call), usize>,
    latency_ms: Option<RangeInclusive<u64>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep a random duration in `range` before answering each call
    pub fn with_latency_ms(mut self, range: RangeInclusive<u64>) -> Self {
        self.latency_ms = Some(range);
        self
    }

    /// Project listing returned for any scope
    pub fn with_projects(self, ids: &[&str]) -> Self {
        *self.projects.lock() = Some(Ok(ids.iter().map(|id| ProjectId::new(*id)).collect()));
        self
    }

    pub fn failing_projects(self, err: GatewayError) -> Self {
        *self.projects.lock() = Some(Err(err));
        self
    }

    pub fn with_script(self, id: &str, script: ProjectScript) -> Self {
        self.scripts.insert(ProjectId::new(id), script);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Calls of `call` issued for `project`
    pub fn calls(&self, project: &str, call: Call) -> usize {
        self.calls
            .get(&(Some(ProjectId::new(project)), call))
            .map_or(0, |count| *count)
    }

    /// Project listing calls
    pub fn enumeration_calls(&self) -> usize {
        self.calls
            .get(&(None, Call::ListProjects))
            .map_or(0, |count| *count)
    }

    /// Calls of any kind
    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }

    /// Highest number of calls observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn script(&self, project: &ProjectId) -> ProjectScript {
        self.scripts
            .get(project)
            .map(|script| script.value().clone())
            .unwrap_or_default()
    }

    async fn enter(&self, project: Option<&ProjectId>, call: Call) -> InFlight<'_> {
        *self.calls.entry((project.cloned(), call)).or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        if let Some(range) = &self.latency_ms {
            let delay = rand::rng().random_range(range.clone());
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        guard
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ControlPlaneGateway for ScriptedGateway {
    async fn list_projects(&self, _scope: &Scope) -> Result<Vec<ProjectId>, GatewayError> {
        let _guard = self.enter(None, Call::ListProjects).await;
        self.projects.lock().clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn list_enabled_apis(&self, project: &ProjectId) -> Result<Vec<String>, GatewayError> {
        let _guard = self.enter(Some(project), Call::EnabledApis).await;
        let script = self.script(project);
        assert!(!script.panics, "scripted panic for {project}");
        script.enabled_apis
    }

    async fn list_storage_buckets(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<String>, GatewayError> {
        let _guard = self.enter(Some(project), Call::StorageBuckets).await;
        self.script(project).buckets
    }

    async fn list_registry_images(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<String>, GatewayError> {
        let _guard = self.enter(Some(project), Call::RegistryImages).await;
        self.script(project).images
    }
}

/// Configuration tuned for tests: short timeout, given pool width
pub fn test_config(concurrency: usize) -> ScanConfig {
    ScanConfig::new()
        .with_concurrency(concurrency)
        .with_call_timeout_secs(5)
}

/// `count` project ids named `p0`, `p1`, ...
pub fn project_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("p{i}")).collect()
}
