//! Batch scan orchestration
//!
//! Fans the per-project pipeline out over a bounded worker pool:
//! - One tokio task per project, gated by a semaphore of `concurrency` permits
//! - Each task returns its enumeration index; results land in that slot
//! - A panicking pipeline still yields a degraded row
//! - Cancellation stops unstarted projects and abandons in-flight ones at
//!   their pending call; those rows come back degraded
//!
//! The report order is the enumeration order regardless of completion order.

use crate::classifier::classify;
use crate::config::ScanConfig;
use crate::enumerator::ProjectEnumerator;
use crate::error::ScanError;
use crate::gateway::ControlPlaneGateway;
use crate::probe::SignalProbe;
use crate::types::{
    ClassificationResult, Project, ProjectId, ScanId, ScanReport, ScanTarget, Signal,
    UsageEvidence,
};
use crate::usage::UsageDetector;
use chrono::Utc;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Observer notified as rows are finalized
///
/// Called from the collecting task, never from workers.
pub trait ProgressObserver: Send + Sync {
    /// Scan is about to start probing `total` projects
    fn on_start(&self, total: usize) {
        let _ = total;
    }

    /// A row was written into its slot
    fn on_result(&self, result: &ClassificationResult, completed: usize, total: usize);

    /// All workers have returned
    fn on_finish(&self, completed: usize, total: usize) {
        let _ = (completed, total);
    }
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_result(&self, _result: &ClassificationResult, _completed: usize, _total: usize) {}
}

/// Per-project pipeline: two API probes, usage detection, classification
#[derive(Debug, Clone)]
pub struct ProjectScanner {
    probe: SignalProbe,
    detector: UsageDetector,
    legacy_api: Arc<str>,
    next_gen_api: Arc<str>,
    skip_usage_when_legacy_disabled: bool,
}

impl ProjectScanner {
    /// Build the pipeline from a gateway and configuration
    #[must_use]
    pub fn new(gateway: Arc<dyn ControlPlaneGateway>, config: &ScanConfig) -> Self {
        let timeout = config.call_timeout();
        Self {
            probe: SignalProbe::new(Arc::clone(&gateway), timeout),
            detector: UsageDetector::new(
                gateway,
                config.legacy_bucket_prefixes.clone(),
                timeout,
            ),
            legacy_api: Arc::from(config.legacy_api.as_str()),
            next_gen_api: Arc::from(config.next_gen_api.as_str()),
            skip_usage_when_legacy_disabled: config.skip_usage_when_legacy_disabled,
        }
    }

    /// Classify one project; calls are issued sequentially
    pub async fn scan(&self, project: &Project) -> ClassificationResult {
        let id = &project.id;
        let legacy_api = self.probe.probe(id, &self.legacy_api).await;
        let next_gen_api = self.probe.probe(id, &self.next_gen_api).await;

        let usage = if self.skip_usage_when_legacy_disabled && legacy_api == Signal::Disabled {
            tracing::debug!(project = %id, "legacy API disabled; usage detection skipped");
            UsageEvidence::not_probed()
        } else {
            self.detector.detect_usage(id).await
        };

        let note = classify(legacy_api, usage, next_gen_api);
        tracing::debug!(project = %id, %note, "classified");

        ClassificationResult {
            project_id: id.clone(),
            legacy_api,
            usage,
            next_gen_api,
            note,
        }
    }
}

/// Runs scans over a fleet of projects
#[derive(Debug)]
pub struct Orchestrator {
    config: ScanConfig,
    enumerator: ProjectEnumerator,
    scanner: Arc<ProjectScanner>,
}

impl Orchestrator {
    /// Create new orchestrator
    #[must_use]
    pub fn new(gateway: Arc<dyn ControlPlaneGateway>, config: ScanConfig) -> Self {
        Self {
            enumerator: ProjectEnumerator::new(Arc::clone(&gateway), config.call_timeout()),
            scanner: Arc::new(ProjectScanner::new(gateway, &config)),
            config,
        }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan `target` to completion
    ///
    /// # Errors
    /// See [`Orchestrator::run_with`]
    pub async fn run(&self, target: &ScanTarget) -> Result<ScanReport, ScanError> {
        self.run_with(target, &CancellationToken::new(), &NoopObserver)
            .await
    }

    /// Scan `target`, honouring `cancel` and reporting to `observer`
    ///
    /// An empty enumeration yields an empty report, not an error.
    ///
    /// # Errors
    /// - `ScanError::Configuration` for invalid settings or a blank id, before any call
    /// - `ScanError::Collaborator` if project enumeration fails
    pub async fn run_with(
        &self,
        target: &ScanTarget,
        cancel: &CancellationToken,
        observer: &dyn ProgressObserver,
    ) -> Result<ScanReport, ScanError> {
        self.config.validate()?;
        target.validate()?;

        let scan_id = ScanId::new();
        let span = tracing::info_span!("scan", scan_id = %scan_id, target = %target);

        async move {
            let started_at = Utc::now();
            let Some(projects) = self.projects(target, cancel).await? else {
                tracing::warn!("scan cancelled during enumeration");
                return Ok(ScanReport {
                    scan_id,
                    target: target.clone(),
                    rows: Vec::new(),
                    skipped: Vec::new(),
                    cancelled: true,
                    started_at,
                    finished_at: Utc::now(),
                });
            };

            tracing::info!(
                projects = projects.len(),
                concurrency = self.config.concurrency,
                "scan started"
            );
            observer.on_start(projects.len());

            let batch = self.fan_out(projects, cancel, observer).await;
            observer.on_finish(batch.rows.len(), batch.rows.len() + batch.skipped.len());

            let cancelled = batch.interrupted || !batch.skipped.is_empty();
            tracing::info!(
                rows = batch.rows.len(),
                skipped = batch.skipped.len(),
                cancelled,
                "scan finished"
            );

            Ok::<_, ScanError>(ScanReport {
                scan_id,
                target: target.clone(),
                rows: batch.rows,
                skipped: batch.skipped,
                cancelled,
                started_at,
                finished_at: Utc::now(),
            })
        }
        .instrument(span)
        .await
    }

    /// Projects to scan; `None` if cancelled while enumerating
    async fn projects(
        &self,
        target: &ScanTarget,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<Project>>, ScanError> {
        match target {
            ScanTarget::Project(id) => Ok(Some(vec![Project::standalone(id.clone())])),
            ScanTarget::Scope(scope) => tokio::select! {
                biased;
                () = cancel.cancelled() => Ok(None),
                projects = self.enumerator.enumerate(scope) => projects.map(Some),
            },
        }
    }

    async fn fan_out(
        &self,
        projects: Vec<Project>,
        cancel: &CancellationToken,
        observer: &dyn ProgressObserver,
    ) -> Batch {
        let total = projects.len();
        let ids: Vec<ProjectId> = projects.iter().map(|p| p.id.clone()).collect();
        let permits = Arc::new(Semaphore::new(self.config.concurrency));
        let mut workers = JoinSet::new();
        let mut task_index = HashMap::with_capacity(total);

        for (index, project) in projects.into_iter().enumerate() {
            let scanner = Arc::clone(&self.scanner);
            let permits = Arc::clone(&permits);
            let cancel = cancel.clone();
            let handle = workers.spawn(
                async move {
                    let permit = tokio::select! {
                        biased;
                        () = cancel.cancelled() => return (index, Outcome::NotStarted),
                        permit = permits.acquire_owned() => permit,
                    };
                    let Ok(_permit) = permit else {
                        return (index, Outcome::NotStarted);
                    };

                    // Dropping the pipeline abandons its pending gateway call.
                    let pipeline = AssertUnwindSafe(scanner.scan(&project)).catch_unwind();
                    let outcome = tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            tracing::warn!(project = %project.id, "scan interrupted");
                            return (index, Outcome::Interrupted);
                        }
                        outcome = pipeline => outcome,
                    };

                    let row = match outcome {
                        Ok(row) => row,
                        Err(_) => {
                            tracing::error!(project = %project.id, "project pipeline panicked");
                            ClassificationResult::degraded(project.id)
                        }
                    };
                    (index, Outcome::Finished(row))
                }
                .in_current_span(),
            );
            task_index.insert(handle.id(), index);
        }

        collect_rows(workers, &task_index, ids, cancel, observer).await
    }
}

/// Drain `workers` into enumeration-ordered rows
///
/// A worker lost to a `JoinError` had started, so its project gets a degraded
/// row rather than a `skipped` entry.
async fn collect_rows(
    mut workers: JoinSet<(usize, Outcome)>,
    task_index: &HashMap<task::Id, usize>,
    ids: Vec<ProjectId>,
    cancel: &CancellationToken,
    observer: &dyn ProgressObserver,
) -> Batch {
    let total = ids.len();

    // Each slot is written exactly once, by the task holding its index.
    let mut slots: Vec<Option<ClassificationResult>> = (0..total).map(|_| None).collect();
    let mut completed = 0;
    let mut interrupted = false;

    while let Some(joined) = workers.join_next().await {
        let (index, row) = match joined {
            Ok((index, Outcome::Finished(row))) => (index, row),
            Ok((index, Outcome::Interrupted)) => {
                interrupted = true;
                (index, ClassificationResult::degraded(ids[index].clone()))
            }
            Ok((_, Outcome::NotStarted)) => continue,
            Err(err) => {
                tracing::error!(error = %err, "scan worker lost");
                let Some(&index) = task_index.get(&err.id()) else {
                    continue;
                };
                (index, ClassificationResult::degraded(ids[index].clone()))
            }
        };

        debug_assert!(slots[index].is_none(), "slot {index} written twice");
        let row = slots[index].insert(row);
        completed += 1;
        observer.on_result(row, completed, total);
    }

    let mut rows = Vec::with_capacity(completed);
    let mut skipped = Vec::new();
    for (slot, id) in slots.into_iter().zip(ids) {
        match slot {
            Some(row) => rows.push(row),
            None if cancel.is_cancelled() => skipped.push(id),
            None => rows.push(ClassificationResult::degraded(id)),
        }
    }
    Batch {
        rows,
        skipped,
        interrupted,
    }
}

/// How a worker task ended
enum Outcome {
    /// Never got a permit before cancellation
    NotStarted,
    /// Cancelled mid-pipeline
    Interrupted,
    Finished(ClassificationResult),
}

struct Batch {
    rows: Vec<ClassificationResult>,
    skipped: Vec<ProjectId>,
    interrupted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::MockControlPlaneGateway;
    use crate::types::{Note, Scope};

    fn all_clear_mock() -> MockControlPlaneGateway {
        let mut mock = MockControlPlaneGateway::new();
        mock.expect_list_enabled_apis()
            .returning(|_| Ok(vec!["artifactregistry.googleapis.com".to_string()]));
        mock.expect_list_storage_buckets().returning(|_| Ok(Vec::new()));
        mock.expect_list_registry_images()
            .returning(|_| Err(GatewayError::NotFound("NAME_UNKNOWN".to_string())));
        mock
    }

    #[tokio::test]
    async fn single_project_run_skips_enumeration() {
        let mut mock = all_clear_mock();
        mock.expect_list_projects().times(0);

        let orchestrator = Orchestrator::new(Arc::new(mock), ScanConfig::new());
        let target = ScanTarget::Project(ProjectId::new("solo"));
        let report = orchestrator.run(&target).await.unwrap();

        assert_eq!(report.len(), 1);
        assert!(report.is_complete());
        assert_eq!(report.rows()[0].project_id.as_str(), "solo");
        assert_eq!(report.rows()[0].note, Note::NextGenAdopted);
    }

    #[tokio::test]
    async fn invalid_config_fails_before_any_call() {
        let mut mock = MockControlPlaneGateway::new();
        mock.expect_list_projects().times(0);
        mock.expect_list_enabled_apis().times(0);

        let orchestrator =
            Orchestrator::new(Arc::new(mock), ScanConfig::new().with_concurrency(0));
        let target = ScanTarget::Scope(Scope::Organization("1".to_string()));
        let err = orchestrator.run(&target).await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn skip_usage_when_legacy_disabled() {
        let mut mock = MockControlPlaneGateway::new();
        mock.expect_list_enabled_apis().returning(|_| Ok(Vec::new()));
        mock.expect_list_storage_buckets().times(0);
        mock.expect_list_registry_images().times(0);

        let config = ScanConfig::new().with_skip_usage_when_legacy_disabled(true);
        let orchestrator = Orchestrator::new(Arc::new(mock), config);
        let report = orchestrator
            .run(&ScanTarget::Project(ProjectId::new("p")))
            .await
            .unwrap();

        let row = &report.rows()[0];
        assert_eq!(row.legacy_api, Signal::Disabled);
        assert_eq!(row.usage, UsageEvidence::not_probed());
        assert_eq!(row.note, Note::NoAction);
    }

    #[tokio::test]
    async fn unknown_legacy_signal_never_gates_usage() {
        let mut mock = MockControlPlaneGateway::new();
        mock.expect_list_enabled_apis()
            .returning(|_| Err(GatewayError::Unavailable("down".to_string())));
        mock.expect_list_storage_buckets()
            .times(1)
            .returning(|_| Ok(vec!["gcr.io".to_string()]));

        let config = ScanConfig::new().with_skip_usage_when_legacy_disabled(true);
        let orchestrator = Orchestrator::new(Arc::new(mock), config);
        let report = orchestrator
            .run(&ScanTarget::Project(ProjectId::new("p")))
            .await
            .unwrap();

        let row = &report.rows()[0];
        assert_eq!(row.legacy_api, Signal::Unknown);
        assert!(row.usage.found);
        assert_eq!(row.note, Note::MigrationNeeded);
    }

    #[tokio::test]
    async fn cancelled_before_enumeration_issues_no_calls() {
        let mut mock = MockControlPlaneGateway::new();
        mock.expect_list_projects().times(0);
        mock.expect_list_enabled_apis().times(0);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let orchestrator = Orchestrator::new(Arc::new(mock), ScanConfig::new());
        let target = ScanTarget::Scope(Scope::Folder("f".to_string()));
        let report = orchestrator
            .run_with(&target, &cancel, &NoopObserver)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert!(report.is_empty());
        assert!(report.skipped.is_empty());
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn cancelled_before_start_skips_the_project() {
        let mut mock = MockControlPlaneGateway::new();
        mock.expect_list_enabled_apis().times(0);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let orchestrator = Orchestrator::new(Arc::new(mock), ScanConfig::new());
        let report = orchestrator
            .run_with(&ScanTarget::Project(ProjectId::new("a")), &cancel, &NoopObserver)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert!(report.is_empty());
        let skipped: Vec<&str> = report.skipped.iter().map(ProjectId::as_str).collect();
        assert_eq!(skipped, vec!["a"]);
    }

    struct SlotCheck {
        seen: std::sync::Mutex<Vec<(String, usize)>>,
    }

    impl ProgressObserver for SlotCheck {
        fn on_result(&self, result: &ClassificationResult, completed: usize, _total: usize) {
            self.seen
                .lock()
                .unwrap()
                .push((result.project_id.to_string(), completed));
        }
    }

    #[tokio::test]
    async fn observer_receives_each_stored_row() {
        let mut mock = all_clear_mock();
        mock.expect_list_projects()
            .returning(|_| Ok(vec![ProjectId::new("a"), ProjectId::new("b")]));

        let observer = SlotCheck {
            seen: std::sync::Mutex::new(Vec::new()),
        };
        let orchestrator = Orchestrator::new(Arc::new(mock), ScanConfig::new().with_concurrency(1));
        let target = ScanTarget::Scope(Scope::Folder("f".to_string()));
        let report = orchestrator
            .run_with(&target, &CancellationToken::new(), &observer)
            .await
            .unwrap();

        let seen = observer.seen.into_inner().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen.iter().map(|(_, n)| *n).collect::<Vec<_>>(), vec![1, 2]);
        for (id, _) in &seen {
            assert!(report.project_ids().any(|row| row.as_str() == id));
        }
    }

    #[tokio::test]
    async fn lost_worker_is_degraded_even_when_cancelled() {
        let mut workers: JoinSet<(usize, Outcome)> = JoinSet::new();
        let mut task_index = HashMap::new();
        let lost = workers.spawn(async { panic!("worker torn down") });
        task_index.insert(lost.id(), 0);
        let waiting = workers.spawn(async { (1, Outcome::NotStarted) });
        task_index.insert(waiting.id(), 1);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let ids = vec![ProjectId::new("started"), ProjectId::new("queued")];
        let batch = collect_rows(workers, &task_index, ids, &cancel, &NoopObserver).await;

        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.rows[0].project_id.as_str(), "started");
        assert!(batch.rows[0].is_degraded());
        assert_eq!(batch.skipped, vec![ProjectId::new("queued")]);
        assert!(!batch.interrupted);
    }
}
