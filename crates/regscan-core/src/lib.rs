//! regscan Core - registry migration-readiness engine
//!
//! Decides, per project, whether the legacy container registry is still in
//! use and whether the next-gen artifact registry has been adopted:
//! - Enumerates the projects under an organization or folder
//! - Probes API enablement as a tri-state signal
//! - Detects legacy image usage through a two-stage fallback chain
//! - Classifies the signals into a deterministic note
//! - Fans the work out over a bounded worker pool with per-project isolation
//!
//! All cloud access goes through [`ControlPlaneGateway`]; this crate performs
//! no I/O of its own.
//!
//! # Example
//!
//! ```rust,ignore
//! use regscan_core::{Orchestrator, ScanConfig, ScanTarget};
//!
//! # async fn example(gateway: std::sync::Arc<dyn regscan_core::ControlPlaneGateway>)
//! #     -> Result<(), Box<dyn std::error::Error>> {
//! let target = ScanTarget::from_selection(Some("123456"), None, None)?;
//! let orchestrator = Orchestrator::new(gateway, ScanConfig::new().with_concurrency(16));
//!
//! let report = orchestrator.run(&target).await?;
//! for row in report.rows() {
//!     println!("{} {}", row.project_id, row.note);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod classifier;
pub mod config;
pub mod enumerator;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod probe;
pub mod types;
pub mod usage;

// Re-exports for convenience
pub use classifier::classify;
pub use config::ScanConfig;
pub use enumerator::ProjectEnumerator;
pub use error::{CollaboratorError, ConfigurationError, GatewayError, ScanError, Stage};
pub use gateway::ControlPlaneGateway;
pub use orchestrator::{NoopObserver, Orchestrator, ProgressObserver, ProjectScanner};
pub use probe::SignalProbe;
pub use types::{
    ClassificationResult, Confidence, Note, Project, ProjectId, ScanId, ScanReport, ScanTarget,
    Scope, Signal, UsageEvidence, UsageSource,
};
pub use usage::UsageDetector;

/// Re-exported so callers can cancel a scan without a direct `tokio-util` dependency
pub use tokio_util::sync::CancellationToken;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running a scan
    pub use crate::{
        CancellationToken, ClassificationResult, ControlPlaneGateway, Orchestrator,
        ProgressObserver, ScanConfig, ScanError, ScanReport, ScanTarget, Scope, Signal,
        UsageEvidence,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
