//! Command line surface

use clap::{ArgAction, Parser};
use regscan_core::{ConfigurationError, ScanConfig, ScanTarget};
use std::path::PathBuf;

/// Scan projects for legacy container registry usage
#[derive(Debug, Parser)]
#[command(name = "regscan", version, about)]
pub(crate) struct Cli {
    /// Organization ID to scan
    #[arg(short = 'o', long)]
    pub(crate) organization: Option<String>,

    /// Single project ID to scan
    #[arg(short = 'p', long)]
    pub(crate) project: Option<String>,

    /// Folder ID to scan
    #[arg(short = 'd', long, visible_alias = "directory")]
    pub(crate) folder: Option<String>,

    /// Projects probed in parallel
    #[arg(long, default_value_t = 8)]
    pub(crate) concurrency: usize,

    /// Per-call timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub(crate) timeout_secs: u64,

    /// Skip image detection for projects whose legacy API is confirmed disabled
    #[arg(long)]
    pub(crate) skip_usage_when_legacy_disabled: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub(crate) json: bool,

    /// gcloud executable
    #[arg(long, default_value = regscan_gcloud::DEFAULT_GCLOUD_BINARY)]
    pub(crate) gcloud: PathBuf,

    /// More logging (-v info, -vv debug); `RUST_LOG` wins when set
    #[arg(short, long, action = ArgAction::Count)]
    pub(crate) verbose: u8,
}

impl Cli {
    /// Scan target from the scope flags
    ///
    /// Selection rules live in the core so a missing or conflicting scope is a
    /// `ConfigurationError` rather than a usage error.
    pub(crate) fn target(&self) -> Result<ScanTarget, ConfigurationError> {
        ScanTarget::from_selection(
            self.organization.as_deref(),
            self.folder.as_deref(),
            self.project.as_deref(),
        )
    }

    pub(crate) fn config(&self) -> ScanConfig {
        ScanConfig::new()
            .with_concurrency(self.concurrency)
            .with_call_timeout_secs(self.timeout_secs)
            .with_skip_usage_when_legacy_disabled(self.skip_usage_when_legacy_disabled)
    }

    pub(crate) fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
