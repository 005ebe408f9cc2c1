//! regscan - report which projects still depend on the legacy container registry

mod cli;
mod progress;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use progress::StderrProgress;
use regscan_core::{CancellationToken, Orchestrator, ScanReport};
use regscan_gcloud::GcloudGateway;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EXIT_FAILURE: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let target = match cli.target() {
        Ok(target) => target,
        Err(err) => {
            eprintln!("Error: {err}");
            return Ok(ExitCode::from(EXIT_FAILURE));
        }
    };

    let gateway = Arc::new(GcloudGateway::with_binary(cli.gcloud.clone()));
    let orchestrator = Orchestrator::new(gateway, cli.config());

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received; stopping scan (Ctrl-C again to exit now)");
                cancel.cancel();
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(i32::from(EXIT_INTERRUPTED));
                }
            }
        }
    });

    let report = match orchestrator
        .run_with(&target, &cancel, &StderrProgress::new())
        .await
    {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Error: {err}");
            return Ok(ExitCode::from(EXIT_FAILURE));
        }
    };

    let status = RunStatus::of(&report);
    if status == RunStatus::NoProjects {
        eprintln!("No projects found. Check your permissions and IDs.");
    } else {
        print_report(&report, cli.json)?;
    }
    Ok(ExitCode::from(status.code()))
}

/// How a scan that returned a report ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStatus {
    Completed,
    NoProjects,
    Interrupted,
}

impl RunStatus {
    fn of(report: &ScanReport) -> Self {
        if report.cancelled {
            Self::Interrupted
        } else if report.is_empty() && report.skipped.is_empty() {
            Self::NoProjects
        } else {
            Self::Completed
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Completed => 0,
            Self::NoProjects => EXIT_FAILURE,
            Self::Interrupted => EXIT_INTERRUPTED,
        }
    }
}

fn print_report(report: &ScanReport, json: bool) -> Result<()> {
    if json {
        let text = render::json(report).context("failed to serialize report")?;
        println!("{text}");
    } else {
        print!("{}", render::table(report));
        let degraded = report.degraded_rows().count();
        if degraded > 0 {
            eprintln!("{degraded} project(s) have Unknown or assumed signals; rerun with -v for details.");
        }
    }
    Ok(())
}
