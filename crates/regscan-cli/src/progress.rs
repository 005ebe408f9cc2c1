//! Progress line on stderr

use regscan_core::{ClassificationResult, ProgressObserver};
use std::io::{self, IsTerminal, Write};

/// Rewrites `Progress: n/total` in place on stderr
///
/// Silent for single-project scans and when stderr is not a terminal.
#[derive(Debug)]
pub(crate) struct StderrProgress {
    enabled: bool,
}

impl StderrProgress {
    pub(crate) fn new() -> Self {
        Self {
            enabled: io::stderr().is_terminal(),
        }
    }

    fn shows(&self, total: usize) -> bool {
        self.enabled && total > 1
    }
}

impl ProgressObserver for StderrProgress {
    fn on_result(&self, _result: &ClassificationResult, completed: usize, total: usize) {
        if self.shows(total) {
            let mut stderr = io::stderr().lock();
            let _ = write!(stderr, "\r  Progress: {completed}/{total}");
            let _ = stderr.flush();
        }
    }

    fn on_finish(&self, completed: usize, total: usize) {
        if self.shows(total) && completed > 0 {
            let _ = writeln!(io::stderr());
        }
    }
}
