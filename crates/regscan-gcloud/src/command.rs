//! gcloud invocation and failure classification

use regscan_core::{GatewayError, ProjectId, Scope};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// One `gcloud` invocation, always JSON-formatted and non-interactive
#[derive(Debug, Clone)]
pub struct GcloudCommand {
    binary: PathBuf,
    args: Vec<String>,
}

impl GcloudCommand {
    /// Start a command for `binary`
    #[must_use]
    pub fn new(binary: &Path) -> Self {
        Self {
            binary: binary.to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Scope the command to a project
    #[must_use]
    pub fn project(self, project: &ProjectId) -> Self {
        self.arg("--project").arg(project.as_str())
    }

    /// Final argument vector, including the fixed output flags
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        let mut argv = self.args.clone();
        argv.push("--format=json".to_string());
        argv.push("--quiet".to_string());
        argv
    }

    /// Run and return stdout
    ///
    /// # Errors
    /// - `GatewayError::Unavailable` if the executable cannot be launched
    /// - the classification of stderr if the command exits unsuccessfully
    pub async fn output(self) -> Result<Vec<u8>, GatewayError> {
        let argv = self.argv();
        tracing::debug!(binary = %self.binary.display(), args = ?argv, "running gcloud");

        let output = Command::new(&self.binary)
            .args(&argv)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| {
                GatewayError::Unavailable(format!(
                    "failed to launch {}: {err}",
                    self.binary.display()
                ))
            })?;

        if output.status.success() {
            return Ok(output.stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let err = classify_failure(&stderr);
        tracing::debug!(status = ?output.status.code(), error = %err, "gcloud failed");
        Err(err)
    }
}

/// `--filter` expression selecting the direct children of `scope`
#[must_use]
pub fn parent_filter(scope: &Scope) -> String {
    format!("parent.type={} AND parent.id={}", scope.kind(), scope.id())
}

/// Map a failed invocation's stderr to a typed error
///
/// `NAME_UNKNOWN` is the registry's "no such namespace" answer and is the only
/// text mapped to `NotFound`.
#[must_use]
pub fn classify_failure(stderr: &str) -> GatewayError {
    let message = summarize(stderr);

    if stderr.contains("NAME_UNKNOWN") {
        GatewayError::NotFound(message)
    } else if stderr.contains("PERMISSION_DENIED")
        || stderr.contains("does not have permission")
        || stderr.contains("HTTPError 403")
        || stderr.contains("code=403")
    {
        GatewayError::PermissionDenied(message)
    } else if stderr.contains("UNAVAILABLE")
        || stderr.contains("DEADLINE_EXCEEDED")
        || stderr.contains("RESOURCE_EXHAUSTED")
        || stderr.contains("Could not resolve host")
        || stderr.contains("Connection reset")
    {
        GatewayError::Unavailable(message)
    } else {
        GatewayError::Ambiguous(message)
    }
}

fn summarize(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .rev()
        .find(|line| !line.is_empty())
        .unwrap_or("no error output")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argv_appends_output_flags() {
        let argv = GcloudCommand::new(Path::new("gcloud"))
            .args(["services", "list", "--enabled"])
            .project(&ProjectId::new("my-proj"))
            .argv();
        assert_eq!(
            argv,
            vec![
                "services",
                "list",
                "--enabled",
                "--project",
                "my-proj",
                "--format=json",
                "--quiet"
            ]
        );
    }

    #[test]
    fn parent_filter_per_scope() {
        assert_eq!(
            parent_filter(&Scope::Organization("123".to_string())),
            "parent.type=organization AND parent.id=123"
        );
        assert_eq!(
            parent_filter(&Scope::Folder("456".to_string())),
            "parent.type=folder AND parent.id=456"
        );
    }

    #[test]
    fn name_unknown_is_not_found() {
        let stderr = "ERROR: (gcloud.container.images.list) NAME_UNKNOWN: Repository \"gcr.io/p\" not found\n";
        let err = classify_failure(stderr);
        assert!(err.is_not_found());
        assert!(matches!(err, GatewayError::NotFound(msg) if msg.contains("NAME_UNKNOWN")));
    }

    #[test]
    fn permission_failures() {
        let stderr = "ERROR: (gcloud.services.list) User [me@example.com] does not have permission to access projects instance [p]";
        assert!(matches!(
            classify_failure(stderr),
            GatewayError::PermissionDenied(_)
        ));
    }

    #[test]
    fn status_403_needs_http_context() {
        let stderr = "ERROR: (gcloud.services.list) HTTPError 403: The caller does not have access";
        assert!(matches!(classify_failure(stderr), GatewayError::PermissionDenied(_)));

        let stderr = "ERROR: project [app-4031] returned an unexpected payload";
        assert!(matches!(classify_failure(stderr), GatewayError::Ambiguous(_)));
    }

    #[test]
    fn transient_failures() {
        let err = classify_failure("ERROR: gcloud crashed (ConnectionError): Could not resolve host");
        assert!(err.is_transient());
    }

    #[test]
    fn unrecognized_text_is_ambiguous() {
        let err = classify_failure("\nWARNING: something odd\nERROR: unexpected thing\n\n");
        assert_eq!(err, GatewayError::Ambiguous("ERROR: unexpected thing".to_string()));
        assert_eq!(
            classify_failure(""),
            GatewayError::Ambiguous("no error output".to_string())
        );
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let result = GcloudCommand::new(Path::new("/nonexistent/regscan-gcloud-test"))
            .args(["projects", "list"])
            .output()
            .await;
        assert!(matches!(result, Err(GatewayError::Unavailable(_))));
    }
}
