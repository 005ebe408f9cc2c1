//! API enablement probing
//!
//! Every gateway failure degrades to `Signal::Unknown`; nothing escapes this
//! boundary, so one project's probe cannot abort the batch.

use crate::error::{CollaboratorError, Stage};
use crate::gateway::{bounded, ControlPlaneGateway};
use crate::types::{ProjectId, Signal};
use std::sync::Arc;
use std::time::Duration;

/// Tri-state API enablement probe
#[derive(Clone)]
pub struct SignalProbe {
    gateway: Arc<dyn ControlPlaneGateway>,
    timeout: Duration,
}

impl SignalProbe {
    /// Create new probe
    #[inline]
    #[must_use]
    pub fn new(gateway: Arc<dyn ControlPlaneGateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    /// Whether `api_name` is enabled on `project`
    pub async fn probe(&self, project: &ProjectId, api_name: &str) -> Signal {
        match bounded(self.timeout, self.gateway.list_enabled_apis(project)).await {
            Ok(apis) => {
                let signal = if apis.iter().any(|api| api == api_name) {
                    Signal::Enabled
                } else {
                    Signal::Disabled
                };
                tracing::debug!(project = %project, api = api_name, ?signal, "probed API");
                signal
            }
            Err(source) => {
                let err = CollaboratorError::new(Stage::ApiProbe, source);
                tracing::warn!(project = %project, api = api_name, error = %err, "signal degraded to unknown");
                Signal::Unknown
            }
        }
    }
}

impl std::fmt::Debug for SignalProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalProbe")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::MockControlPlaneGateway;

    const API: &str = "artifactregistry.googleapis.com";

    fn probe_with(mock: MockControlPlaneGateway) -> SignalProbe {
        SignalProbe::new(Arc::new(mock), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn listed_api_is_enabled() {
        let mut mock = MockControlPlaneGateway::new();
        mock.expect_list_enabled_apis()
            .returning(|_| Ok(vec!["compute.googleapis.com".to_string(), API.to_string()]));

        let signal = probe_with(mock).probe(&ProjectId::new("p"), API).await;
        assert_eq!(signal, Signal::Enabled);
    }

    #[tokio::test]
    async fn absent_api_is_disabled() {
        let mut mock = MockControlPlaneGateway::new();
        mock.expect_list_enabled_apis()
            .returning(|_| Ok(vec!["compute.googleapis.com".to_string()]));

        let signal = probe_with(mock).probe(&ProjectId::new("p"), API).await;
        assert_eq!(signal, Signal::Disabled);
    }

    #[tokio::test]
    async fn membership_is_exact() {
        let mut mock = MockControlPlaneGateway::new();
        mock.expect_list_enabled_apis()
            .returning(|_| Ok(vec![format!("{API}.extra")]));

        let signal = probe_with(mock).probe(&ProjectId::new("p"), API).await;
        assert_eq!(signal, Signal::Disabled);
    }

    #[tokio::test]
    async fn failures_degrade_to_unknown() {
        for failure in [
            GatewayError::PermissionDenied("denied".to_string()),
            GatewayError::Malformed("bad json".to_string()),
            GatewayError::Unavailable("down".to_string()),
        ] {
            let mut mock = MockControlPlaneGateway::new();
            mock.expect_list_enabled_apis()
                .returning(move |_| Err(failure.clone()));

            let signal = probe_with(mock).probe(&ProjectId::new("p"), API).await;
            assert_eq!(signal, Signal::Unknown);
        }
    }
}
