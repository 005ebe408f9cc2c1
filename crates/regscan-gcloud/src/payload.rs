//! JSON payload records for the gcloud listings
//!
//! Empty stdout is an empty listing. Anything that is not the expected JSON
//! array is `GatewayError::Malformed`.

use regscan_core::{GatewayError, ProjectId};
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectRecord {
    project_id: String,
}

#[derive(Debug, Deserialize)]
struct ServiceConfig {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ServiceRecord {
    #[serde(default)]
    config: Option<ServiceConfig>,
    #[serde(default)]
    name: Option<String>,
}

impl ServiceRecord {
    fn api_name(self) -> Option<String> {
        match (self.config, self.name) {
            (Some(config), _) => Some(config.name),
            // "projects/123/services/compute.googleapis.com"
            (None, Some(name)) => name.rsplit('/').next().map(ToString::to_string),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NamedRecord {
    name: String,
}

fn records<T: DeserializeOwned>(stdout: &[u8], what: &str) -> Result<Vec<T>, GatewayError> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(stdout)
        .map_err(|err| GatewayError::Malformed(format!("{what} listing: {err}")))
}

/// Project ids from `gcloud projects list`
///
/// # Errors
/// `GatewayError::Malformed` if the payload does not decode
pub fn project_ids(stdout: &[u8]) -> Result<Vec<ProjectId>, GatewayError> {
    Ok(records::<ProjectRecord>(stdout, "project")?
        .into_iter()
        .map(|record| ProjectId::new(record.project_id))
        .collect())
}

/// API names from `gcloud services list --enabled`
///
/// # Errors
/// `GatewayError::Malformed` if the payload does not decode
pub fn service_names(stdout: &[u8]) -> Result<Vec<String>, GatewayError> {
    Ok(records::<ServiceRecord>(stdout, "service")?
        .into_iter()
        .filter_map(ServiceRecord::api_name)
        .collect())
}

/// Bucket names from `gcloud storage buckets list`
///
/// # Errors
/// `GatewayError::Malformed` if the payload does not decode
pub fn bucket_names(stdout: &[u8]) -> Result<Vec<String>, GatewayError> {
    Ok(records::<NamedRecord>(stdout, "bucket")?
        .into_iter()
        .map(|record| record.name)
        .collect())
}

/// Image repository names from `gcloud container images list`
///
/// # Errors
/// `GatewayError::Malformed` if the payload does not decode
pub fn image_names(stdout: &[u8]) -> Result<Vec<String>, GatewayError> {
    Ok(records::<NamedRecord>(stdout, "image")?
        .into_iter()
        .map(|record| record.name)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn projects_decode_in_order() {
        let stdout = br#"[
            {"projectId": "alpha", "lifecycleState": "ACTIVE", "projectNumber": "1"},
            {"projectId": "beta", "lifecycleState": "ACTIVE", "projectNumber": "2"}
        ]"#;
        let ids = project_ids(stdout).unwrap();
        assert_eq!(ids, vec![ProjectId::new("alpha"), ProjectId::new("beta")]);
    }

    #[test]
    fn empty_stdout_is_empty_listing() {
        assert!(project_ids(b"").unwrap().is_empty());
        assert!(image_names(b"  \n").unwrap().is_empty());
        assert!(bucket_names(b"[]").unwrap().is_empty());
    }

    #[test]
    fn services_prefer_config_name() {
        let stdout = br#"[
            {"config": {"name": "containerregistry.googleapis.com", "title": "Container Registry API"},
             "name": "projects/42/services/containerregistry.googleapis.com", "state": "ENABLED"},
            {"name": "projects/42/services/artifactregistry.googleapis.com", "state": "ENABLED"}
        ]"#;
        assert_eq!(
            service_names(stdout).unwrap(),
            vec![
                "containerregistry.googleapis.com".to_string(),
                "artifactregistry.googleapis.com".to_string()
            ]
        );
    }

    #[test]
    fn buckets_and_images_decode_names() {
        let buckets = br#"[{"name": "us.artifacts.p.appspot.com", "storage_url": "gs://us.artifacts.p.appspot.com/"}]"#;
        assert_eq!(bucket_names(buckets).unwrap(), vec!["us.artifacts.p.appspot.com"]);

        let images = br#"[{"name": "gcr.io/p/web"}, {"name": "gcr.io/p/worker"}]"#;
        assert_eq!(image_names(images).unwrap(), vec!["gcr.io/p/web", "gcr.io/p/worker"]);
    }

    #[test]
    fn non_json_is_malformed() {
        let err = project_ids(b"Listed 0 items.").unwrap_err();
        assert!(matches!(err, GatewayError::Malformed(msg) if msg.starts_with("project listing")));
    }
}
