//! Cluster connection and health check utilities.
//!
//! `ClusterConnection` wraps an inferred `kube::Client` and the namespace
//! the suite works in. Construction fails fast with an actionable message
//! when no cluster is reachable.

use k8s_openapi::api::authorization::v1::{
    ResourceAttributes, SelfSubjectAccessReview, SelfSubjectAccessReviewSpec,
};
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{Api, Client};
use thiserror::Error;

/// Label selector matching every pod created by the provisioner.
pub const MIRROR_POD_SELECTOR: &str = "dn-vtap=capturing";

/// Namespace used when `ENV_TESTS_NAMESPACE` is unset.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Cluster connection errors.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("No cluster reachable. Check KUBECONFIG or run 'kind create cluster --name mirror': {0}")]
    Unreachable(String),

    #[error("Cluster health check failed: {message}")]
    HealthCheckFailed { message: String },

    #[error("Kubernetes API request failed: {0}")]
    Api(#[from] kube::Error),
}

/// Connection to the test cluster.
pub struct ClusterConnection {
    pub namespace: String,
    client: Client,
}

impl ClusterConnection {
    /// Connect using the inferred kubeconfig and `ENV_TESTS_NAMESPACE`.
    ///
    /// Verifies the API server answers before returning.
    pub async fn new() -> Result<Self, ClusterError> {
        let namespace =
            std::env::var("ENV_TESTS_NAMESPACE").unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string());
        Self::new_in_namespace(namespace).await
    }

    /// Connect and work in the given namespace.
    pub async fn new_in_namespace(namespace: impl Into<String>) -> Result<Self, ClusterError> {
        let client = Client::try_default()
            .await
            .map_err(|e| ClusterError::Unreachable(e.to_string()))?;

        let connection = Self {
            namespace: namespace.into(),
            client,
        };
        connection.check_api_server().await?;

        Ok(connection)
    }

    /// Get the underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Pods API scoped to the test namespace.
    pub fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    /// Check that the API server reports a version.
    pub async fn check_api_server(&self) -> Result<(), ClusterError> {
        let version = self
            .client
            .apiserver_version()
            .await
            .map_err(|e| ClusterError::Unreachable(e.to_string()))?;

        tracing::debug!(
            major = %version.major,
            minor = %version.minor,
            "API server reachable"
        );

        Ok(())
    }

    /// Names of nodes whose `Ready` condition is `True`.
    pub async fn ready_nodes(&self) -> Result<Vec<String>, ClusterError> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes.list(&ListParams::default()).await?;

        let ready = list
            .items
            .into_iter()
            .filter(|node| {
                node.status
                    .as_ref()
                    .and_then(|s| s.conditions.as_ref())
                    .is_some_and(|conditions| {
                        conditions
                            .iter()
                            .any(|c| c.type_ == "Ready" && c.status == "True")
                    })
            })
            .filter_map(|node| node.metadata.name)
            .collect();

        Ok(ready)
    }

    /// Ask the API server whether the current identity may create pods.
    pub async fn can_create_pods(&self) -> Result<bool, ClusterError> {
        let reviews: Api<SelfSubjectAccessReview> = Api::all(self.client.clone());
        let review = SelfSubjectAccessReview {
            spec: SelfSubjectAccessReviewSpec {
                resource_attributes: Some(ResourceAttributes {
                    namespace: Some(self.namespace.clone()),
                    verb: Some("create".to_string()),
                    resource: Some("pods".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        };

        let result = reviews.create(&PostParams::default(), &review).await?;

        Ok(result.status.is_some_and(|s| s.allowed))
    }

    /// Names of mirror pods currently present in the test namespace.
    pub async fn mirror_pod_names(&self) -> Result<Vec<String>, ClusterError> {
        let list = self
            .pods()
            .list(&ListParams::default().labels(MIRROR_POD_SELECTOR))
            .await?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|pod| pod.metadata.name)
            .collect())
    }

    /// Fetch a pod, `None` if it does not exist.
    pub async fn get_pod(&self, name: &str) -> Result<Option<Pod>, ClusterError> {
        Ok(self.pods().get_opt(name).await?)
    }

    /// Delete a pod, ignoring "not found".
    pub async fn delete_pod(&self, name: &str) -> Result<(), ClusterError> {
        match self.pods().delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(resp)) if resp.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Node and runtime-qualified ID of the first container of `pod_name`.
    pub async fn container_location(
        &self,
        pod_name: &str,
    ) -> Result<(String, String), ClusterError> {
        let pod = self.get_pod(pod_name).await?.ok_or_else(|| {
            ClusterError::HealthCheckFailed {
                message: format!(
                    "Target pod '{}' not found in namespace '{}'",
                    pod_name, self.namespace
                ),
            }
        })?;

        let node = pod
            .spec
            .as_ref()
            .and_then(|s| s.node_name.clone())
            .ok_or_else(|| ClusterError::HealthCheckFailed {
                message: format!("Target pod '{}' is not scheduled", pod_name),
            })?;

        let container_id = pod
            .status
            .as_ref()
            .and_then(|s| s.container_statuses.as_ref())
            .and_then(|statuses| statuses.first())
            .and_then(|c| c.container_id.clone())
            .ok_or_else(|| ClusterError::HealthCheckFailed {
                message: format!("Target pod '{}' has no running container", pod_name),
            })?;

        Ok((node, container_id))
    }
}
