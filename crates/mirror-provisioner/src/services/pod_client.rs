//! Pod submission client.
//!
//! Thin boundary to the control plane: exactly one create call per
//! invocation. No get-before-create, no update, no delete.

use crate::errors::SubmitError;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, PostParams};
use kube::Client;
use tracing::instrument;

/// Trait for pod creation (enables mocking).
#[async_trait::async_trait]
pub trait PodClient: Send + Sync {
    /// Create `pod` in `namespace`, returning the object the API server stored.
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod, SubmitError>;
}

/// Pod client backed by a `kube::Client`.
///
/// `kube::Client` is cheap to clone and safe to share; the session
/// (credentials, transport) is never mutated after construction.
#[derive(Clone)]
pub struct KubePodClient {
    client: Client,
}

impl KubePodClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl PodClient for KubePodClient {
    #[instrument(skip_all, fields(namespace = %namespace, pod = ?pod.metadata.name))]
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod, SubmitError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);

        api.create(&PostParams::default(), pod).await.map_err(|e| {
            let err = SubmitError::from(e);
            tracing::debug!(
                target: "mirror.kube",
                error = %err,
                "Pod create call failed"
            );
            err
        })
    }
}

/// Mock pod client module for testing.
///
/// This module provides a scripted implementation of [`PodClient`] for use
/// in unit and integration tests.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock pod client for unit testing.
    pub struct MockPodClient {
        /// Responses to return in order; the last one repeats.
        responses: Vec<Result<(), SubmitError>>,
        /// Number of calls made.
        call_count: AtomicUsize,
        /// Pods received, in call order.
        submitted: Mutex<Vec<Pod>>,
    }

    impl MockPodClient {
        /// Create a mock that accepts every pod.
        pub fn accepting() -> Self {
            Self::with_responses(vec![Ok(())])
        }

        /// Create a mock that always fails with `error`.
        pub fn failing(error: SubmitError) -> Self {
            Self::with_responses(vec![Err(error)])
        }

        /// Create a mock that reports every name as taken.
        pub fn always_colliding() -> Self {
            Self::failing(SubmitError::AlreadyExists("pod already exists".to_string()))
        }

        /// Create a mock that returns custom responses in sequence.
        pub fn with_responses(responses: Vec<Result<(), SubmitError>>) -> Self {
            Self {
                responses,
                call_count: AtomicUsize::new(0),
                submitted: Mutex::new(Vec::new()),
            }
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Names of all pods submitted so far.
        pub fn submitted_names(&self) -> Vec<String> {
            self.submitted_pods()
                .into_iter()
                .filter_map(|pod| pod.metadata.name)
                .collect()
        }

        /// Clones of all pods submitted so far.
        pub fn submitted_pods(&self) -> Vec<Pod> {
            self.submitted
                .lock()
                .map(|pods| pods.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait::async_trait]
    impl PodClient for MockPodClient {
        async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod, SubmitError> {
            let count = self.call_count.fetch_add(1, Ordering::SeqCst);

            if let Ok(mut submitted) = self.submitted.lock() {
                submitted.push(pod.clone());
            }

            let response = self
                .responses
                .get(count)
                .or_else(|| self.responses.last())
                .cloned()
                .unwrap_or(Ok(()));

            response.map(|()| {
                let mut created = pod.clone();
                created.metadata.namespace = Some(namespace.to_string());
                created.metadata.uid = Some(format!("mock-uid-{}", count));
                created
            })
        }
    }

}
