//! Mirror Provisioning Service.
//!
//! Orchestrates one capture request:
//! 1. Validate the raw parameters (no network call on failure)
//! 2. Generate a name with a random suffix
//! 3. Build the pod manifest
//! 4. Submit it with a single create call
//! 5. On a name collision, retry from step 2 (bounded attempts)
//!
//! Every other control-plane error is returned as-is, without retry.

use crate::errors::{ProvisionerError, SubmitError};
use crate::models::{CaptureParams, CaptureRequest, ProvisionedMirror};
use crate::observability::metrics;
use crate::services::manifest_builder::ManifestBuilder;
use crate::services::name_generator::{generate_name, SuffixSource, SystemSuffixSource};
use crate::services::pod_client::PodClient;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Provisions mirror pods.
///
/// Holds only shared, read-only state, so one instance can serve
/// concurrent requests.
pub struct Provisioner {
    client: Arc<dyn PodClient>,
    builder: ManifestBuilder,
    suffixes: Arc<dyn SuffixSource>,
    max_name_attempts: u32,
}

impl Provisioner {
    /// Create a provisioner using the system CSPRNG for name suffixes.
    pub fn new(client: Arc<dyn PodClient>, builder: ManifestBuilder, max_name_attempts: u32) -> Self {
        Self::with_suffix_source(
            client,
            builder,
            Arc::new(SystemSuffixSource::new()),
            max_name_attempts,
        )
    }

    /// Create a provisioner with an explicit suffix source.
    pub fn with_suffix_source(
        client: Arc<dyn PodClient>,
        builder: ManifestBuilder,
        suffixes: Arc<dyn SuffixSource>,
        max_name_attempts: u32,
    ) -> Self {
        Self {
            client,
            builder,
            suffixes,
            max_name_attempts: max_name_attempts.max(1),
        }
    }

    /// Provision a mirror pod for the given capture parameters.
    ///
    /// # Errors
    ///
    /// - `ProvisionerError::Validation` - malformed input; the control plane
    ///   is not contacted
    /// - `ProvisionerError::Randomness` - CSPRNG failure
    /// - `ProvisionerError::NameCollision` - every generated name was taken
    /// - `ProvisionerError::Submission` - any other control-plane error
    #[instrument(
        skip_all,
        fields(
            namespace = %params.namespace,
            target = %params.target_workload_name,
        )
    )]
    pub async fn provision(
        &self,
        params: CaptureParams,
    ) -> Result<ProvisionedMirror, ProvisionerError> {
        let request = CaptureRequest::validate(params, self.builder.settings().default_node.as_deref())
            .map_err(|e| {
                tracing::warn!(
                    target: "mirror.service.provisioner",
                    field = e.field(),
                    error = %e,
                    "Rejected capture request"
                );
                metrics::record_validation_failure(e.field());
                e
            })?;

        self.provision_request(&request).await
    }

    /// Provision a mirror pod for an already validated request.
    pub async fn provision_request(
        &self,
        request: &CaptureRequest,
    ) -> Result<ProvisionedMirror, ProvisionerError> {
        for attempt in 1..=self.max_name_attempts {
            let name = generate_name(self.suffixes.as_ref(), request.target_workload_name())?;
            let pod = self.builder.build(request, &name);

            let started = Instant::now();
            let result = self.client.create_pod(request.namespace(), &pod).await;
            metrics::record_submission_duration(result.is_ok(), started.elapsed());

            match result {
                Ok(_) => {
                    tracing::info!(
                        target: "mirror.service.provisioner",
                        pod = %name,
                        namespace = %request.namespace(),
                        node = %request.node_name(),
                        mirror_type = %request.mirror_type(),
                        vxlan_id = %request.vxlan_id(),
                        attempt,
                        "Mirror pod created"
                    );
                    metrics::record_pod_created();

                    return Ok(ProvisionedMirror {
                        name,
                        namespace: request.namespace().to_string(),
                        node_name: request.node_name().to_string(),
                        attempts: attempt,
                    });
                }
                Err(SubmitError::AlreadyExists(message)) => {
                    tracing::warn!(
                        target: "mirror.service.provisioner",
                        pod = %name,
                        attempt,
                        max_attempts = self.max_name_attempts,
                        message = %message,
                        "Generated name already taken"
                    );
                    metrics::record_name_collision();
                }
                Err(err) => {
                    tracing::error!(
                        target: "mirror.service.provisioner",
                        pod = %name,
                        namespace = %request.namespace(),
                        error = %err,
                        "Mirror pod submission failed"
                    );
                    metrics::record_submission_failure(err.reason());
                    return Err(ProvisionerError::Submission(err));
                }
            }
        }

        metrics::record_submission_failure("already_exists");
        Err(ProvisionerError::NameCollision {
            attempts: self.max_name_attempts,
        })
    }
}
