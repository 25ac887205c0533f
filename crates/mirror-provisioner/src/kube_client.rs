//! Control-plane client construction.
//!
//! Builds an authenticated `kube::Client` from an explicit kubeconfig path,
//! or infers one (`KUBECONFIG`, `~/.kube/config`, then in-cluster service
//! account). Failures are returned as [`ProvisionerError::Credentials`].

use crate::config::KubeSettings;
use crate::errors::ProvisionerError;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use tracing::{info, instrument};

/// Build a `kube::Config` honoring the configured timeouts.
#[instrument(skip_all, fields(kubeconfig = ?settings.kubeconfig))]
pub async fn load_config(settings: &KubeSettings) -> Result<kube::Config, ProvisionerError> {
    let mut config = match &settings.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                ProvisionerError::Credentials(format!(
                    "Failed to read kubeconfig '{}': {}",
                    path, e
                ))
            })?;

            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    ProvisionerError::Credentials(format!(
                        "Failed to load kubeconfig '{}': {}",
                        path, e
                    ))
                })?
        }
        None => kube::Config::infer().await.map_err(|e| {
            ProvisionerError::Credentials(format!("Failed to infer cluster config: {}", e))
        })?,
    };

    config.connect_timeout = Some(settings.connect_timeout);
    config.read_timeout = Some(settings.read_timeout);

    Ok(config)
}

/// Connect to the control plane.
pub async fn connect(settings: &KubeSettings) -> Result<Client, ProvisionerError> {
    let config = load_config(settings).await?;

    info!(
        target: "mirror.kube",
        cluster_url = %config.cluster_url,
        default_namespace = %config.default_namespace,
        "Cluster configuration loaded"
    );

    Client::try_from(config)
        .map_err(|e| ProvisionerError::Credentials(format!("Failed to create client: {}", e)))
}
