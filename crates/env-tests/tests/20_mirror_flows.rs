//! P1 Flow Tests: Mirror Pod Lifecycle
//!
//! Provisions real mirror pods next to a running target and verifies what
//! lands in the cluster. Every test deletes the pods it creates.
//!
//! Requires `ENV_TESTS_TARGET_POD` (a running pod in the test namespace) and
//! `ENV_TESTS_COLLECTOR_IP`. `ENV_TESTS_EGRESS_IP` defaults to the collector
//! address when unset.

#![cfg(feature = "flows")]

use env_tests::cluster::{ClusterConnection, MIRROR_POD_SELECTOR};
use env_tests::eventual::{assert_eventually, ConsistencyCategory};
use mirror_provisioner::config::MirrorSettings;
use mirror_provisioner::errors::ProvisionerError;
use mirror_provisioner::models::CaptureParams;
use mirror_provisioner::services::{KubePodClient, ManifestBuilder, Provisioner};
use serial_test::serial;
use std::sync::Arc;

struct Target {
    pod: String,
    node: String,
    container_id: String,
    collector_ip: String,
    egress_ip: String,
}

async fn cluster() -> ClusterConnection {
    ClusterConnection::new()
        .await
        .expect("Failed to connect to cluster - check KUBECONFIG")
}

async fn target(cluster: &ClusterConnection) -> Target {
    let pod = std::env::var("ENV_TESTS_TARGET_POD")
        .expect("ENV_TESTS_TARGET_POD must name a running pod for flow tests");
    let collector_ip = std::env::var("ENV_TESTS_COLLECTOR_IP")
        .expect("ENV_TESTS_COLLECTOR_IP must be set for flow tests");
    let egress_ip = std::env::var("ENV_TESTS_EGRESS_IP").unwrap_or_else(|_| collector_ip.clone());

    let (node, container_id) = cluster
        .container_location(&pod)
        .await
        .expect("Target pod should be scheduled with a running container");

    Target {
        pod,
        node,
        container_id,
        collector_ip,
        egress_ip,
    }
}

fn provisioner(cluster: &ClusterConnection, target: &Target) -> Provisioner {
    let settings = MirrorSettings::with_egress_ip(
        target
            .egress_ip
            .parse()
            .expect("ENV_TESTS_EGRESS_IP should be an IP literal"),
    );

    Provisioner::new(
        Arc::new(KubePodClient::new(cluster.client().clone())),
        ManifestBuilder::new(settings),
        3,
    )
}

/// Short workload name unique to this run, so leftovers are easy to spot.
fn workload_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("envtest-{}", id.chars().take(8).collect::<String>())
}

fn params(cluster: &ClusterConnection, target: &Target, workload: &str) -> CaptureParams {
    CaptureParams {
        namespace: cluster.namespace.clone(),
        target_workload_name: workload.to_string(),
        mirror_type: "both".to_string(),
        source_interface: "eth0".to_string(),
        destination_ip: target.collector_ip.clone(),
        vxlan_id: "4242".to_string(),
        target_container_id: target.container_id.clone(),
        node_name: Some(target.node.clone()),
    }
}

async fn cleanup(cluster: &ClusterConnection, name: &str) {
    cluster
        .delete_pod(name)
        .await
        .expect("Mirror pod cleanup should succeed");

    assert_eventually(ConsistencyCategory::PodDeletion, || async move {
        matches!(cluster.get_pod(name).await, Ok(None))
    })
    .await
    .expect("Mirror pod should be deleted");
}

#[tokio::test]
#[serial]
async fn test_mirror_pod_created_on_target_node() {
    let cluster = cluster().await;
    let target = target(&cluster).await;
    let workload = workload_name();

    let mirror = provisioner(&cluster, &target)
        .provision(params(&cluster, &target, &workload))
        .await
        .expect("Provisioning against a live target should succeed");

    assert!(mirror.name.starts_with(&format!("captured-{}-", workload)));

    let pod = cluster
        .get_pod(&mirror.name)
        .await
        .expect("Reading the mirror pod should succeed")
        .expect("Mirror pod should exist after provisioning");

    let spec = pod.spec.expect("Mirror pod should have a spec");
    assert_eq!(spec.node_name.as_deref(), Some(target.node.as_str()));
    assert_eq!(spec.host_network, Some(true));

    let container = spec.containers.first().expect("One container expected");
    let privileged = container
        .security_context
        .as_ref()
        .and_then(|sc| sc.privileged);
    assert_eq!(privileged, Some(true));

    let args = container.args.clone().unwrap_or_default();
    assert!(args.contains(&format!("--containerid={}", target.container_id)));
    assert!(args.contains(&format!("--vxlan-ip={}", target.collector_ip)));

    let listed = cluster
        .mirror_pod_names()
        .await
        .expect("Listing mirror pods should succeed");
    assert!(
        listed.contains(&mirror.name),
        "Mirror pod should match selector {}",
        MIRROR_POD_SELECTOR
    );

    cleanup(&cluster, &mirror.name).await;
}

#[tokio::test]
#[serial]
async fn test_target_pod_untouched_by_provisioning() {
    let cluster = cluster().await;
    let target = target(&cluster).await;

    let before = cluster
        .get_pod(&target.pod)
        .await
        .expect("Reading target should succeed")
        .expect("Target should exist");

    let mirror = provisioner(&cluster, &target)
        .provision(params(&cluster, &target, &workload_name()))
        .await
        .expect("Provisioning should succeed");

    let after = cluster
        .get_pod(&target.pod)
        .await
        .expect("Reading target should succeed")
        .expect("Target should still exist");

    assert_eq!(before.metadata.uid, after.metadata.uid);
    assert_eq!(before.metadata.generation, after.metadata.generation);
    assert_eq!(before.metadata.labels, after.metadata.labels);

    cleanup(&cluster, &mirror.name).await;
}

#[tokio::test]
#[serial]
async fn test_invalid_request_creates_nothing() {
    let cluster = cluster().await;
    let target = target(&cluster).await;

    let existing = cluster
        .mirror_pod_names()
        .await
        .expect("Listing mirror pods should succeed");

    let bad = CaptureParams {
        vxlan_id: "not-a-number".to_string(),
        ..params(&cluster, &target, &workload_name())
    };
    let result = provisioner(&cluster, &target).provision(bad).await;

    assert!(matches!(result, Err(ProvisionerError::Validation(_))));

    let after = cluster
        .mirror_pod_names()
        .await
        .expect("Listing mirror pods should succeed");
    assert_eq!(existing.len(), after.len());
}
