//! Mirror pod manifest construction.
//!
//! Pure transform from a validated [`CaptureRequest`] and a generated name to
//! a [`Pod`]. No I/O. For a fixed name the output is identical across calls.

use crate::config::MirrorSettings;
use crate::models::CaptureRequest;
use k8s_openapi::api::core::v1::{
    Container, HostPathVolumeSource, Pod, PodSpec, SecurityContext, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Marker label identifying capture workloads for external cleanup tooling.
pub const CAPTURE_LABEL_KEY: &str = "dn-vtap";
pub const CAPTURE_LABEL_VALUE: &str = "capturing";

/// Name of the single sidecar container.
pub const CONTAINER_NAME: &str = "network-mirror";

/// Volume exposing the node process table.
pub const VOLUME_HOST_PROC: &str = "hostproc";

/// Volume exposing the container-runtime socket.
pub const VOLUME_RUNTIME_SOCKET: &str = "var-crio";

/// Tap interface the sidecar creates inside its own namespace.
pub const MIRROR_INTERFACE_NAME: &str = "mirror";

/// Builds mirror pod manifests from deployment settings.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    settings: MirrorSettings,
}

impl ManifestBuilder {
    pub fn new(settings: MirrorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MirrorSettings {
        &self.settings
    }

    /// Build the pod manifest for `request` under the given name.
    pub fn build(&self, request: &CaptureRequest, name: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(request.namespace().to_string()),
                labels: Some(BTreeMap::from([(
                    CAPTURE_LABEL_KEY.to_string(),
                    CAPTURE_LABEL_VALUE.to_string(),
                )])),
                ..Default::default()
            },
            spec: Some(PodSpec {
                host_network: Some(true),
                node_name: Some(request.node_name().to_string()),
                restart_policy: Some("Never".to_string()),
                volumes: Some(self.volumes()),
                containers: vec![self.container(request)],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Sidecar argument vector. Order is part of the sidecar's contract.
    pub fn container_args(&self, request: &CaptureRequest) -> Vec<String> {
        vec![
            format!("--procprefix={}", self.settings.proc_prefix),
            "mode".to_string(),
            "sender".to_string(),
            format!("--containerid={}", request.target_container_id()),
            format!("--mirrortype={}", request.mirror_type()),
            format!("--mirrorif={}", request.source_interface()),
            format!("--ifname={}", MIRROR_INTERFACE_NAME),
            format!("--vxlan-egressip={}", self.settings.egress_ip),
            format!("--vxlan-ip={}", request.destination_ip()),
            format!("--vxlan-id={}", request.vxlan_id()),
            format!("--vxlan-port={}", self.settings.vxlan_port),
        ]
    }

    /// Container-side mount path of the host process table.
    pub fn proc_mount_path(&self) -> String {
        format!("{}/proc", self.settings.proc_prefix.trim_end_matches('/'))
    }

    fn volumes(&self) -> Vec<Volume> {
        vec![
            Volume {
                name: VOLUME_HOST_PROC.to_string(),
                host_path: Some(HostPathVolumeSource {
                    path: self.settings.host_proc_path.clone(),
                    type_: Some("Directory".to_string()),
                }),
                ..Default::default()
            },
            Volume {
                name: VOLUME_RUNTIME_SOCKET.to_string(),
                host_path: Some(HostPathVolumeSource {
                    path: self.settings.runtime_socket.clone(),
                    type_: Some("Socket".to_string()),
                }),
                ..Default::default()
            },
        ]
    }

    fn container(&self, request: &CaptureRequest) -> Container {
        Container {
            name: CONTAINER_NAME.to_string(),
            image: Some(self.settings.image.clone()),
            command: Some(vec![self.settings.command.clone()]),
            args: Some(self.container_args(request)),
            // Entering another container's netns and creating VXLAN links
            // needs full privileges, not a capability subset.
            security_context: Some(SecurityContext {
                privileged: Some(true),
                ..Default::default()
            }),
            volume_mounts: Some(vec![
                VolumeMount {
                    name: VOLUME_HOST_PROC.to_string(),
                    mount_path: self.proc_mount_path(),
                    ..Default::default()
                },
                VolumeMount {
                    name: VOLUME_RUNTIME_SOCKET.to_string(),
                    mount_path: self.settings.runtime_socket.clone(),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        }
    }
}
