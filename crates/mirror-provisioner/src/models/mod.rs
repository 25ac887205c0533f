//! Capture request models.
//!
//! Operators hand in [`CaptureParams`] (plain strings, as they arrive from
//! the CLI or a JSON body). [`CaptureRequest::validate`] is the only way to
//! obtain a [`CaptureRequest`], so every malformed field is rejected before
//! a manifest is built or the control plane is contacted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

/// Prefix of every generated mirror pod name.
pub const MIRROR_NAME_PREFIX: &str = "captured";

/// Kubernetes limit for pod names (DNS-1123 subdomain).
pub const MAX_POD_NAME_LENGTH: usize = 253;

/// Kubernetes limit for namespace names (DNS-1123 label).
pub const MAX_NAMESPACE_LENGTH: usize = 63;

/// Linux `IFNAMSIZ` minus the trailing NUL.
pub const MAX_INTERFACE_NAME_LENGTH: usize = 15;

/// Largest VXLAN network identifier (24 bits).
pub const MAX_VXLAN_ID: u32 = 0x00FF_FFFF;

/// Bytes taken by `captured-` and `-ddd` around the workload name.
const NAME_OVERHEAD: usize = MIRROR_NAME_PREFIX.len() + 1 + 4;

/// Rejected capture input. Each variant names the offending field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("namespace '{0}' is not a valid DNS-1123 label")]
    InvalidNamespace(String),

    #[error("target workload name '{0}' cannot form a valid pod name")]
    InvalidWorkloadName(String),

    #[error("mirror type '{0}' must be one of: ingress, egress, both")]
    InvalidMirrorType(String),

    #[error("source interface '{0}' is not a valid interface name")]
    InvalidInterface(String),

    #[error("destination IP '{0}' is not an IPv4 or IPv6 literal")]
    InvalidDestinationIp(String),

    #[error("VXLAN id '{0}' must be an integer in 0..=16777215")]
    InvalidVxlanId(String),

    #[error("container id '{0}' must have the form <runtime>://<id>")]
    InvalidContainerId(String),

    #[error("node name '{0}' is not a valid node name")]
    InvalidNodeName(String),

    #[error("no node name given and no default node configured")]
    MissingNodeName,
}

impl ValidationError {
    /// Bounded label value for metrics.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::InvalidNamespace(_) => "namespace",
            ValidationError::InvalidWorkloadName(_) => "target_workload_name",
            ValidationError::InvalidMirrorType(_) => "mirror_type",
            ValidationError::InvalidInterface(_) => "source_interface",
            ValidationError::InvalidDestinationIp(_) => "destination_ip",
            ValidationError::InvalidVxlanId(_) => "vxlan_id",
            ValidationError::InvalidContainerId(_) => "target_container_id",
            ValidationError::InvalidNodeName(_) | ValidationError::MissingNodeName => "node_name",
        }
    }
}

/// Direction of traffic to mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorType {
    Ingress,
    Egress,
    Both,
}

impl MirrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MirrorType::Ingress => "ingress",
            MirrorType::Egress => "egress",
            MirrorType::Both => "both",
        }
    }
}

impl fmt::Display for MirrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MirrorType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ingress" => Ok(MirrorType::Ingress),
            "egress" => Ok(MirrorType::Egress),
            "both" => Ok(MirrorType::Both),
            other => Err(ValidationError::InvalidMirrorType(other.to_string())),
        }
    }
}

/// 24-bit VXLAN network identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VxlanId(u32);

impl VxlanId {
    pub fn new(value: u32) -> Result<Self, ValidationError> {
        if value > MAX_VXLAN_ID {
            return Err(ValidationError::InvalidVxlanId(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for VxlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VxlanId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s
            .trim()
            .parse()
            .map_err(|_| ValidationError::InvalidVxlanId(s.to_string()))?;
        Self::new(value)
    }
}

/// Runtime-qualified container identifier, e.g. `cri-o://3ba9777f...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Runtime portion before `://`.
    pub fn runtime(&self) -> &str {
        self.0.split_once("://").map_or("", |(runtime, _)| runtime)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContainerId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidContainerId(s.to_string());
        let (runtime, id) = s.split_once("://").ok_or_else(invalid)?;

        let runtime_ok = !runtime.is_empty()
            && runtime
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        let id_ok = !id.is_empty() && !id.chars().any(char::is_whitespace);

        if runtime_ok && id_ok {
            Ok(Self(s.to_string()))
        } else {
            Err(invalid())
        }
    }
}

/// Raw capture input as supplied by an operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureParams {
    pub namespace: String,
    pub target_workload_name: String,
    pub mirror_type: String,
    pub source_interface: String,
    pub destination_ip: String,
    pub vxlan_id: String,
    pub target_container_id: String,
    /// Node hosting the target container. Falls back to the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
}

/// A validated capture request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    namespace: String,
    target_workload_name: String,
    mirror_type: MirrorType,
    source_interface: String,
    destination_ip: IpAddr,
    vxlan_id: VxlanId,
    target_container_id: ContainerId,
    node_name: String,
}

impl CaptureRequest {
    /// Validate raw parameters.
    ///
    /// `default_node` is used when the params carry no node name.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, checking fields in the
    /// order they appear in [`CaptureParams`].
    pub fn validate(
        params: CaptureParams,
        default_node: Option<&str>,
    ) -> Result<Self, ValidationError> {
        if !is_dns_label(&params.namespace, MAX_NAMESPACE_LENGTH) {
            return Err(ValidationError::InvalidNamespace(params.namespace));
        }

        if !is_dns_subdomain(
            &params.target_workload_name,
            MAX_POD_NAME_LENGTH - NAME_OVERHEAD,
        ) {
            return Err(ValidationError::InvalidWorkloadName(
                params.target_workload_name,
            ));
        }

        let mirror_type: MirrorType = params.mirror_type.parse()?;

        if !is_interface_name(&params.source_interface) {
            return Err(ValidationError::InvalidInterface(params.source_interface));
        }

        let destination_ip: IpAddr = params
            .destination_ip
            .trim()
            .parse()
            .map_err(|_| ValidationError::InvalidDestinationIp(params.destination_ip.clone()))?;

        let vxlan_id: VxlanId = params.vxlan_id.parse()?;
        let target_container_id: ContainerId = params.target_container_id.parse()?;

        let node_name = match params.node_name {
            Some(node) => node,
            None => default_node
                .map(str::to_string)
                .ok_or(ValidationError::MissingNodeName)?,
        };
        if !is_dns_subdomain(&node_name, MAX_POD_NAME_LENGTH) {
            return Err(ValidationError::InvalidNodeName(node_name));
        }

        Ok(Self {
            namespace: params.namespace,
            target_workload_name: params.target_workload_name,
            mirror_type,
            source_interface: params.source_interface,
            destination_ip,
            vxlan_id,
            target_container_id,
            node_name,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn target_workload_name(&self) -> &str {
        &self.target_workload_name
    }

    pub fn mirror_type(&self) -> MirrorType {
        self.mirror_type
    }

    pub fn source_interface(&self) -> &str {
        &self.source_interface
    }

    pub fn destination_ip(&self) -> IpAddr {
        self.destination_ip
    }

    pub fn vxlan_id(&self) -> VxlanId {
        self.vxlan_id
    }

    pub fn target_container_id(&self) -> &ContainerId {
        &self.target_container_id
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }
}

/// Outcome of a successful provisioning call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedMirror {
    /// Generated pod name.
    pub name: String,
    pub namespace: String,
    pub node_name: String,
    /// Create calls made, including collisions.
    pub attempts: u32,
}

/// DNS-1123 label: lowercase alphanumerics and `-`, alphanumeric at both ends.
fn is_dns_label(value: &str, max_len: usize) -> bool {
    is_dns_name(value, max_len, false)
}

/// DNS-1123 subdomain: like a label but `.` is also allowed.
fn is_dns_subdomain(value: &str, max_len: usize) -> bool {
    is_dns_name(value, max_len, true)
}

fn is_dns_name(value: &str, max_len: usize, allow_dot: bool) -> bool {
    if value.is_empty() || value.len() > max_len {
        return false;
    }
    if !allow_dot {
        return is_label_chars(value);
    }
    value.split('.').all(is_label_chars)
}

/// One DNS label without a length bound.
fn is_label_chars(label: &str) -> bool {
    let alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();

    !label.is_empty()
        && label.starts_with(alnum)
        && label.ends_with(alnum)
        && label.chars().all(|c| alnum(c) || c == '-')
}

/// Mirrors the kernel's `dev_valid_name` check.
fn is_interface_name(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_INTERFACE_NAME_LENGTH
        && value != "."
        && value != ".."
        && !value
            .chars()
            .any(|c| c == '/' || c == ':' || c.is_whitespace())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn params() -> CaptureParams {
        CaptureParams {
            namespace: "default".to_string(),
            target_workload_name: "ueransim-gnb".to_string(),
            mirror_type: "both".to_string(),
            source_interface: "eth0".to_string(),
            destination_ip: "192.168.1.109".to_string(),
            vxlan_id: "1100".to_string(),
            target_container_id: "cri-o://abc123".to_string(),
            node_name: Some("worker-1".to_string()),
        }
    }

    #[test]
    fn test_validate_success() {
        let request = CaptureRequest::validate(params(), None).unwrap();

        assert_eq!(request.namespace(), "default");
        assert_eq!(request.target_workload_name(), "ueransim-gnb");
        assert_eq!(request.mirror_type(), MirrorType::Both);
        assert_eq!(request.source_interface(), "eth0");
        assert_eq!(request.destination_ip().to_string(), "192.168.1.109");
        assert_eq!(request.vxlan_id().get(), 1100);
        assert_eq!(request.target_container_id().as_str(), "cri-o://abc123");
        assert_eq!(request.target_container_id().runtime(), "cri-o");
        assert_eq!(request.node_name(), "worker-1");
    }

    #[test]
    fn test_mirror_type_parsing() {
        assert_eq!("ingress".parse::<MirrorType>().unwrap(), MirrorType::Ingress);
        assert_eq!("egress".parse::<MirrorType>().unwrap(), MirrorType::Egress);
        assert_eq!("both".parse::<MirrorType>().unwrap(), MirrorType::Both);

        for bad in ["", "Both", "INGRESS", "all", " both"] {
            assert_eq!(
                bad.parse::<MirrorType>(),
                Err(ValidationError::InvalidMirrorType(bad.to_string())),
                "'{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_mirror_type_display_roundtrips_through_serde() {
        let json = serde_json::to_string(&MirrorType::Egress).unwrap();
        assert_eq!(json, "\"egress\"");
        assert_eq!(MirrorType::Egress.to_string(), "egress");
    }

    #[test]
    fn test_empty_mirror_type_rejected() {
        let mut p = params();
        p.mirror_type = String::new();

        let err = CaptureRequest::validate(p, None).unwrap_err();
        assert_eq!(err, ValidationError::InvalidMirrorType(String::new()));
        assert_eq!(err.field(), "mirror_type");
    }

    #[test]
    fn test_vxlan_id_bounds() {
        assert_eq!("0".parse::<VxlanId>().unwrap().get(), 0);
        assert_eq!("16777215".parse::<VxlanId>().unwrap().get(), MAX_VXLAN_ID);
        assert!("16777216".parse::<VxlanId>().is_err());
        assert!("-1".parse::<VxlanId>().is_err());
        assert!("".parse::<VxlanId>().is_err());
        assert!("11OO".parse::<VxlanId>().is_err());
    }

    #[test]
    fn test_container_id_shape() {
        assert!("containerd://deadbeef".parse::<ContainerId>().is_ok());
        assert!("docker://0123".parse::<ContainerId>().is_ok());
        assert!("abc123".parse::<ContainerId>().is_err());
        assert!("://abc123".parse::<ContainerId>().is_err());
        assert!("cri-o://".parse::<ContainerId>().is_err());
        assert!("cri-o://abc 123".parse::<ContainerId>().is_err());
    }

    #[test]
    fn test_destination_ip_accepts_ipv6() {
        let mut p = params();
        p.destination_ip = "fd00::109".to_string();

        let request = CaptureRequest::validate(p, None).unwrap();
        assert!(request.destination_ip().is_ipv6());
    }

    #[test]
    fn test_destination_ip_rejects_hostname() {
        let mut p = params();
        p.destination_ip = "collector.local".to_string();

        assert_eq!(
            CaptureRequest::validate(p, None),
            Err(ValidationError::InvalidDestinationIp(
                "collector.local".to_string()
            ))
        );
    }

    #[test]
    fn test_namespace_rules() {
        let too_long = "a".repeat(MAX_NAMESPACE_LENGTH + 1);
        for bad in ["", "Default", "-ns", "ns-", "kube.system", too_long.as_str()] {
            let mut p = params();
            p.namespace = bad.to_string();
            assert!(
                matches!(
                    CaptureRequest::validate(p, None),
                    Err(ValidationError::InvalidNamespace(_))
                ),
                "namespace '{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_workload_name_rules() {
        let mut p = params();
        p.target_workload_name = "ueransim-gnb-ues-6c7d5c7bfb-2nd9t".to_string();
        assert!(CaptureRequest::validate(p, None).is_ok());

        let longest = "a".repeat(MAX_POD_NAME_LENGTH - NAME_OVERHEAD);
        let mut p = params();
        p.target_workload_name = longest;
        assert!(CaptureRequest::validate(p, None).is_ok());

        for bad in [
            String::new(),
            "GNB".to_string(),
            "gnb_1".to_string(),
            "a..b".to_string(),
            "a.-b".to_string(),
            "gnb-.1".to_string(),
            "a".repeat(MAX_POD_NAME_LENGTH - NAME_OVERHEAD + 1),
        ] {
            let mut p = params();
            p.target_workload_name = bad;
            assert!(matches!(
                CaptureRequest::validate(p, None),
                Err(ValidationError::InvalidWorkloadName(_))
            ));
        }
    }

    #[test]
    fn test_interface_rules() {
        for good in ["eth0", "n3", "veth1234abcd", "net1.100"] {
            let mut p = params();
            p.source_interface = good.to_string();
            assert!(CaptureRequest::validate(p, None).is_ok(), "{}", good);
        }

        for bad in ["", ".", "..", "eth 0", "eth/0", "eth:0", "averyveryverylong0"] {
            let mut p = params();
            p.source_interface = bad.to_string();
            assert!(
                matches!(
                    CaptureRequest::validate(p, None),
                    Err(ValidationError::InvalidInterface(_))
                ),
                "interface '{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_node_falls_back_to_default() {
        let mut p = params();
        p.node_name = None;

        let request = CaptureRequest::validate(p, Some("k8s-w1.example.org")).unwrap();
        assert_eq!(request.node_name(), "k8s-w1.example.org");
    }

    #[test]
    fn test_explicit_node_wins_over_default() {
        let request = CaptureRequest::validate(params(), Some("other-node")).unwrap();
        assert_eq!(request.node_name(), "worker-1");
    }

    #[test]
    fn test_missing_node_rejected() {
        let mut p = params();
        p.node_name = None;

        assert_eq!(
            CaptureRequest::validate(p, None),
            Err(ValidationError::MissingNodeName)
        );
    }

    #[test]
    fn test_node_name_labels_checked_individually() {
        for bad in ["k8s..w1", "k8s-.w1", "k8s.-w1", ".k8s-w1"] {
            let mut p = params();
            p.node_name = Some(bad.to_string());
            assert_eq!(
                CaptureRequest::validate(p, None),
                Err(ValidationError::InvalidNodeName(bad.to_string())),
                "'{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_params_deserialize_without_node() {
        let json = r#"{
            "namespace": "default",
            "target_workload_name": "gnb",
            "mirror_type": "ingress",
            "source_interface": "eth0",
            "destination_ip": "10.0.0.1",
            "vxlan_id": "42",
            "target_container_id": "containerd://ff"
        }"#;

        let p: CaptureParams = serde_json::from_str(json).unwrap();
        assert_eq!(p.node_name, None);
        assert_eq!(p.mirror_type, "ingress");
    }
}
