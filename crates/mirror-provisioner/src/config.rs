//! Mirror provisioner configuration.
//!
//! Configuration is loaded from environment variables. Everything that used
//! to be deployment-specific (node, image, egress IP) is a setting here.

use std::collections::HashMap;
use std::env;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

/// Default sidecar image.
pub const DEFAULT_IMAGE: &str = "quay.io/s1061123/kokotap:latest";

/// Default sidecar entrypoint.
pub const DEFAULT_COMMAND: &str = "/bin/kokotap_pod";

/// IANA-assigned VXLAN UDP port.
pub const DEFAULT_VXLAN_PORT: u16 = 4789;

/// Default host path of the node process table.
pub const DEFAULT_HOST_PROC_PATH: &str = "/proc";

/// Default host path of the container-runtime control socket.
pub const DEFAULT_RUNTIME_SOCKET: &str = "/var/run/crio/crio.sock";

/// Default prefix the sidecar prepends to host-rooted paths.
pub const DEFAULT_PROC_PREFIX: &str = "/host";

/// Default number of create attempts when generated names collide.
pub const DEFAULT_MAX_NAME_ATTEMPTS: u32 = 3;

/// Upper bound for `MIRROR_MAX_NAME_ATTEMPTS`.
pub const MAX_NAME_ATTEMPTS_LIMIT: u32 = 10;

/// Default control-plane connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 5;

/// Default control-plane read timeout in seconds.
pub const DEFAULT_READ_TIMEOUT_SECONDS: u64 = 30;

/// Log output format for the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Settings that shape the mirror pod manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSettings {
    /// Sidecar container image.
    pub image: String,

    /// Sidecar entrypoint.
    pub command: String,

    /// Source IP the sidecar uses for VXLAN egress.
    pub egress_ip: IpAddr,

    /// VXLAN UDP port (default: 4789).
    pub vxlan_port: u16,

    /// Node used when a request does not name one.
    pub default_node: Option<String>,

    /// Host path of the node process table (default: "/proc").
    pub host_proc_path: String,

    /// Host path of the container-runtime socket.
    pub runtime_socket: String,

    /// Value passed as `--procprefix`; the process table is mounted at
    /// `<proc_prefix>/proc`.
    pub proc_prefix: String,
}

impl MirrorSettings {
    /// Settings with every default applied and the given egress IP.
    pub fn with_egress_ip(egress_ip: IpAddr) -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            command: DEFAULT_COMMAND.to_string(),
            egress_ip,
            vxlan_port: DEFAULT_VXLAN_PORT,
            default_node: None,
            host_proc_path: DEFAULT_HOST_PROC_PATH.to_string(),
            runtime_socket: DEFAULT_RUNTIME_SOCKET.to_string(),
            proc_prefix: DEFAULT_PROC_PREFIX.to_string(),
        }
    }
}

/// Control-plane connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeSettings {
    /// Explicit kubeconfig path. When unset the config is inferred.
    pub kubeconfig: Option<String>,

    pub connect_timeout: Duration,

    pub read_timeout: Duration,
}

impl Default for KubeSettings {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECONDS),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECONDS),
        }
    }
}

/// Mirror provisioner configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub mirror: MirrorSettings,

    pub kube: KubeSettings,

    /// Create attempts before a name collision is reported (default: 3).
    pub max_name_attempts: u32,

    pub log_format: LogFormat,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid egress IP configuration: {0}")]
    InvalidEgressIp(String),

    #[error("Invalid VXLAN port configuration: {0}")]
    InvalidVxlanPort(String),

    #[error("Invalid name attempt configuration: {0}")]
    InvalidNameAttempts(String),

    #[error("Invalid timeout configuration: {0}")]
    InvalidTimeout(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let egress_str = vars
            .get("MIRROR_EGRESS_IP")
            .ok_or_else(|| ConfigError::MissingEnvVar("MIRROR_EGRESS_IP".to_string()))?;
        let egress_ip: IpAddr = egress_str.trim().parse().map_err(|e| {
            ConfigError::InvalidEgressIp(format!(
                "MIRROR_EGRESS_IP must be an IPv4 or IPv6 literal, got '{}': {}",
                egress_str, e
            ))
        })?;

        let image = non_empty(vars, "MIRROR_IMAGE")?.unwrap_or_else(|| DEFAULT_IMAGE.to_string());
        let command =
            non_empty(vars, "MIRROR_COMMAND")?.unwrap_or_else(|| DEFAULT_COMMAND.to_string());
        let default_node = non_empty(vars, "MIRROR_NODE_NAME")?;
        let host_proc_path = non_empty(vars, "MIRROR_HOST_PROC_PATH")?
            .unwrap_or_else(|| DEFAULT_HOST_PROC_PATH.to_string());
        let runtime_socket = non_empty(vars, "MIRROR_RUNTIME_SOCKET")?
            .unwrap_or_else(|| DEFAULT_RUNTIME_SOCKET.to_string());
        let proc_prefix = non_empty(vars, "MIRROR_PROC_PREFIX")?
            .unwrap_or_else(|| DEFAULT_PROC_PREFIX.to_string());

        // The host table is mounted at `<prefix>/proc`; `/` would shadow the
        // container's own /proc.
        if !proc_prefix.starts_with('/') || proc_prefix.trim_end_matches('/').is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "MIRROR_PROC_PREFIX".to_string(),
                reason: format!("must be an absolute path other than '/', got '{}'", proc_prefix),
            });
        }

        // Parse VXLAN port with validation
        let vxlan_port = if let Some(value_str) = vars.get("MIRROR_VXLAN_PORT") {
            let value: u16 = value_str.parse().map_err(|e| {
                ConfigError::InvalidVxlanPort(format!(
                    "MIRROR_VXLAN_PORT must be a valid port number, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidVxlanPort(
                    "MIRROR_VXLAN_PORT must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_VXLAN_PORT
        };

        // Parse name attempts with validation
        let max_name_attempts = if let Some(value_str) = vars.get("MIRROR_MAX_NAME_ATTEMPTS") {
            let value: u32 = value_str.parse().map_err(|e| {
                ConfigError::InvalidNameAttempts(format!(
                    "MIRROR_MAX_NAME_ATTEMPTS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidNameAttempts(
                    "MIRROR_MAX_NAME_ATTEMPTS must be greater than 0".to_string(),
                ));
            }

            if value > MAX_NAME_ATTEMPTS_LIMIT {
                return Err(ConfigError::InvalidNameAttempts(format!(
                    "MIRROR_MAX_NAME_ATTEMPTS must not exceed {}, got {}",
                    MAX_NAME_ATTEMPTS_LIMIT, value
                )));
            }

            value
        } else {
            DEFAULT_MAX_NAME_ATTEMPTS
        };

        let connect_timeout = parse_timeout(
            vars,
            "KUBE_CONNECT_TIMEOUT_SECONDS",
            DEFAULT_CONNECT_TIMEOUT_SECONDS,
        )?;
        let read_timeout =
            parse_timeout(vars, "KUBE_READ_TIMEOUT_SECONDS", DEFAULT_READ_TIMEOUT_SECONDS)?;

        let log_format = match vars.get("MIRROR_LOG_FORMAT").map(String::as_str) {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "MIRROR_LOG_FORMAT".to_string(),
                    reason: format!("must be 'text' or 'json', got '{}'", other),
                })
            }
        };

        Ok(Config {
            mirror: MirrorSettings {
                image,
                command,
                egress_ip,
                vxlan_port,
                default_node,
                host_proc_path,
                runtime_socket,
                proc_prefix,
            },
            kube: KubeSettings {
                // KUBECONFIG may be a path list; it is left to `Config::infer`.
                kubeconfig: None,
                connect_timeout,
                read_timeout,
            },
            max_name_attempts,
            log_format,
        })
    }
}

/// Optional variable that must not be blank when present.
fn non_empty(vars: &HashMap<String, String>, name: &str) -> Result<Option<String>, ConfigError> {
    match vars.get(name) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: "must not be empty".to_string(),
        }),
        Some(value) => Ok(Some(value.trim().to_string())),
    }
}

fn parse_timeout(
    vars: &HashMap<String, String>,
    name: &str,
    default_secs: u64,
) -> Result<Duration, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(Duration::from_secs(default_secs));
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidTimeout(format!(
            "{} must be a valid positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidTimeout(format!(
            "{} must be greater than 0",
            name
        )));
    }

    Ok(Duration::from_secs(value))
}
