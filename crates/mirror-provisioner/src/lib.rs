//! Mirror Provisioner Library
//!
//! Launches a privileged "mirror pod" next to a running workload so traffic
//! of one interface inside a target container's network namespace is
//! copied to a remote collector over VXLAN. The target pod is never
//! modified; the mirroring itself is done by the kokotap sidecar binary.
//!
//! # Architecture
//!
//! One straight-line pipeline per capture request:
//!
//! ```text
//! CaptureParams -> CaptureRequest::validate -> name_generator
//!               -> ManifestBuilder::build -> PodClient::create_pod
//! ```
//!
//! [`services::Provisioner`] drives the pipeline and retries with a fresh
//! name when the generated one is already taken.
//!
//! # Modules
//!
//! - `config` - Settings from environment
//! - `errors` - Provisioner and submission error types
//! - `kube_client` - Authenticated control-plane client construction
//! - `models` - Capture request types and validation
//! - `observability` - Metrics and tracing setup
//! - `services` - Naming, manifest building, submission
//!
//! # Usage
//!
//! ```rust,ignore
//! use mirror_provisioner::config::Config;
//! use mirror_provisioner::services::{KubePodClient, ManifestBuilder, Provisioner};
//!
//! let config = Config::from_env()?;
//! let client = mirror_provisioner::kube_client::connect(&config.kube).await?;
//! let provisioner = Provisioner::new(
//!     Arc::new(KubePodClient::new(client)),
//!     ManifestBuilder::new(config.mirror.clone()),
//!     config.max_name_attempts,
//! );
//! let mirror = provisioner.provision(params).await?;
//! println!("created {}", mirror.name);
//! ```

pub mod config;
pub mod errors;
pub mod kube_client;
pub mod models;
pub mod observability;
pub mod services;
