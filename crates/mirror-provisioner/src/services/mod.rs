//! Provisioning services.
//!
//! - `name_generator` - `captured-<workload>-<ddd>` names from a CSPRNG
//! - `manifest_builder` - capture request to pod manifest
//! - `pod_client` - control-plane boundary (trait, kube impl, mock)
//! - `provisioner` - validation, naming, submission and collision retry

pub mod manifest_builder;
pub mod name_generator;
pub mod pod_client;
pub mod provisioner;

pub use manifest_builder::ManifestBuilder;
pub use name_generator::{SuffixSource, SystemSuffixSource};
pub use pod_client::{KubePodClient, PodClient};
pub use provisioner::Provisioner;
