//! Mirror Provisioner
//!
//! Creates one mirror pod for the capture described on the command line and
//! exits. Deployment settings (egress IP, image, default node, ...) come
//! from the environment; see `config`.
//!
//! # Flow
//!
//! 1. Parse CLI flags
//! 2. Load configuration from environment
//! 3. Initialize tracing
//! 4. Build an authenticated control-plane client
//! 5. Provision the mirror pod and print its name

use clap::Parser;
use mirror_provisioner::config::Config;
use mirror_provisioner::errors::ProvisionerError;
use mirror_provisioner::kube_client;
use mirror_provisioner::models::{CaptureParams, ProvisionedMirror};
use mirror_provisioner::observability::init_tracing;
use mirror_provisioner::services::{KubePodClient, ManifestBuilder, Provisioner};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

/// Launch a privileged pod that mirrors a container's traffic over VXLAN.
#[derive(Debug, Parser)]
#[command(name = "mirror-provisioner", version, about)]
struct Cli {
    /// Namespace to create the mirror pod in.
    #[arg(long, short = 'n', default_value = "default")]
    namespace: String,

    /// Name of the workload being tapped (used for naming only).
    #[arg(long)]
    target: String,

    /// Direction to mirror: ingress, egress or both.
    #[arg(long, default_value = "both")]
    mirror_type: String,

    /// Interface inside the target's network namespace.
    #[arg(long, default_value = "eth0")]
    interface: String,

    /// VXLAN remote endpoint (collector IP).
    #[arg(long)]
    destination_ip: String,

    /// VXLAN network identifier.
    #[arg(long)]
    vxlan_id: String,

    /// Runtime-qualified container ID, e.g. cri-o://3ba9...
    #[arg(long)]
    container_id: String,

    /// Node hosting the target container (default: MIRROR_NODE_NAME).
    #[arg(long)]
    node: Option<String>,

    /// Path to a single kubeconfig file (default: inferred from KUBECONFIG,
    /// ~/.kube/config or the in-cluster service account).
    #[arg(long)]
    kubeconfig: Option<String>,

    /// Print the created mirror as JSON instead of just its name.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn capture_params(&self) -> CaptureParams {
        CaptureParams {
            namespace: self.namespace.clone(),
            target_workload_name: self.target.clone(),
            mirror_type: self.mirror_type.clone(),
            source_interface: self.interface.clone(),
            destination_ip: self.destination_ip.clone(),
            vxlan_id: self.vxlan_id.clone(),
            target_container_id: self.container_id.clone(),
            node_name: self.node.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration before tracing so the log format is known
    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.log_format);

    if cli.kubeconfig.is_some() {
        config.kube.kubeconfig = cli.kubeconfig.clone();
    }

    info!(
        image = %config.mirror.image,
        egress_ip = %config.mirror.egress_ip,
        vxlan_port = config.mirror.vxlan_port,
        default_node = ?config.mirror.default_node,
        max_name_attempts = config.max_name_attempts,
        "Configuration loaded successfully"
    );

    match run(&cli, config).await {
        Ok(mirror) if cli.json => match serde_json::to_string(&mirror) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "Failed to serialize result");
                ExitCode::FAILURE
            }
        },
        Ok(mirror) => {
            println!("{}", mirror.name);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Failed to provision mirror pod");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, config: Config) -> Result<ProvisionedMirror, ProvisionerError> {
    let client = kube_client::connect(&config.kube).await?;

    let provisioner = Provisioner::new(
        Arc::new(KubePodClient::new(client)),
        ManifestBuilder::new(config.mirror),
        config.max_name_attempts,
    );

    let mirror = provisioner.provision(cli.capture_params()).await?;

    info!(
        pod = %mirror.name,
        namespace = %mirror.namespace,
        node = %mirror.node_name,
        attempts = mirror.attempts,
        "Pod {} is created successfully in namespace {}",
        mirror.name,
        mirror.namespace
    );

    Ok(mirror)
}
