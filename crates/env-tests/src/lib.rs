//! Environment Integration Test Suite
//!
//! Runs the mirror provisioner against a real cluster and checks the pods it
//! leaves behind. Nothing here runs without an explicit feature flag.
//!
//! # Features
//!
//! - `smoke`: API server reachable, a Ready node exists, pods can be created
//! - `flows`: Provision a mirror pod next to a live target, verify, delete
//! - `all`: Enable all test categories
//!
//! # Prerequisites
//!
//! 1. A kind cluster running: `kind create cluster --name mirror`
//! 2. `KUBECONFIG` (or `~/.kube/config`) pointing at it
//! 3. For `flows`: a running target pod named by `ENV_TESTS_TARGET_POD`
//!    and a collector address in `ENV_TESTS_COLLECTOR_IP`
//!
//! # Usage
//!
//! ```bash
//! # From repo root - runs 0 env-tests (no default features)
//! cargo test
//!
//! # Smoke tests only
//! cargo test -p env-tests --features smoke
//!
//! # Full suite
//! ENV_TESTS_TARGET_POD=ueransim-gnb-0 ENV_TESTS_COLLECTOR_IP=192.168.1.109 \
//!     cargo test -p env-tests --features all
//! ```

pub mod cluster;
pub mod eventual;
