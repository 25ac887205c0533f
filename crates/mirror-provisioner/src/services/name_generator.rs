//! Mirror pod name generation.
//!
//! Names have the form `captured-<workload>-<ddd>`. The suffix is drawn from
//! a process-wide CSPRNG; uniqueness against cluster state is not checked
//! here, a collision surfaces as `AlreadyExists` from the pod client.

use crate::errors::ProvisionerError;
use crate::models::MIRROR_NAME_PREFIX;
use ring::rand::{SecureRandom, SystemRandom};

/// Number of distinct suffix values (`000`..=`999`).
pub const SUFFIX_SPACE: u16 = 1000;

/// Largest multiple of `SUFFIX_SPACE` that fits in a `u16`.
/// Draws at or above it are rejected so every suffix is equally likely.
const REJECTION_BOUND: u16 = u16::MAX - (u16::MAX % SUFFIX_SPACE);

/// Source of name suffixes in `0..SUFFIX_SPACE`.
pub trait SuffixSource: Send + Sync {
    fn next_suffix(&self) -> Result<u16, ProvisionerError>;
}

/// Suffix source backed by the system CSPRNG.
///
/// `SystemRandom` is seeded by the OS, so rapid successive calls are
/// independent.
#[derive(Clone)]
pub struct SystemSuffixSource {
    rng: SystemRandom,
}

impl SystemSuffixSource {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl Default for SystemSuffixSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SuffixSource for SystemSuffixSource {
    fn next_suffix(&self) -> Result<u16, ProvisionerError> {
        loop {
            let mut bytes = [0u8; 2];
            self.rng.fill(&mut bytes).map_err(|_| {
                tracing::error!(target: "mirror.service.name", "CSPRNG failed to produce suffix");
                ProvisionerError::Randomness
            })?;

            let value = u16::from_le_bytes(bytes);
            if value < REJECTION_BOUND {
                return Ok(value % SUFFIX_SPACE);
            }
        }
    }
}

/// Format a mirror pod name from a workload name and suffix.
pub fn mirror_pod_name(base: &str, suffix: u16) -> String {
    format!("{}-{}-{:03}", MIRROR_NAME_PREFIX, base, suffix % SUFFIX_SPACE)
}

/// Draw a suffix and format a name.
pub fn generate_name(source: &dyn SuffixSource, base: &str) -> Result<String, ProvisionerError> {
    Ok(mirror_pod_name(base, source.next_suffix()?))
}
