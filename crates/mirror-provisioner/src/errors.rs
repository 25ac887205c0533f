//! Mirror provisioner error types.
//!
//! Every failure is returned to the caller as a value. Control-plane
//! messages are carried verbatim so operators see exactly what the API
//! server rejected.

use crate::config::ConfigError;
use crate::models::ValidationError;
use thiserror::Error;

/// Failure reported by the control plane for a single create call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// A pod with the generated name already exists (HTTP 409).
    #[error("Pod already exists: {0}")]
    AlreadyExists(String),

    /// Authentication or authorization was denied (HTTP 401/403).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The API server rejected the manifest (HTTP 400/422).
    #[error("Invalid pod manifest: {0}")]
    Invalid(String),

    /// The control plane could not be reached or failed unexpectedly.
    #[error("Control plane unavailable: {0}")]
    Unavailable(String),
}

impl SubmitError {
    /// Bounded label value for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            SubmitError::AlreadyExists(_) => "already_exists",
            SubmitError::Forbidden(_) => "forbidden",
            SubmitError::Invalid(_) => "invalid",
            SubmitError::Unavailable(_) => "unavailable",
        }
    }

    /// Maps an API status code to a submission error.
    pub fn from_status(code: u16, message: String) -> Self {
        match code {
            409 => SubmitError::AlreadyExists(message),
            401 | 403 => SubmitError::Forbidden(message),
            400 | 422 => SubmitError::Invalid(message),
            _ => SubmitError::Unavailable(message),
        }
    }
}

impl From<kube::Error> for SubmitError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => SubmitError::from_status(response.code, response.message),
            other => SubmitError::Unavailable(other.to_string()),
        }
    }
}

/// Top-level error returned by [`crate::services::Provisioner`] and the CLI.
#[derive(Debug, Error)]
pub enum ProvisionerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Could not build an authenticated control-plane handle.
    #[error("Credential error: {0}")]
    Credentials(String),

    #[error("Invalid capture request: {0}")]
    Validation(#[from] ValidationError),

    /// The system CSPRNG failed to produce a name suffix.
    #[error("Random source unavailable")]
    Randomness,

    /// Every generated name collided with an existing pod.
    #[error("Name collision persisted after {attempts} attempts")]
    NameCollision { attempts: u32 },

    #[error("Submission failed: {0}")]
    Submission(SubmitError),
}
