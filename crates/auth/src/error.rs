//! Error taxonomy for credential minting and permission checks.
//!
//! The gate never lets raw transport errors escape: everything a caller can
//! observe is one of the kinds below, so callers can pattern-match without
//! knowing which HTTP client is underneath.

use thiserror::Error;

/// A required configuration value is missing.
///
/// Raised at call time, not at process start: a service that never mints a
/// credential never needs the credentials configured.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("missing configuration: please provide {name}")]
pub struct ConfigurationError {
    /// The environment variable(s) that would satisfy the lookup.
    pub name: &'static str,
}

impl ConfigurationError {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

/// Failure to resolve or use credential material.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No credential source was configured at all.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Credential material was present but unusable (unreadable file,
    /// malformed JSON, bad key).
    #[error("malformed credential material: {0}")]
    Format(String),
}

impl CredentialError {
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }
}

/// Failure while checking permissions against the remote service.
///
/// `RequestFailed` and `PayloadInvalid` both mean "unknown" to the caller,
/// not "denied"; the API layer surfaces them as a generic 403 without
/// internal detail.
#[derive(Debug, Error)]
pub enum PermissionError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The outbound call never produced a response (DNS, connect, socket).
    #[error("user permissions request failed")]
    RequestFailed(#[source] reqwest::Error),

    /// The remote service responded, but not with the expected shape.
    #[error("user permissions response payload invalid (status {status})")]
    PayloadInvalid { status: u16 },
}
