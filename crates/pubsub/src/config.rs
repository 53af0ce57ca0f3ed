//! Environment configuration for subscription wiring.

use thiserror::Error;

/// A required environment value for message delivery is missing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("missing configuration: please provide {0}")]
pub struct MissingConfig(pub &'static str);

pub(crate) fn require_env(var: &'static str) -> Result<String, MissingConfig> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(MissingConfig(var))
}
