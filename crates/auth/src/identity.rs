//! Service identity resolution.
//!
//! Resolution order, first non-empty wins:
//!
//! 1. explicit override token (`AUTH0_JWT_TOKEN`) — skips signing entirely
//! 2. explicit path to a service-account file
//! 3. explicit inline service-account JSON
//! 4. env-provided path (`GOOGLE_APPLICATION_CREDENTIALS`)
//! 5. env-provided inline JSON (`GOOGLE_CREDENTIALS`)
//!
//! Environment capture happens only in [`IdentityConfig::from_env`], so
//! tests can construct configs without touching process state.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{ConfigurationError, CredentialError};

const MISSING_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS or GOOGLE_CREDENTIALS";

/// Service-account key material (the subset we need for signing).
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, CredentialError> {
        serde_json::from_str(json)
            .map_err(|e| CredentialError::format(format!("invalid service account JSON: {e}")))
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, CredentialError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CredentialError::format(format!("unreadable credentials file {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }
}

/// Where the outbound service identity comes from.
#[derive(Debug, Clone, Default)]
pub struct IdentityConfig {
    /// Pre-issued token for non-Google auth federation. When set, minting is
    /// skipped and the raw bytes are used as-is.
    pub override_token: Option<String>,
    pub credentials_path: Option<PathBuf>,
    pub credentials_json: Option<String>,
    env_credentials_path: Option<PathBuf>,
    env_credentials_json: Option<String>,
}

/// A resolved identity source, ready to mint with.
#[derive(Debug)]
pub enum ResolvedIdentity {
    /// Raw token bytes to use verbatim.
    Override(Vec<u8>),
    /// Key material to sign an assertion with.
    ServiceAccount(ServiceAccountKey),
}

impl IdentityConfig {
    /// Capture the environment-provided sources.
    pub fn from_env() -> Self {
        fn non_empty(var: &str) -> Option<String> {
            std::env::var(var).ok().filter(|v| !v.is_empty())
        }

        Self {
            override_token: non_empty("AUTH0_JWT_TOKEN"),
            credentials_path: None,
            credentials_json: None,
            env_credentials_path: non_empty("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from),
            env_credentials_json: non_empty("GOOGLE_CREDENTIALS"),
        }
    }

    pub fn with_override_token(mut self, token: impl Into<String>) -> Self {
        self.override_token = Some(token.into());
        self
    }

    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    pub fn with_credentials_json(mut self, json: impl Into<String>) -> Self {
        self.credentials_json = Some(json.into());
        self
    }

    /// Resolve the identity source. Fails with a [`ConfigurationError`] when
    /// no source is configured, or [`CredentialError::Format`] when a source
    /// is configured but unusable.
    pub fn resolve(&self) -> Result<ResolvedIdentity, CredentialError> {
        if let Some(token) = &self.override_token {
            return Ok(ResolvedIdentity::Override(token.clone().into_bytes()));
        }

        if let Some(path) = &self.credentials_path {
            return ServiceAccountKey::from_file(path).map(ResolvedIdentity::ServiceAccount);
        }
        if let Some(json) = &self.credentials_json {
            return ServiceAccountKey::from_json(json).map(ResolvedIdentity::ServiceAccount);
        }
        if let Some(path) = &self.env_credentials_path {
            return ServiceAccountKey::from_file(path).map(ResolvedIdentity::ServiceAccount);
        }
        if let Some(json) = &self.env_credentials_json {
            return ServiceAccountKey::from_json(json).map(ResolvedIdentity::ServiceAccount);
        }

        Err(ConfigurationError::new(MISSING_CREDENTIALS).into())
    }
}
