//! Permission gate: the one decision function callers go through.
//!
//! Policy is fixed here: service accounts bypass the remote check entirely
//! (service-to-service calls self-attest and are not re-checked), everyone
//! else is checked against the remote permission service, and anything that
//! is neither a clean grant nor a clean denial escalates as an error the
//! caller can pattern-match without knowing the transport.

use std::sync::Arc;

use fluidly_observability::timing::Stopwatch;
use reqwest::StatusCode;
use serde_json::Value;

use crate::claims::Claims;
use crate::client::make_jwt_request;
use crate::error::{ConfigurationError, PermissionError};
use crate::jwt::{JwtMinter, TokenMinter};

/// Outcome of a permission check.
///
/// `Denied` is a normal outcome, not an error; transport failures and
/// unexpected response shapes surface as [`PermissionError`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Granted,
    Denied,
}

impl PermissionDecision {
    pub fn is_granted(self) -> bool {
        matches!(self, PermissionDecision::Granted)
    }
}

/// Checks whether an identity may act on a resource.
///
/// Owned by the composition root and passed by reference into whatever needs
/// it; the minter is injectable so tests never monkey-patch process state.
/// The HTTP client handle is created once and reused across calls.
pub struct PermissionGate {
    minter: Arc<dyn TokenMinter>,
    http: reqwest::Client,
    base_url: Option<String>,
}

impl PermissionGate {
    pub fn new(minter: Arc<dyn TokenMinter>) -> Self {
        Self {
            minter,
            http: reqwest::Client::new(),
            base_url: None,
        }
    }

    /// Gate wired from the environment (credentials env vars for the minter,
    /// `FLUIDLY_API_URL` resolved lazily at call time).
    pub fn from_env() -> Self {
        Self::new(Arc::new(JwtMinter::from_env()))
    }

    /// Pin the permission-service base URL instead of reading
    /// `FLUIDLY_API_URL` at call time.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn resolve_base_url(&self) -> Result<String, ConfigurationError> {
        if let Some(url) = &self.base_url {
            return Ok(url.clone());
        }
        std::env::var("FLUIDLY_API_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigurationError::new("FLUIDLY_API_URL"))
    }

    /// May this identity act on the given connection?
    pub async fn check_connection(
        &self,
        claims: &Claims,
        connection_id: &str,
    ) -> Result<PermissionDecision, PermissionError> {
        if claims.is_service_account() {
            return Ok(PermissionDecision::Granted);
        }

        let base_url = self.resolve_base_url()?;
        let url = format!("{base_url}/v1/user-permissions/connections/{connection_id}");
        self.evaluate(claims, &url, Some(connection_id)).await
    }

    /// May this identity act as an admin (no specific resource)?
    pub async fn check_admin(&self, claims: &Claims) -> Result<PermissionDecision, PermissionError> {
        if claims.is_service_account() {
            return Ok(PermissionDecision::Granted);
        }

        let base_url = self.resolve_base_url()?;
        let url = format!("{base_url}/v1/user-permissions/admin");
        self.evaluate(claims, &url, None).await
    }

    async fn evaluate(
        &self,
        claims: &Claims,
        url: &str,
        connection_id: Option<&str>,
    ) -> Result<PermissionDecision, PermissionError> {
        let watch = Stopwatch::start();

        let signed_jwt = self.minter.mint(claims)?;

        let response = make_jwt_request(&self.http, &signed_jwt, url)
            .await
            .map_err(PermissionError::RequestFailed)?;

        let duration = watch.elapsed_secs();
        let status = response.status();
        let response_headers = format!("{:?}", response.headers());
        // Forwarded verbatim for audit, PII included (recorded decision).
        let original_payload = Value::Object(claims.raw().clone()).to_string();

        if status != StatusCode::OK {
            tracing::warn!(
                url,
                connection_id,
                status_code = status.as_u16(),
                response_headers,
                original_payload,
                duration,
                "authorisation failed",
            );
            return Err(PermissionError::PayloadInvalid {
                status: status.as_u16(),
            });
        }

        let response_json: Value = match response.json().await {
            Ok(body) => body,
            Err(_) => {
                tracing::warn!(
                    url,
                    connection_id,
                    status_code = status.as_u16(),
                    response_headers,
                    original_payload,
                    duration,
                    "authorisation failed: response body is not JSON",
                );
                return Err(PermissionError::PayloadInvalid {
                    status: status.as_u16(),
                });
            }
        };

        let granted = response_json
            .get("grantAccess")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if !granted {
            tracing::warn!(
                url,
                connection_id,
                status_code = status.as_u16(),
                response_json = %response_json,
                response_headers,
                original_payload,
                duration,
                "authorisation failed",
            );
            return Ok(PermissionDecision::Denied);
        }

        tracing::info!(
            url,
            connection_id,
            status_code = status.as_u16(),
            response_json = %response_json,
            duration,
            "called user permissions",
        );
        Ok(PermissionDecision::Granted)
    }
}
