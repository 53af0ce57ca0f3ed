//! Credential minter: short-lived signed assertions for outbound calls.
//!
//! One assertion is minted per outbound permission call and discarded after
//! the call returns. Nothing is cached; the cost of signing is accepted per
//! call. Assertions are valid for exactly 3600 seconds with no clock-skew
//! leeway — callers tolerate expiry via retry, not extended validity.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Map, Value};

use crate::claims::Claims;
use crate::error::CredentialError;
use crate::identity::{IdentityConfig, ResolvedIdentity, ServiceAccountKey};

/// Fixed audience of every minted assertion.
pub const AUDIENCE: &str = "https://api.fluidly.com";

/// Assertion lifetime in seconds.
pub const TOKEN_LIFETIME_SECS: i64 = 3600;

/// Seam the permission gate mints through.
///
/// Production uses [`JwtMinter`]; tests substitute a static implementation
/// instead of monkey-patching process state.
pub trait TokenMinter: Send + Sync {
    fn mint(&self, claims: &Claims) -> Result<Vec<u8>, CredentialError>;
}

/// Signs a finished claim set. Split out so claim injection is testable
/// without key material.
trait Signer {
    fn sign(&self, payload: &Map<String, Value>) -> Result<Vec<u8>, CredentialError>;
}

struct RsaSigner {
    key: EncodingKey,
}

impl RsaSigner {
    fn from_service_account(key: &ServiceAccountKey) -> Result<Self, CredentialError> {
        let key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| CredentialError::format(format!("invalid private key: {e}")))?;
        Ok(Self { key })
    }
}

impl Signer for RsaSigner {
    fn sign(&self, payload: &Map<String, Value>) -> Result<Vec<u8>, CredentialError> {
        let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), payload, &self.key)
            .map_err(|e| CredentialError::format(format!("signing failed: {e}")))?;
        Ok(token.into_bytes())
    }
}

/// Mints signed assertions from a configured service identity.
#[derive(Debug)]
pub struct JwtMinter {
    config: IdentityConfig,
}

impl JwtMinter {
    pub fn new(config: IdentityConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(IdentityConfig::from_env())
    }

    fn mint_at(&self, claims: &Claims, now: DateTime<Utc>) -> Result<Vec<u8>, CredentialError> {
        match self.config.resolve()? {
            ResolvedIdentity::Override(token) => Ok(token),
            ResolvedIdentity::ServiceAccount(key) => {
                let signer = RsaSigner::from_service_account(&key)?;
                mint_signed(claims, &key.client_email, &signer, now)
            }
        }
    }
}

impl TokenMinter for JwtMinter {
    fn mint(&self, claims: &Claims) -> Result<Vec<u8>, CredentialError> {
        self.mint_at(claims, Utc::now())
    }
}

/// Build the assertion claim set from the caller's claims.
///
/// The five injected fields always win on key collision: the caller's
/// `iat`/`exp`/`iss`/`sub`/`aud`/`email` are overwritten, not preserved.
fn assertion_claims(claims: &Claims, service_account_email: &str, now: DateTime<Utc>) -> Map<String, Value> {
    let iat = now.timestamp();
    let mut payload = claims.raw().clone();
    payload.insert("iat".into(), Value::from(iat));
    payload.insert("exp".into(), Value::from(iat + TOKEN_LIFETIME_SECS));
    payload.insert("iss".into(), Value::from(service_account_email));
    payload.insert("aud".into(), Value::from(AUDIENCE));
    payload.insert("sub".into(), Value::from(service_account_email));
    payload.insert("email".into(), Value::from(service_account_email));
    payload
}

fn mint_signed(
    claims: &Claims,
    service_account_email: &str,
    signer: &dyn Signer,
    now: DateTime<Utc>,
) -> Result<Vec<u8>, CredentialError> {
    signer.sign(&assertion_claims(claims, service_account_email, now))
}
