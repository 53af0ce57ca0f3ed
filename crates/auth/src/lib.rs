//! `fluidly-auth` — outbound credential minting and permission checking.
//!
//! This crate consumes pre-verified claims (the API gateway verifies inbound
//! tokens upstream) and mints *outbound* assertions to ask the permission
//! service whether a caller may act on a resource. It is intentionally
//! decoupled from HTTP routing and storage.

pub mod claims;
pub mod client;
pub mod error;
pub mod identity;
pub mod jwt;
pub mod permissions;

pub use claims::{CLAIM_NAMESPACE, Claims};
pub use error::{ConfigurationError, CredentialError, PermissionError};
pub use identity::{IdentityConfig, ResolvedIdentity, ServiceAccountKey};
pub use jwt::{AUDIENCE, JwtMinter, TOKEN_LIFETIME_SECS, TokenMinter};
pub use permissions::{PermissionDecision, PermissionGate};
