//! `fluidly-api` — the HTTP boundary for authorised services.
//!
//! Extracts the gateway-forwarded identity envelope, gates requests through
//! the permission service, and maps every failure into a response that
//! suppresses internal detail.

pub mod auth;
pub mod context;
pub mod error;
pub mod system;
pub mod user_info;

pub use auth::{AuthState, admin, authorised};
pub use context::{AdminUser, AuthorisedUser};
pub use error::ApiError;
pub use user_info::{USER_INFO_HEADER, UserInfoError, base64_decode_padded, decode_user_info};
