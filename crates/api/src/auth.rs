//! Authorisation middleware.
//!
//! Ordering is fixed: extract the identity envelope (401 on absence), then
//! ask the permission gate (403 on denial, generic 403 on gate failure),
//! then attach the caller's identity to the request and continue. Routes
//! behind `authorised` must declare a `:connection_id` path parameter.

use std::sync::Arc;

use axum::RequestExt;
use axum::extract::{RawPathParams, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use fluidly_auth::{Claims, PermissionGate};

use crate::context::{AdminUser, AuthorisedUser};
use crate::error::ApiError;
use crate::user_info::{USER_INFO_HEADER, decode_user_info};

/// Gate shared by the auth middlewares, owned by the composition root.
#[derive(Clone)]
pub struct AuthState {
    pub gate: Arc<PermissionGate>,
}

impl AuthState {
    pub fn new(gate: Arc<PermissionGate>) -> Self {
        Self { gate }
    }
}

fn claims_from_headers(headers: &HeaderMap) -> Result<Claims, ApiError> {
    let encoded = headers
        .get(USER_INFO_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(ApiError::unauthenticated)?;

    decode_user_info(encoded).map_err(|err| {
        tracing::warn!(error = %err, "undecodable user info header");
        ApiError::unauthenticated()
    })
}

/// Per-connection authorisation.
pub async fn authorised(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = claims_from_headers(req.headers())?;

    let params: RawPathParams = req
        .extract_parts()
        .await
        .map_err(|_| ApiError::internal())?;
    let connection_id = params
        .iter()
        .find(|(name, _)| *name == "connection_id")
        .map(|(_, value)| value.to_string())
        .ok_or_else(ApiError::internal)?;

    match state.gate.check_connection(&claims, &connection_id).await {
        Ok(decision) if decision.is_granted() => {}
        Ok(_) => return Err(ApiError::forbidden()),
        Err(err) => {
            tracing::warn!(error = %err, connection_id, "permission check failed");
            return Err(ApiError::permissions_unavailable());
        }
    }

    req.extensions_mut().insert(AuthorisedUser {
        connection_id,
        user_id: claims.user_id().cloned(),
        email: claims.email().map(str::to_owned),
        name: claims.name().map(str::to_owned),
    });

    Ok(next.run(req).await)
}

/// Admin authorisation (no specific resource).
pub async fn admin(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = claims_from_headers(req.headers())?;

    match state.gate.check_admin(&claims).await {
        Ok(decision) if decision.is_granted() => {}
        Ok(_) => return Err(ApiError::forbidden()),
        Err(err) => {
            tracing::warn!(error = %err, "admin permission check failed");
            return Err(ApiError::permissions_unavailable());
        }
    }

    req.extensions_mut().insert(AdminUser {
        user_id: claims.user_id().cloned(),
        email: claims.email().map(str::to_owned),
        name: claims.name().map(str::to_owned),
    });

    Ok(next.run(req).await)
}
