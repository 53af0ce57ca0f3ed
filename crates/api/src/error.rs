//! API error model.
//!
//! Every failure that crosses the HTTP boundary becomes an [`ApiError`];
//! unexpected internals are collapsed into a generic 500 so no internal
//! error text reaches the client.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, Clone, thiserror::Error)]
#[error("{status}: {title}")]
pub struct ApiError {
    pub status: StatusCode,
    pub title: String,
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, title: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// No identity envelope present (or one that cannot be decoded).
    pub fn unauthenticated() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "User is not authenticated")
    }

    /// A clean denial from the permission service.
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "User cannot access this resource")
    }

    /// The permission check itself failed. Deliberately a 403-class
    /// response, not a 500: "unknown" must not leak failure detail.
    pub fn permissions_unavailable() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "An issue occurred while fetching permissions",
        )
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "An unknown error occurred")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "title": self.title,
                "status": self.status.as_u16(),
                "detail": self.detail,
            })),
        )
            .into_response()
    }
}
