//! System routes and response hygiene.

use axum::extract::Request;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

const WILDCARD_ACCEPT_HEADER: &str = "*/*";

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum ServiceStatus {
    Alive,
    Ready,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: ServiceStatus,
}

async fn health() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: ServiceStatus::Alive,
    })
}

async fn readiness() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: ServiceStatus::Ready,
    })
}

/// Liveness/readiness endpoints, unauthenticated by design.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/readiness", get(readiness))
}

/// Log responses whose content-type is incompatible with the request's
/// `Accept` header. Observation only: nothing is rejected.
///
/// Basic validation covering the common cases; multiple mimetypes and
/// wildcard subtypes are not supported.
pub async fn validate_accept(req: Request, next: Next) -> Response {
    let accept = req
        .headers()
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(WILDCARD_ACCEPT_HEADER)
        .to_owned();
    let path = req.uri().path().to_owned();

    let response = next.run(req).await;

    if accept != WILDCARD_ACCEPT_HEADER {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_owned());

        if content_type.as_deref() != Some(accept.as_str()) {
            tracing::warn!(
                accept,
                content_type,
                path,
                "incompatible request Accept header and response content-type",
            );
        }
    }

    response
}
