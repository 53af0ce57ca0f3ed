//! Permission gate behaviour against a stubbed permission service.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use fluidly_auth::{
    Claims, CredentialError, PermissionDecision, PermissionError, PermissionGate, TokenMinter,
};

/// Minter that signs nothing and returns a fixed token.
struct StaticMinter;

impl TokenMinter for StaticMinter {
    fn mint(&self, _claims: &Claims) -> Result<Vec<u8>, CredentialError> {
        Ok(b"JWT_TOKEN".to_vec())
    }
}

#[derive(Clone)]
struct Upstream {
    status: StatusCode,
    body: Option<Value>,
    calls: Arc<AtomicUsize>,
}

async fn permissions_handler(
    State(upstream): State<Upstream>,
    headers: HeaderMap,
) -> axum::response::Response {
    upstream.calls.fetch_add(1, Ordering::SeqCst);

    // The client must send the signed assertion and the preserved
    // content-type quirk on every call.
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if authorization != "Bearer JWT_TOKEN" || content_type != "text/html" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "bad headers").into_response();
    }

    match upstream.body.clone() {
        Some(body) => (upstream.status, Json(body)).into_response(),
        None => (upstream.status, "this is not json").into_response(),
    }
}

struct StubPermissionService {
    base_url: String,
    calls: Arc<AtomicUsize>,
    handle: tokio::task::JoinHandle<()>,
}

impl StubPermissionService {
    async fn spawn(status: StatusCode, body: Option<Value>) -> Self {
        let calls = Arc::new(AtomicUsize::new(0));
        let upstream = Upstream {
            status,
            body,
            calls: calls.clone(),
        };

        let app = Router::new()
            .route(
                "/v1/user-permissions/connections/:connection_id",
                get(permissions_handler),
            )
            .route("/v1/user-permissions/admin", get(permissions_handler))
            .with_state(upstream);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            calls,
            handle,
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Drop for StubPermissionService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn gate_for(stub: &StubPermissionService) -> PermissionGate {
    PermissionGate::new(Arc::new(StaticMinter)).with_base_url(stub.base_url.clone())
}

fn user_claims() -> Claims {
    Claims::from_value(json!({
        "https://api.fluidly.com/email": "user@example.com",
        "https://api.fluidly.com/app_metadata": {"userId": 12},
    }))
}

fn service_account_claims() -> Claims {
    Claims::from_value(json!({
        "https://api.fluidly.com/internal_metadata": {"isServiceAccount": true},
    }))
}

#[tokio::test]
async fn granted_when_remote_grants_access() {
    let stub = StubPermissionService::spawn(StatusCode::OK, Some(json!({"grantAccess": true}))).await;
    let gate = gate_for(&stub);

    let decision = gate
        .check_connection(&user_claims(), "qbo:123")
        .await
        .unwrap();

    assert_eq!(decision, PermissionDecision::Granted);
    assert_eq!(stub.call_count(), 1);
}

#[tokio::test]
async fn denied_when_remote_declines_without_error() {
    let stub = StubPermissionService::spawn(
        StatusCode::OK,
        Some(json!({"grantAccess": false, "reason": "Being impolite"})),
    )
    .await;
    let gate = gate_for(&stub);

    let decision = gate
        .check_connection(&user_claims(), "qbo:123")
        .await
        .unwrap();

    assert_eq!(decision, PermissionDecision::Denied);
}

#[tokio::test]
async fn denied_when_grant_access_is_missing() {
    let stub = StubPermissionService::spawn(StatusCode::OK, Some(json!({}))).await;
    let gate = gate_for(&stub);

    let decision = gate
        .check_connection(&user_claims(), "qbo:123")
        .await
        .unwrap();

    assert_eq!(decision, PermissionDecision::Denied);
}

#[tokio::test]
async fn server_error_escalates_as_payload_invalid() {
    let stub = StubPermissionService::spawn(StatusCode::INTERNAL_SERVER_ERROR, None).await;
    let gate = gate_for(&stub);

    let err = gate
        .check_connection(&user_claims(), "qbo:123")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PermissionError::PayloadInvalid { status: 500 }
    ));
}

#[tokio::test]
async fn non_json_body_escalates_as_payload_invalid() {
    let stub = StubPermissionService::spawn(StatusCode::OK, None).await;
    let gate = gate_for(&stub);

    let err = gate
        .check_connection(&user_claims(), "qbo:123")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PermissionError::PayloadInvalid { status: 200 }
    ));
}

#[tokio::test]
async fn transport_failure_escalates_as_request_failed() {
    // Nothing is listening on port 1.
    let gate = PermissionGate::new(Arc::new(StaticMinter)).with_base_url("http://127.0.0.1:1");

    let err = gate
        .check_connection(&user_claims(), "qbo:123")
        .await
        .unwrap_err();

    assert!(matches!(err, PermissionError::RequestFailed(_)));
}

#[tokio::test]
async fn service_accounts_bypass_the_remote_check() {
    let stub = StubPermissionService::spawn(StatusCode::OK, Some(json!({"grantAccess": false}))).await;
    let gate = gate_for(&stub);

    let decision = gate
        .check_connection(&service_account_claims(), "qbo:123")
        .await
        .unwrap();

    assert_eq!(decision, PermissionDecision::Granted);
    assert_eq!(stub.call_count(), 0);

    let decision = gate.check_admin(&service_account_claims()).await.unwrap();
    assert_eq!(decision, PermissionDecision::Granted);
    assert_eq!(stub.call_count(), 0);
}

#[tokio::test]
async fn admin_check_works_against_the_admin_endpoint() {
    let stub = StubPermissionService::spawn(StatusCode::OK, Some(json!({"grantAccess": true}))).await;
    let gate = gate_for(&stub);

    let decision = gate.check_admin(&user_claims()).await.unwrap();

    assert_eq!(decision, PermissionDecision::Granted);
    assert_eq!(stub.call_count(), 1);
}

#[tokio::test]
async fn missing_base_url_fails_before_any_network_call() {
    // No pinned base URL and FLUIDLY_API_URL is not set in the test
    // environment: the check must fail fast with a configuration error.
    let gate = PermissionGate::new(Arc::new(StaticMinter));

    let err = gate.check_admin(&user_claims()).await.unwrap_err();

    match err {
        PermissionError::Configuration(e) => {
            assert!(e.to_string().contains("FLUIDLY_API_URL"));
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
}
