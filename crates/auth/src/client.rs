//! Authorized requests to the permission-decision endpoint.

use reqwest::{Client, Response};

/// Make a single authorized GET to `url`.
///
/// No retry and no timeout override beyond the transport default: retries,
/// if desired, belong to the caller.
pub async fn make_jwt_request(
    client: &Client,
    signed_jwt: &[u8],
    url: &str,
) -> Result<Response, reqwest::Error> {
    let bearer = String::from_utf8_lossy(signed_jwt);

    client
        .get(url)
        .header("Authorization", format!("Bearer {bearer}"))
        // Preserved quirk: the permission service expects text/html here,
        // not application/json.
        .header("content-type", "text/html")
        .send()
        .await
}
