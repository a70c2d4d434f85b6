//! Shared reqwest plumbing for the service clients.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

const USER_AGENT: &str = concat!("robot-rag/", env!("CARGO_PKG_VERSION"));

/// Build a client whose own timeout backs up the orchestrator's.
pub fn build_client(timeout: Duration) -> std::result::Result<Client, String> {
    Client::builder()
        .timeout(timeout.max(Duration::from_millis(1)))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|err| format!("http client: {err}"))
}

/// Join a base URL and a path without doubling slashes.
pub fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub fn bearer(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) if !token.is_empty() => request.bearer_auth(token),
        _ => request,
    }
}

/// Send a request and decode a JSON body, flattening every failure into a
/// message the caller wraps in its own error variant.
pub async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
) -> std::result::Result<T, String> {
    let response = request
        .send()
        .await
        .map_err(|err| format!("request failed: {err}"))?;
    let response = check_status(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|err| format!("response parse: {err}"))
}

async fn check_status(response: Response) -> std::result::Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    if snippet.is_empty() {
        Err(format!("HTTP {status}"))
    } else {
        Err(format!("HTTP {status}: {snippet}"))
    }
}
