//! Shared HTTP plumbing for the provider adapters.

use std::time::Duration;

use crate::error::GenerationError;

/// Build the HTTP client shared by every adapter.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, GenerationError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GenerationError::Permanent(format!("Failed to build HTTP client: {e}")))
}

/// Ensure the response has a success status code. Returns the response
/// unchanged on success, or a classified error carrying the status and
/// body text on failure.
pub async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, GenerationError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(GenerationError::from_status(status.as_u16(), &body));
    }
    Ok(response)
}

/// Parse a successful JSON response body into the expected type.
///
/// A body that does not match `T` is a permanent failure.
pub async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, GenerationError> {
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| GenerationError::Permanent(format!("Malformed provider response: {e}")))
}

/// Download a generated image from a provider-hosted URL.
pub async fn download(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, GenerationError> {
    let response = ensure_success(client.get(url).send().await?).await?;
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Err(GenerationError::Permanent(format!(
            "Downloaded image from {url} is empty"
        )));
    }
    Ok(bytes.to_vec())
}
