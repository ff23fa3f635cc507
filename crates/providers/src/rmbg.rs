//! Background removal via the Hugging Face hosted RMBG-1.4 model.
//!
//! The raw image bytes are POSTed as the request body and the transparent
//! PNG comes back as the response body. A cold model answers 503 with an
//! `estimated_time` in seconds, surfaced as
//! [`GenerationError::WarmingUp`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::GenerationError;
use crate::provider::BackgroundRemover;

/// Default inference endpoint.
pub const DEFAULT_API_URL: &str =
    "https://api-inference.huggingface.co/models/briaai/RMBG-1.4";

#[derive(Debug, Default, Deserialize)]
struct LoadingBody {
    estimated_time: Option<f64>,
}

/// Parse the warm-up estimate out of a 503 body. Missing, negative,
/// non-finite or unrepresentable values yield `None`.
fn estimated_wait(body: &[u8]) -> Option<Duration> {
    let parsed: LoadingBody = serde_json::from_slice(body).unwrap_or_default();
    parsed
        .estimated_time
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// HTTP client for the background-removal model.
pub struct RmbgRemover {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl RmbgRemover {
    pub fn new(client: reqwest::Client, token: Option<String>) -> Self {
        Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            token,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

#[async_trait]
impl BackgroundRemover for RmbgRemover {
    fn name(&self) -> &str {
        "rmbg"
    }

    async fn remove_background(
        &self,
        image: &[u8],
        asset_id: &str,
    ) -> Result<Vec<u8>, GenerationError> {
        let token = self.token.as_deref().ok_or_else(|| {
            GenerationError::Unavailable("HUGGINGFACE_TOKEN is not configured".into())
        })?;

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(token)
            .body(image.to_vec())
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;

        match status {
            200 => {
                tracing::debug!(asset_id, bytes = body.len(), "Background removed");
                Ok(body.to_vec())
            }
            503 => Err(GenerationError::WarmingUp {
                estimated_wait: estimated_wait(&body),
            }),
            _ => Err(GenerationError::from_status(
                status,
                &String::from_utf8_lossy(&body),
            )),
        }
    }
}
