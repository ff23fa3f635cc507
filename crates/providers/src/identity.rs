//! Identity-preserving provider for avatar assets.
//!
//! Sends the fixed reference portrait together with the prompt to a
//! Replicate-hosted InstantID model so that every avatar shot keeps the
//! same face. Uses the synchronous `Prefer: wait` mode of the predictions
//! API; a prediction that is still running when the server gives up
//! waiting is reported as transient and retried.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;

use crate::error::GenerationError;
use crate::http::{download, parse_json};
use crate::imaging::mime_type;
use crate::provider::ImageProvider;

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "https://api.replicate.com/v1";
/// Default identity model (`owner/name`).
pub const DEFAULT_MODEL: &str = "zsxkib/instant-id";
/// Reference portrait used when none is configured.
pub const DEFAULT_REFERENCE_PATH: &str = "public/base_avatar.png";

#[derive(Debug, Deserialize)]
struct Prediction {
    status: String,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl Prediction {
    /// First output URL. The model returns either a single URL or a list.
    fn output_url(&self) -> Option<&str> {
        match self.output.as_ref()? {
            serde_json::Value::String(url) => Some(url),
            serde_json::Value::Array(items) => items.first()?.as_str(),
            _ => None,
        }
    }
}

/// HTTP client for the identity-preserving provider.
pub struct IdentityProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
    token: Option<String>,
    reference_path: PathBuf,
}

impl IdentityProvider {
    pub fn new(client: reqwest::Client, token: Option<String>, reference_path: PathBuf) -> Self {
        Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            token,
            reference_path,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Read the reference portrait and encode it as a data URI.
    async fn reference_data_uri(&self) -> Result<String, GenerationError> {
        let bytes = tokio::fs::read(&self.reference_path).await.map_err(|e| {
            GenerationError::Unavailable(format!(
                "Reference image {} not readable: {e}",
                self.reference_path.display()
            ))
        })?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        Ok(format!("data:{};base64,{encoded}", mime_type(&bytes)))
    }
}

#[async_trait]
impl ImageProvider for IdentityProvider {
    fn name(&self) -> &str {
        "identity"
    }

    fn has_credentials(&self) -> bool {
        self.token.is_some()
    }

    async fn generate(&self, prompt: &str, asset_id: &str) -> Result<Vec<u8>, GenerationError> {
        let token = self.token.as_deref().ok_or_else(|| {
            GenerationError::Unavailable("REPLICATE_API_TOKEN is not configured".into())
        })?;
        let image = self.reference_data_uri().await?;

        let body = serde_json::json!({
            "input": {
                "image": image,
                "prompt": prompt,
            }
        });

        let response = self
            .client
            .post(format!("{}/models/{}/predictions", self.api_url, self.model))
            .bearer_auth(token)
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await?;

        let prediction: Prediction = parse_json(response).await?;
        tracing::debug!(asset_id, status = %prediction.status, "Identity prediction returned");

        match prediction.status.as_str() {
            "succeeded" => {
                let url = prediction.output_url().ok_or_else(|| {
                    GenerationError::Permanent(format!(
                        "Identity prediction for {asset_id} succeeded without output"
                    ))
                })?;
                download(&self.client, url).await
            }
            "failed" | "canceled" => Err(GenerationError::Permanent(format!(
                "Identity prediction {}: {}",
                prediction.status,
                prediction
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no error detail".into())
            ))),
            other => Err(GenerationError::Transient(format!(
                "Identity prediction still {other}"
            ))),
        }
    }
}
