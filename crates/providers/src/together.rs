//! General text-to-image provider backed by the Together.ai FLUX API.
//!
//! Submits `POST {api_url}/images/generations` and downloads the returned
//! image URL. Without a bearer token the provider degrades to the
//! deterministic placeholder from [`crate::imaging::placeholder_png`]
//! instead of failing.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;

use crate::error::GenerationError;
use crate::http::{download, parse_json};
use crate::imaging::{placeholder_png, GENERATION_HEIGHT, GENERATION_WIDTH};
use crate::provider::ImageProvider;

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "https://api.together.xyz/v1";
/// Default model.
pub const DEFAULT_MODEL: &str = "black-forest-labs/FLUX.1-schnell-Free";
/// Inference steps requested from the schnell model.
const STEPS: u32 = 4;

/// Response returned by the `/images/generations` endpoint.
#[derive(Debug, Deserialize)]
struct GenerationsResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: Option<String>,
    b64_json: Option<String>,
}

/// HTTP client for the general image provider.
pub struct TogetherProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
    token: Option<String>,
}

impl TogetherProvider {
    /// Create a provider using the default endpoint and model.
    pub fn new(client: reqwest::Client, token: Option<String>) -> Self {
        Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            token,
        }
    }

    /// Override the API base URL (e.g. a proxy or a test server).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "width": GENERATION_WIDTH,
            "height": GENERATION_HEIGHT,
            "steps": STEPS,
            "n": 1,
            "response_format": "url",
        })
    }

    async fn fetch_image(&self, image: GeneratedImage) -> Result<Vec<u8>, GenerationError> {
        if let Some(url) = image.url {
            return download(&self.client, &url).await;
        }
        if let Some(encoded) = image.b64_json {
            return base64::engine::general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| GenerationError::Permanent(format!("Invalid base64 image: {e}")));
        }
        Err(GenerationError::Permanent(
            "Generation result has neither url nor b64_json".into(),
        ))
    }
}

#[async_trait]
impl ImageProvider for TogetherProvider {
    fn name(&self) -> &str {
        "together"
    }

    fn has_credentials(&self) -> bool {
        self.token.is_some()
    }

    async fn generate(&self, prompt: &str, asset_id: &str) -> Result<Vec<u8>, GenerationError> {
        let Some(token) = self.token.as_deref() else {
            tracing::warn!(asset_id, "No Together token configured, using placeholder image");
            return placeholder_png();
        };

        let response = self
            .client
            .post(format!("{}/images/generations", self.api_url))
            .bearer_auth(token)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let parsed: GenerationsResponse = parse_json(response).await?;
        let image = parsed.data.into_iter().next().ok_or_else(|| {
            GenerationError::Permanent(format!("No image data in response for {asset_id}"))
        })?;

        tracing::debug!(asset_id, has_url = image.url.is_some(), "Together generation returned");
        self.fetch_image(image).await
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use image::GenericImageView;

    use super::*;

    fn provider(token: Option<&str>) -> TogetherProvider {
        TogetherProvider::new(reqwest::Client::new(), token.map(String::from))
            // Port 9 (discard) on localhost: connection refused, never a real call.
            .with_api_url("http://127.0.0.1:9")
    }

    #[tokio::test]
    async fn without_token_returns_placeholder() {
        let p = provider(None);
        assert!(!p.has_credentials());

        let bytes = p.generate("a dumbbell", "prop_1").await.unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!(img.dimensions(), (GENERATION_WIDTH, GENERATION_HEIGHT));
    }

    #[tokio::test]
    async fn connection_failure_is_transient() {
        let p = provider(Some("tok"));
        assert!(p.has_credentials());

        let err = p.generate("a dumbbell", "prop_1").await.unwrap_err();
        assert_matches!(err, GenerationError::Transient(_));
    }

    #[test]
    fn request_body_uses_fixed_resolution() {
        let body = provider(Some("tok")).with_model("m").request_body("a cat");
        assert_eq!(body["model"], "m");
        assert_eq!(body["prompt"], "a cat");
        assert_eq!(body["width"], 1024);
        assert_eq!(body["height"], 768);
        assert_eq!(body["response_format"], "url");
    }

    #[tokio::test]
    async fn b64_payload_is_decoded() {
        let p = provider(Some("tok"));
        let image = GeneratedImage {
            url: None,
            b64_json: Some(base64::engine::general_purpose::STANDARD.encode(b"png-bytes")),
        };
        assert_eq!(p.fetch_image(image).await.unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn empty_result_is_permanent() {
        let p = provider(Some("tok"));
        let image = GeneratedImage {
            url: None,
            b64_json: None,
        };
        assert_matches!(p.fetch_image(image).await, Err(GenerationError::Permanent(_)));
    }

    #[test]
    fn response_without_data_parses_empty() {
        let parsed: GenerationsResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.data.is_empty());
    }
}
