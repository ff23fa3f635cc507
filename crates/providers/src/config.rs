use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use kinetic_core::CoreError;

use crate::error::GenerationError;
use crate::http::build_client;
use crate::identity::{self, IdentityProvider};
use crate::rmbg::{self, RmbgRemover};
use crate::router::ProviderRouter;
use crate::together::{self, TogetherProvider};

/// Credentials and endpoints for every generation backend.
///
/// Tokens are optional: a missing general token degrades to placeholder
/// images, a missing identity or background-removal token makes those
/// backends report themselves unavailable.
#[derive(Clone)]
pub struct ProviderConfig {
    pub together_token: Option<String>,
    pub together_api_url: String,
    pub together_model: String,
    pub identity_token: Option<String>,
    pub identity_api_url: String,
    pub identity_model: String,
    /// Reference portrait sent with every avatar prompt.
    pub avatar_reference_path: PathBuf,
    pub huggingface_token: Option<String>,
    pub rmbg_api_url: String,
    /// Per-request HTTP timeout (default: `60` seconds).
    pub request_timeout: Duration,
}

impl ProviderConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                                      |
    /// |-------------------------|----------------------------------------------|
    /// | `TOGETHER_BEARER_TOKEN` | unset (placeholder images)                   |
    /// | `TOGETHER_API_URL`      | `https://api.together.xyz/v1`                |
    /// | `TOGETHER_MODEL`        | `black-forest-labs/FLUX.1-schnell-Free`      |
    /// | `REPLICATE_API_TOKEN`   | unset (avatars unavailable)                  |
    /// | `IDENTITY_API_URL`      | `https://api.replicate.com/v1`               |
    /// | `IDENTITY_MODEL`        | `zsxkib/instant-id`                          |
    /// | `AVATAR_REFERENCE_PATH` | `public/base_avatar.png`                     |
    /// | `HUGGINGFACE_TOKEN`     | unset (background removal skipped)           |
    /// | `RMBG_API_URL`          | Hugging Face RMBG-1.4 inference endpoint     |
    /// | `PROVIDER_TIMEOUT_SECS` | `60`                                         |
    ///
    /// Empty token values count as unset.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable
    /// source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or_default = |key: &str, default: &str| token(key).unwrap_or_else(|| default.to_string());

        let timeout_secs: u64 = match token("PROVIDER_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|_| {
                CoreError::Validation(format!(
                    "PROVIDER_TIMEOUT_SECS must be a positive integer, got '{raw}'"
                ))
            })?,
            None => 60,
        };
        if timeout_secs == 0 {
            return Err(CoreError::Validation(
                "PROVIDER_TIMEOUT_SECS must be greater than zero".into(),
            ));
        }

        Ok(Self {
            together_token: token("TOGETHER_BEARER_TOKEN"),
            together_api_url: or_default("TOGETHER_API_URL", together::DEFAULT_API_URL),
            together_model: or_default("TOGETHER_MODEL", together::DEFAULT_MODEL),
            identity_token: token("REPLICATE_API_TOKEN"),
            identity_api_url: or_default("IDENTITY_API_URL", identity::DEFAULT_API_URL),
            identity_model: or_default("IDENTITY_MODEL", identity::DEFAULT_MODEL),
            avatar_reference_path: PathBuf::from(or_default(
                "AVATAR_REFERENCE_PATH",
                identity::DEFAULT_REFERENCE_PATH,
            )),
            huggingface_token: token("HUGGINGFACE_TOKEN"),
            rmbg_api_url: or_default("RMBG_API_URL", rmbg::DEFAULT_API_URL),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn http_client(&self) -> Result<reqwest::Client, GenerationError> {
        build_client(self.request_timeout)
    }

    /// Build the role router over the configured HTTP providers.
    pub fn router(&self, client: &reqwest::Client) -> ProviderRouter {
        let general = TogetherProvider::new(client.clone(), self.together_token.clone())
            .with_api_url(&self.together_api_url)
            .with_model(&self.together_model);
        let identity = IdentityProvider::new(
            client.clone(),
            self.identity_token.clone(),
            self.avatar_reference_path.clone(),
        )
        .with_api_url(&self.identity_api_url)
        .with_model(&self.identity_model);
        ProviderRouter::new(Arc::new(general), Arc::new(identity))
    }

    pub fn background_remover(&self, client: &reqwest::Client) -> RmbgRemover {
        RmbgRemover::new(client.clone(), self.huggingface_token.clone())
            .with_api_url(&self.rmbg_api_url)
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Tokens are reported as present/absent only.
        f.debug_struct("ProviderConfig")
            .field("together_token", &self.together_token.is_some())
            .field("together_api_url", &self.together_api_url)
            .field("together_model", &self.together_model)
            .field("identity_token", &self.identity_token.is_some())
            .field("identity_api_url", &self.identity_api_url)
            .field("identity_model", &self.identity_model)
            .field("avatar_reference_path", &self.avatar_reference_path)
            .field("huggingface_token", &self.huggingface_token.is_some())
            .field("rmbg_api_url", &self.rmbg_api_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<ProviderConfig, CoreError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ProviderConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = from_pairs(&[]).unwrap();
        assert!(cfg.together_token.is_none());
        assert!(cfg.identity_token.is_none());
        assert!(cfg.huggingface_token.is_none());
        assert_eq!(cfg.together_model, together::DEFAULT_MODEL);
        assert_eq!(cfg.identity_api_url, "https://api.replicate.com/v1");
        assert_eq!(cfg.avatar_reference_path, PathBuf::from("public/base_avatar.png"));
        assert_eq!(cfg.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn empty_token_counts_as_unset() {
        let cfg = from_pairs(&[("TOGETHER_BEARER_TOKEN", "  "), ("HUGGINGFACE_TOKEN", "hf")]).unwrap();
        assert!(cfg.together_token.is_none());
        assert_eq!(cfg.huggingface_token.as_deref(), Some("hf"));
    }

    #[test]
    fn bad_timeout_is_validation_error() {
        assert_matches!(
            from_pairs(&[("PROVIDER_TIMEOUT_SECS", "soon")]),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            from_pairs(&[("PROVIDER_TIMEOUT_SECS", "0")]),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn debug_hides_tokens() {
        let cfg = from_pairs(&[("REPLICATE_API_TOKEN", "r8_secret")]).unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("r8_secret"));
        assert!(rendered.contains("identity_token: true"));
    }

    #[test]
    fn router_reflects_credentials() {
        let cfg = from_pairs(&[("TOGETHER_BEARER_TOKEN", "t")]).unwrap();
        let client = cfg.http_client().unwrap();
        let router = cfg.router(&client);
        assert!(router.general().has_credentials());
        assert!(!router.identity().has_credentials());
    }
}
