//! Provider contracts.
//!
//! The pipeline talks to generation backends only through these traits so
//! that routing, retry and failure handling can be exercised without a
//! network.

use async_trait::async_trait;

use crate::error::GenerationError;

/// A backend that turns a prompt into image bytes.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Short name used in log messages.
    fn name(&self) -> &str;

    /// Whether credentials for the backend are configured. An
    /// unconfigured provider either degrades (placeholder) or reports
    /// [`GenerationError::Unavailable`].
    fn has_credentials(&self) -> bool {
        true
    }

    /// Generate one image for `asset_id`.
    async fn generate(&self, prompt: &str, asset_id: &str) -> Result<Vec<u8>, GenerationError>;
}

/// A backend that strips the background from an image, returning a
/// transparent PNG.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    fn name(&self) -> &str;

    /// Make one extraction attempt. Retrying is the caller's business.
    async fn remove_background(
        &self,
        image: &[u8],
        asset_id: &str,
    ) -> Result<Vec<u8>, GenerationError>;
}
