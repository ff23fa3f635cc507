//! Background removal stage.
//!
//! Turns the raw bytes of a freshly generated image into the stored asset.
//! A transparent cut-out is preferred; when extraction fails for any
//! reason the original image is stored instead and the asset still counts
//! as generated. Only a failure to persist is fatal.

use std::sync::Arc;

use kinetic_events::{LogEvent, LogSink};
use kinetic_providers::imaging::sniff_format;
use kinetic_providers::{with_retry, BackgroundRemover, GenerationError, RetryPolicy, Sleeper};

use crate::error::StoreError;
use crate::store::AssetStore;

/// How an asset ended up being stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundOutcome {
    /// The cut-out was stored.
    Transparent,
    /// Extraction failed; the original bytes were stored.
    Opaque { reason: String },
}

pub struct BackgroundStage {
    remover: Arc<dyn BackgroundRemover>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl BackgroundStage {
    pub fn new(
        remover: Arc<dyn BackgroundRemover>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            remover,
            policy,
            sleeper,
        }
    }

    /// Remove the background from `bytes` and store the result under
    /// `asset_id`.
    pub async fn process(
        &self,
        store: &AssetStore,
        sink: &dyn LogSink,
        bytes: &[u8],
        asset_id: &str,
    ) -> Result<BackgroundOutcome, StoreError> {
        sink.emit(LogEvent::info(format!("Removing background for {asset_id}...")).with_asset(asset_id));

        match self.extract(sink, bytes, asset_id).await {
            Ok(transparent) => {
                store.write(asset_id, &transparent)?;
                sink.emit(
                    LogEvent::info(format!("✓ Asset {asset_id} saved with transparent background"))
                        .with_asset(asset_id),
                );
                Ok(BackgroundOutcome::Transparent)
            }
            Err(reason) => {
                store.write(asset_id, bytes)?;
                sink.emit(
                    LogEvent::warn(format!(
                        "Background removal failed for {asset_id} ({reason}), saved original image"
                    ))
                    .with_asset(asset_id),
                );
                Ok(BackgroundOutcome::Opaque { reason })
            }
        }
    }

    /// Run the remover under the retry policy and check the payload.
    /// Any failure comes back as a human-readable reason.
    async fn extract(
        &self,
        sink: &dyn LogSink,
        bytes: &[u8],
        asset_id: &str,
    ) -> Result<Vec<u8>, String> {
        let remover = self.remover.as_ref();
        let on_wait = |wait: &kinetic_providers::RetryWait<'_>| {
            let message = match wait.error {
                GenerationError::WarmingUp { .. } => format!(
                    "⏳ Model loading... waiting {:.1}s (attempt {}/{})",
                    wait.delay.as_secs_f64(),
                    wait.attempt,
                    wait.max_attempts
                ),
                other => format!(
                    "Background removal attempt {}/{} failed: {other}. Retrying in {:.1}s...",
                    wait.attempt,
                    wait.max_attempts,
                    wait.delay.as_secs_f64()
                ),
            };
            sink.emit(LogEvent::warn(message).with_asset(asset_id));
        };

        let output = with_retry(&self.policy, self.sleeper.as_ref(), on_wait, |_| {
            remover.remove_background(bytes, asset_id)
        })
        .await
        .map_err(|e| e.to_string())?;

        match sniff_format(&output) {
            Some(format) => {
                tracing::debug!(asset_id, ?format, "Background removal payload accepted");
                Ok(output)
            }
            None => Err(format!(
                "{} returned an unrecognised payload ({} bytes)",
                self.remover.name(),
                output.len()
            )),
        }
    }
}
