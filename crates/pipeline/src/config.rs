use std::path::PathBuf;
use std::time::Duration;

use kinetic_core::CoreError;
use kinetic_providers::retry::Backoff;
use kinetic_providers::RetryPolicy;

/// Default asset directory.
pub const DEFAULT_ASSET_DIR: &str = "public/assets";

/// File system layout and retry tunables for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Where generated assets are stored. `final_render.json` is written
    /// to its parent.
    pub asset_dir: PathBuf,
    /// Root of the renderer project receiving the hand-off, if any.
    pub renderer_dir: Option<PathBuf>,
    pub generation_max_attempts: u32,
    /// Base of the exponential generation backoff.
    pub generation_backoff_unit: Duration,
    pub background_max_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from(DEFAULT_ASSET_DIR),
            renderer_dir: None,
            generation_max_attempts: 3,
            generation_backoff_unit: Duration::from_secs(1),
            background_max_attempts: 5,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default         |
    /// |-----------------------------|-----------------|
    /// | `ASSET_DIR`                 | `public/assets` |
    /// | `RENDERER_DIR`              | unset (no hand-off) |
    /// | `GENERATION_MAX_ATTEMPTS`   | `3`             |
    /// | `GENERATION_BACKOFF_MS`     | `1000`          |
    /// | `BACKGROUND_MAX_ATTEMPTS`   | `5`             |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let generation_backoff_ms = parse_positive(&value, "GENERATION_BACKOFF_MS", 1000)?;

        Ok(Self {
            asset_dir: value("ASSET_DIR").map(PathBuf::from).unwrap_or(defaults.asset_dir),
            renderer_dir: value("RENDERER_DIR").map(PathBuf::from),
            generation_max_attempts: parse_positive(
                &value,
                "GENERATION_MAX_ATTEMPTS",
                defaults.generation_max_attempts.into(),
            )? as u32,
            generation_backoff_unit: Duration::from_millis(generation_backoff_ms),
            background_max_attempts: parse_positive(
                &value,
                "BACKGROUND_MAX_ATTEMPTS",
                defaults.background_max_attempts.into(),
            )? as u32,
        })
    }

    /// Policy wrapped around every image generation call.
    pub fn generation_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.generation_max_attempts,
            backoff: Backoff::Exponential {
                unit: self.generation_backoff_unit,
            },
            ..RetryPolicy::generation()
        }
    }

    /// Policy wrapped around every background removal call.
    pub fn background_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.background_max_attempts,
            ..RetryPolicy::background_removal()
        }
    }
}

fn parse_positive<F>(value: &F, key: &str, default: u64) -> Result<u64, CoreError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = value(key) else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(n) if n > 0 && n <= u64::from(u32::MAX) => Ok(n),
        _ => Err(CoreError::Validation(format!(
            "{key} must be a positive integer, got '{raw}'"
        ))),
    }
}
