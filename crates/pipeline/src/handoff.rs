//! Hand-off of a finished run to the renderer project.
//!
//! Renderer layout:
//!
//! ```text
//! <renderer>/
//!   src/final_render.json
//!   public/assets/{id}.png
//!   public/audio/{file}
//! ```
//!
//! Assets are copied, never moved, so the asset store stays authoritative
//! for the next run's idempotency check.

use std::path::{Path, PathBuf};

use kinetic_core::naming::RENDERER_ASSET_DIR;
use kinetic_core::FinalRenderConfig;

use crate::error::StoreError;
use crate::store::{AssetStore, RENDER_CONFIG_FILE};

/// What [`RendererHandoff::deliver`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffReport {
    pub config_path: PathBuf,
    pub assets_copied: usize,
    pub audio_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RendererHandoff {
    renderer_dir: PathBuf,
}

impl RendererHandoff {
    pub fn new(renderer_dir: impl Into<PathBuf>) -> Self {
        Self {
            renderer_dir: renderer_dir.into(),
        }
    }

    /// Root that renderer-relative paths (`assets/..`, `audio/..`) resolve
    /// against.
    pub fn public_dir(&self) -> PathBuf {
        self.renderer_dir.join("public")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.public_dir().join(RENDERER_ASSET_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.renderer_dir.join("src").join(RENDER_CONFIG_FILE)
    }

    /// Copy assets, audio and the config into the renderer project.
    ///
    /// `audio_source` is the audio file as given by the caller; it lands at
    /// the config's renderer-relative `audio_path`.
    pub fn deliver(
        &self,
        store: &AssetStore,
        config: &FinalRenderConfig,
        audio_source: Option<&Path>,
    ) -> Result<HandoffReport, StoreError> {
        let assets_copied = if same_dir(store.root(), &self.assets_dir()) {
            store.list()?.len()
        } else {
            store.copy_all_to(&self.assets_dir())?
        };

        let audio_path = match (audio_source, config.audio_path.as_deref()) {
            (Some(source), Some(relative)) => Some(self.copy_audio(source, relative)?),
            _ => None,
        };

        let config_path = self.config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(StoreError::io(parent))?;
        }
        let json = config
            .to_json_pretty()
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
        std::fs::write(&config_path, json).map_err(StoreError::io(&config_path))?;

        tracing::info!(
            renderer = %self.renderer_dir.display(),
            assets_copied,
            "Renderer hand-off complete",
        );

        Ok(HandoffReport {
            config_path,
            assets_copied,
            audio_path,
        })
    }

    fn copy_audio(&self, source: &Path, relative: &str) -> Result<PathBuf, StoreError> {
        let dest = self.public_dir().join(relative);
        if source == dest {
            return Ok(dest);
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(StoreError::io(parent))?;
        }
        std::fs::copy(source, &dest).map_err(StoreError::io(source))?;
        Ok(dest)
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
