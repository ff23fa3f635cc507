//! On-disk asset store.
//!
//! One PNG per asset id under a single directory. The file name is the
//! identity: an existing file for an id means the asset is done and is
//! never regenerated or re-validated. Writes go to a hidden temp file
//! first and are renamed into place, so a crash mid-write never leaves a
//! truncated asset that a later run would mistake for a finished one.

use std::path::{Path, PathBuf};

use kinetic_core::naming::{asset_file_name, asset_local_path, is_safe_asset_id, ASSET_EXTENSION};
use serde::Serialize;

use crate::error::StoreError;

/// File name of the persisted render config, written next to the asset
/// directory.
pub const RENDER_CONFIG_FILE: &str = "final_render.json";

/// A stored asset as reported by [`AssetStore::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredAsset {
    pub asset_id: String,
    pub file_name: String,
    /// Path relative to the renderer's public root (`assets/{id}.png`).
    pub local_path: String,
}

#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the final render config is persisted: the asset directory's
    /// parent.
    pub fn render_config_path(&self) -> PathBuf {
        match self.root.parent() {
            Some(parent) => parent.join(RENDER_CONFIG_FILE),
            None => self.root.join(RENDER_CONFIG_FILE),
        }
    }

    pub fn path_for(&self, asset_id: &str) -> Result<PathBuf, StoreError> {
        if !is_safe_asset_id(asset_id) {
            return Err(StoreError::InvalidId(asset_id.to_string()));
        }
        Ok(self.root.join(asset_file_name(asset_id)))
    }

    /// Whether a finished asset exists for `asset_id`.
    pub fn exists(&self, asset_id: &str) -> bool {
        self.path_for(asset_id).is_ok_and(|path| path.is_file())
    }

    /// Persist `bytes` as the asset for `asset_id`, replacing any previous
    /// file.
    pub fn write(&self, asset_id: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let path = self.path_for(asset_id)?;
        std::fs::create_dir_all(&self.root).map_err(StoreError::io(&self.root))?;

        let tmp = self.root.join(format!(".{}.tmp", asset_file_name(asset_id)));
        std::fs::write(&tmp, bytes).map_err(StoreError::io(&tmp))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(StoreError::io(&path)(e));
        }

        tracing::debug!(asset_id, path = %path.display(), bytes = bytes.len(), "Asset stored");
        Ok(path)
    }

    /// Write a text file next to the asset directory (the render config).
    pub fn write_render_config(&self, json: &str) -> Result<PathBuf, StoreError> {
        let path = self.render_config_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(StoreError::io(parent))?;
        }
        std::fs::write(&path, json).map_err(StoreError::io(&path))?;
        Ok(path)
    }

    /// All finished assets, sorted by id. A missing directory is empty.
    pub fn list(&self) -> Result<Vec<StoredAsset>, StoreError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.root)(e)),
        };

        let mut assets = Vec::new();
        for entry in entries {
            let entry = entry.map_err(StoreError::io(&self.root))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(asset_id) = file_name.strip_suffix(&format!(".{ASSET_EXTENSION}")) else {
                continue;
            };
            // Hidden temp files and foreign names are not assets.
            if asset_id.starts_with('.') || !is_safe_asset_id(asset_id) {
                continue;
            }
            assets.push(StoredAsset {
                asset_id: asset_id.to_string(),
                file_name: file_name.to_string(),
                local_path: asset_local_path(asset_id),
            });
        }
        assets.sort_by(|a, b| a.asset_id.cmp(&b.asset_id));
        Ok(assets)
    }

    /// Copy every finished asset into `dest`. Returns the number copied.
    pub fn copy_all_to(&self, dest: &Path) -> Result<usize, StoreError> {
        std::fs::create_dir_all(dest).map_err(StoreError::io(dest))?;
        let assets = self.list()?;
        for asset in &assets {
            let from = self.root.join(&asset.file_name);
            let to = dest.join(&asset.file_name);
            std::fs::copy(&from, &to).map_err(StoreError::io(&to))?;
        }
        Ok(assets.len())
    }
}
