//! Typed script document.
//!
//! A script is the declarative input to one pipeline run: project
//! settings, scenes holding visual elements, and subtitle timings. The
//! pipeline only interprets image elements; subtitles are carried as raw
//! JSON so they reach the renderer byte-for-byte.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::CoreError;
use crate::naming::is_safe_asset_id;
use crate::role::Role;

/// Top-level sections every script must carry.
pub const REQUIRED_SECTIONS: &[&str] = &["project_settings", "scenes", "subtitles"];

/// Element `type` that participates in asset generation.
pub const ELEMENT_TYPE_IMAGE: &str = "image";

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Output settings shared by the whole video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSettings {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
}

/// The script document for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptDocument {
    pub project_settings: ProjectSettings,
    pub scenes: Vec<Scene>,
    /// Subtitle track, kept verbatim.
    pub subtitles: Box<RawValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<String>,
}

/// A timed scene. `start` and `duration` are in the unit implied by
/// `project_settings.fps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub start: f64,
    pub duration: f64,
    pub elements: Vec<Element>,
    /// Renderer-specific keys (e.g. `layout`) passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A visual element within a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Asset identity key. Unique within the document.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub role: Role,
    #[serde(default)]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anim_enter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anim_idle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Element {
    /// Only image elements produce assets.
    pub fn is_image(&self) -> bool {
        self.kind == ELEMENT_TYPE_IMAGE
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl ScriptDocument {
    /// Parse a script from JSON text.
    ///
    /// Missing top-level sections are reported by name before the typed
    /// parse so that callers get an actionable message instead of a serde
    /// path.
    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        require_sections(&value)?;
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a script file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        // Editors on Windows like to prepend a BOM.
        Self::from_json(text.trim_start_matches('\u{feff}'))
    }

    /// All image elements in scene order, paired with their scene.
    pub fn image_elements(&self) -> impl Iterator<Item = (&Scene, &Element)> {
        self.scenes
            .iter()
            .flat_map(|scene| scene.elements.iter().map(move |el| (scene, el)))
            .filter(|(_, el)| el.is_image())
    }

    /// Number of assets a full run produces.
    pub fn image_element_count(&self) -> usize {
        self.image_elements().count()
    }

    /// Pre-flight checks performed before any generation work begins.
    ///
    /// - every image element id is non-empty and path-safe
    /// - image element ids are unique across the document
    /// - the subtitle track is a JSON array
    pub fn validate_for_generation(&self) -> Result<(), CoreError> {
        if !self.subtitles.get().trim_start().starts_with('[') {
            return Err(CoreError::Validation("subtitles must be an array".into()));
        }

        let mut seen = HashSet::new();
        for (scene, element) in self.image_elements() {
            if !is_safe_asset_id(&element.id) {
                return Err(CoreError::Validation(format!(
                    "Scene '{}' has an image element with invalid id '{}'",
                    scene.id, element.id
                )));
            }
            if !seen.insert(element.id.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Duplicate asset id '{}' in scene '{}'",
                    element.id, scene.id
                )));
            }
        }
        Ok(())
    }
}

/// Fail if any of [`REQUIRED_SECTIONS`] is absent from the raw document.
pub fn require_sections(value: &serde_json::Value) -> Result<(), CoreError> {
    let obj = value
        .as_object()
        .ok_or_else(|| CoreError::Validation("Script must be a JSON object".into()))?;

    let missing: Vec<&str> = REQUIRED_SECTIONS
        .iter()
        .copied()
        .filter(|key| !matches!(obj.get(*key), Some(v) if !v.is_null()))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Script is missing required sections: {}",
            missing.join(", ")
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
