//! Final render config assembly.
//!
//! The final config is the fully resolved document handed to the external
//! renderer: the input script with every image element's `local_path`
//! pointing at its stored asset, and the audio track made relative to the
//! renderer's public root.

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::CoreError;
use crate::naming::{asset_local_path, RENDERER_AUDIO_DIR};
use crate::script::{ProjectSettings, Scene, ScriptDocument};

/// Fully resolved document consumed by the renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalRenderConfig {
    pub project_settings: ProjectSettings,
    pub scenes: Vec<Scene>,
    pub subtitles: Box<RawValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<String>,
}

impl FinalRenderConfig {
    /// Assemble the final config from a script.
    ///
    /// `audio_path` overrides the script's own `audio_path` when given.
    /// Pure: no file system access.
    pub fn build(
        script: &ScriptDocument,
        audio_path: Option<&str>,
        public_root: Option<&Path>,
    ) -> Self {
        let scenes = script
            .scenes
            .iter()
            .map(|scene| {
                let mut scene = scene.clone();
                for element in scene.elements.iter_mut().filter(|e| e.is_image()) {
                    element.local_path = Some(asset_local_path(&element.id));
                }
                scene
            })
            .collect();

        let audio_path = audio_path
            .or(script.audio_path.as_deref())
            .map(|audio| renderer_audio_path(audio, public_root));

        Self {
            project_settings: script.project_settings,
            scenes,
            subtitles: script.subtitles.clone(),
            audio_path,
        }
    }

    /// Pretty-printed JSON, as written to `final_render.json`.
    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Express an audio path relative to the renderer's public root.
///
/// - A path under `public_root` becomes the remainder below it.
/// - A clean relative path (no `..`) is already renderer-relative.
/// - Anything else becomes `audio/{file_name}`; the hand-off step copies
///   the file there.
///
/// ```
/// use std::path::Path;
/// use kinetic_core::render_config::renderer_audio_path;
///
/// assert_eq!(renderer_audio_path("/tmp/uploads/voice.mp3", None), "audio/voice.mp3");
/// assert_eq!(
///     renderer_audio_path("/srv/public/audio/voice.mp3", Some(Path::new("/srv/public"))),
///     "audio/voice.mp3",
/// );
/// ```
pub fn renderer_audio_path(audio: &str, public_root: Option<&Path>) -> String {
    let path = Path::new(audio);

    if let Some(rest) = public_root.and_then(|root| path.strip_prefix(root).ok()) {
        return to_forward_slashes(rest);
    }

    let is_clean_relative = path.is_relative()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if is_clean_relative {
        return to_forward_slashes(path);
    }

    match path.file_name() {
        Some(name) => format!("{RENDERER_AUDIO_DIR}/{}", name.to_string_lossy()),
        None => audio.to_string(),
    }
}

fn to_forward_slashes(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
