//! Asset naming conventions.
//!
//! Assets are addressed by their caller-assigned id, never by content
//! hash. Every stored asset is a PNG named `{id}.png`, and the renderer
//! resolves it at `assets/{id}.png` relative to its public root.

/// File extension of every stored asset.
pub const ASSET_EXTENSION: &str = "png";

/// Directory (relative to the renderer's public root) holding assets.
pub const RENDERER_ASSET_DIR: &str = "assets";

/// Directory (relative to the renderer's public root) holding audio.
pub const RENDERER_AUDIO_DIR: &str = "audio";

/// Maximum length of an asset id.
const MAX_ASSET_ID_LEN: usize = 128;

/// File name of the stored asset for `asset_id`.
///
/// ```
/// use kinetic_core::naming::asset_file_name;
///
/// assert_eq!(asset_file_name("gym_guy"), "gym_guy.png");
/// ```
pub fn asset_file_name(asset_id: &str) -> String {
    format!("{asset_id}.{ASSET_EXTENSION}")
}

/// Renderer-relative path written into an element's `local_path`.
///
/// ```
/// use kinetic_core::naming::asset_local_path;
///
/// assert_eq!(asset_local_path("warning_icon"), "assets/warning_icon.png");
/// ```
pub fn asset_local_path(asset_id: &str) -> String {
    format!("{RENDERER_ASSET_DIR}/{}", asset_file_name(asset_id))
}

/// Whether `asset_id` can be used as a file stem without escaping the
/// asset directory.
///
/// Allowed: ASCII alphanumerics, `-`, `_` and `.`; not empty, not made of
/// dots only, at most 128 characters.
pub fn is_safe_asset_id(asset_id: &str) -> bool {
    !asset_id.is_empty()
        && asset_id.len() <= MAX_ASSET_ID_LEN
        && !asset_id.chars().all(|c| c == '.')
        && asset_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
