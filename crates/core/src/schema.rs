//! Structural validation of raw script JSON.
//!
//! Runs before a [`ScriptDocument`](crate::script::ScriptDocument) is
//! handed to the pipeline and collects *every* problem rather than
//! stopping at the first, so an author can fix a script in one pass.
//! The pipeline itself only re-checks the required top-level sections.

use serde_json::Value;

use crate::error::CoreError;

/// Subtitle layout: lines of timed words stacked together.
pub const MODE_COMPOSED_STACK: &str = "composed_stack";
/// Subtitle layout: items revealed one under another.
pub const MODE_VERTICAL_LIST: &str = "vertical_list";
/// Subtitle layout: single words flashed in sequence.
pub const MODE_WORD_BY_WORD: &str = "word_by_word";

/// All subtitle modes the renderer understands.
pub const VALID_SUBTITLE_MODES: &[&str] =
    &[MODE_COMPOSED_STACK, MODE_VERTICAL_LIST, MODE_WORD_BY_WORD];

/// Element fields that must be present and non-empty.
const REQUIRED_ELEMENT_FIELDS: &[&str] = &[
    "type",
    "role",
    "id",
    "prompt",
    "layout",
    "anim_enter",
    "anim_idle",
];

/// Outcome of [`validate_script`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    pub errors: Vec<String>,
}

impl SchemaReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Collapse the report into a single validation error.
    pub fn into_result(self) -> Result<(), CoreError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(CoreError::Validation(self.errors.join("; ")))
        }
    }

    fn push(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }
}

/// Validate the full shape of a script document.
pub fn validate_script(data: &Value) -> SchemaReport {
    let mut report = SchemaReport::default();

    let Some(root) = data.as_object() else {
        report.push("Script must be a JSON object");
        return report;
    };

    match root.get("project_settings").filter(|v| is_truthy(v)) {
        None => report.push("Missing project_settings"),
        Some(settings) => {
            for key in ["fps", "width", "height"] {
                if !settings.get(key).is_some_and(Value::is_number) {
                    report.push(format!("project_settings.{key} must be a number"));
                }
            }
        }
    }

    match root.get("scenes").and_then(Value::as_array) {
        None => report.push("scenes must be an array"),
        Some(scenes) => {
            for (index, scene) in scenes.iter().enumerate() {
                validate_scene(&mut report, index, scene);
            }
        }
    }

    match root.get("subtitles").and_then(Value::as_array) {
        None => report.push("subtitles must be an array"),
        Some(subtitles) => {
            for (index, subtitle) in subtitles.iter().enumerate() {
                validate_subtitle(&mut report, index, subtitle);
            }
        }
    }

    if root.get("audio_path").is_some_and(|v| !v.is_string()) {
        report.push("audio_path must be a string");
    }

    report
}

fn validate_scene(report: &mut SchemaReport, index: usize, scene: &Value) {
    let prefix = format!("scenes[{index}]");
    if !has_truthy(scene, "id") {
        report.push(format!("{prefix}.id is required"));
    }
    require_number(report, &prefix, scene, "start");
    require_number(report, &prefix, scene, "duration");

    match scene.get("elements").and_then(Value::as_array) {
        None => report.push(format!("{prefix}.elements must be an array")),
        Some(elements) => {
            for (elem_index, element) in elements.iter().enumerate() {
                for field in REQUIRED_ELEMENT_FIELDS {
                    if !has_truthy(element, field) {
                        report.push(format!(
                            "{prefix}.elements[{elem_index}].{field} is required"
                        ));
                    }
                }
            }
        }
    }
}

fn validate_subtitle(report: &mut SchemaReport, index: usize, subtitle: &Value) {
    let prefix = format!("subtitles[{index}]");
    if !has_truthy(subtitle, "id") {
        report.push(format!("{prefix}.id is required"));
    }
    require_number(report, &prefix, subtitle, "container_end");

    let mode = subtitle.get("mode").and_then(Value::as_str);
    match mode {
        Some(MODE_COMPOSED_STACK) => match subtitle.get("lines").and_then(Value::as_array) {
            None => report.push(format!(
                "{prefix}.lines must be an array for composed_stack mode"
            )),
            Some(lines) => {
                for (line_index, line) in lines.iter().enumerate() {
                    let line_prefix = format!("{prefix}.lines[{line_index}]");
                    if !has_truthy(line, "style") {
                        report.push(format!("{line_prefix}.style is required"));
                    }
                    validate_words(report, &line_prefix, line);
                }
            }
        },
        Some(MODE_VERTICAL_LIST) => match subtitle.get("items").and_then(Value::as_array) {
            None => report.push(format!(
                "{prefix}.items must be an array for vertical_list mode"
            )),
            Some(items) => {
                for (item_index, item) in items.iter().enumerate() {
                    let item_prefix = format!("{prefix}.items[{item_index}]");
                    if !has_truthy(item, "text") {
                        report.push(format!("{item_prefix}.text is required"));
                    }
                    require_number(report, &item_prefix, item, "start");
                }
            }
        },
        Some(MODE_WORD_BY_WORD) => validate_words(report, &prefix, subtitle),
        _ => report.push(format!(
            "{prefix}.mode must be one of: {}",
            VALID_SUBTITLE_MODES.join(", ")
        )),
    }
}

fn validate_words(report: &mut SchemaReport, prefix: &str, parent: &Value) {
    match parent.get("words").and_then(Value::as_array) {
        None => report.push(format!("{prefix}.words must be an array")),
        Some(words) => {
            for (word_index, word) in words.iter().enumerate() {
                let word_prefix = format!("{prefix}.words[{word_index}]");
                if !has_truthy(word, "text") {
                    report.push(format!("{word_prefix}.text is required"));
                }
                require_number(report, &word_prefix, word, "start");
                require_number(report, &word_prefix, word, "end");
            }
        }
    }
}

fn require_number(report: &mut SchemaReport, prefix: &str, parent: &Value, key: &str) {
    if !parent.get(key).is_some_and(Value::is_number) {
        report.push(format!("{prefix}.{key} must be a number"));
    }
}

fn has_truthy(parent: &Value, key: &str) -> bool {
    parent.get(key).is_some_and(is_truthy)
}

/// Empty strings, empty containers, zero, `false` and `null` count as
/// missing.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
