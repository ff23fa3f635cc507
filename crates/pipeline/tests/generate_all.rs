//! End-to-end runs of the builder against fake providers.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::{png, two_scene_script, FakeProvider, FakeRemover, Harness, SUBTITLES};
use image::GenericImageView;
use kinetic_core::ScriptDocument;
use kinetic_pipeline::{GenerationState, PipelineError, RendererHandoff, RunStatus};
use kinetic_providers::GenerationError;

fn secs(values: &[u64]) -> Vec<Duration> {
    values.iter().map(|s| Duration::from_secs(*s)).collect()
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn all_assets_generated_and_ready() {
    let h = Harness::healthy();
    let mut builder = h.builder(two_scene_script());

    let config = builder.generate_all().await.unwrap();

    let status = builder.status();
    assert_eq!(status.status, RunStatus::Ready);
    assert_eq!(status.generated_count, 3);
    assert_eq!(status.skipped_count, 0);
    assert_eq!(status.total_count, 3);
    assert!(status.error.is_none());

    let store = h.store();
    for id in ["coach", "dumbbell", "water_bottle"] {
        assert!(store.exists(id), "{id} should be stored");
    }
    assert!(!store.exists("title"), "text elements are not generated");

    assert_eq!(builder.final_config().unwrap().scenes.len(), config.scenes.len());
    assert!(builder
        .records()
        .iter()
        .all(|r| r.state == GenerationState::Succeeded && r.attempt_count == 1));
}

#[tokio::test]
async fn avatars_route_to_identity_and_props_to_general() {
    let h = Harness::healthy();
    h.builder(two_scene_script()).generate_all().await.unwrap();

    assert_eq!(
        h.identity.requests(),
        [("coach".to_string(), "coach smiling".to_string())]
    );
    let general: Vec<String> = h.general.requests().into_iter().map(|(id, _)| id).collect();
    assert_eq!(general, ["dumbbell", "water_bottle"]);
}

// ---------------------------------------------------------------------------
// Idempotency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn existing_assets_are_never_regenerated() {
    let h = Harness::healthy();
    h.builder(two_scene_script()).generate_all().await.unwrap();
    let before = std::fs::read(h.store().path_for("coach").unwrap()).unwrap();
    assert_eq!(h.general.calls() + h.identity.calls(), 3);

    let mut second = h.builder(two_scene_script());
    second.generate_all().await.unwrap();

    assert_eq!(h.general.calls() + h.identity.calls(), 3, "no new provider calls");
    let status = second.status();
    assert_eq!(status.status, RunStatus::Ready);
    assert_eq!(status.skipped_count, 3);
    assert_eq!(status.generated_count, 0);
    assert!(second
        .records()
        .iter()
        .all(|r| r.state == GenerationState::SkippedExisting));
    assert_eq!(std::fs::read(h.store().path_for("coach").unwrap()).unwrap(), before);
}

#[tokio::test]
async fn pre_existing_file_is_authoritative_even_if_invalid() {
    let h = Harness::healthy();
    h.store().write("dumbbell", b"not really a png").unwrap();

    let mut builder = h.builder(two_scene_script());
    builder.generate_all().await.unwrap();

    assert_eq!(h.general.calls(), 1, "only water_bottle hits the general provider");
    assert_eq!(
        std::fs::read(h.store().path_for("dumbbell").unwrap()).unwrap(),
        b"not really a png"
    );
}

// ---------------------------------------------------------------------------
// Failure policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn avatar_failure_halts_the_run() {
    let h = Harness::new(
        FakeProvider::ok("general"),
        FakeProvider::failing("identity", GenerationError::Unavailable("no reference".into())),
        FakeRemover::returning(Ok(png())),
    );
    let mut builder = h.builder(two_scene_script());

    let err = builder.generate_all().await.unwrap_err();

    assert_matches!(&err, PipelineError::Generation { asset_id, .. } if asset_id == "coach");
    let status = builder.status();
    assert_eq!(status.status, RunStatus::Error);
    assert!(status.error.as_deref().unwrap().contains("coach"));
    assert_eq!(h.general.calls(), 0, "later elements are not attempted");
    assert_eq!(h.identity.calls(), 1, "unavailable is not retried");
    assert!(builder.final_config().is_none());
    assert!(!h.store().render_config_path().exists());
    assert_matches!(
        &builder.records()[0].state,
        GenerationState::Failed { cause } if cause.contains("no reference")
    );
    assert_eq!(builder.records()[1].state, GenerationState::Pending);
}

#[tokio::test]
async fn avatar_retry_exhaustion_halts_the_run() {
    let h = Harness::new(
        FakeProvider::ok("general"),
        FakeProvider::failing("identity", GenerationError::Transient("HTTP 502".into())),
        FakeRemover::returning(Ok(png())),
    );
    let mut builder = h.builder(two_scene_script());

    let err = builder.generate_all().await.unwrap_err();

    assert_matches!(&err, PipelineError::Generation { asset_id, .. } if asset_id == "coach");
    assert_eq!(h.identity.calls(), 3);
    assert_eq!(h.sleeper.waits(), secs(&[1, 2]));
    let status = builder.status();
    assert_eq!(status.status, RunStatus::Error);
    assert!(status.error.as_deref().unwrap().contains("coach"));
    assert_eq!(h.general.calls(), 0, "later elements are not attempted");
    assert_eq!(builder.records()[0].attempt_count, 3);
    assert!(!h.store().render_config_path().exists());
}

#[tokio::test]
async fn uncredentialed_props_degrade_to_placeholder() {
    let h = Harness::new(
        FakeProvider::placeholder("general"),
        FakeProvider::ok("identity"),
        FakeRemover::unavailable(),
    );
    let mut builder = h.builder(two_scene_script());

    builder.generate_all().await.unwrap();

    assert_eq!(builder.status().status, RunStatus::Ready);
    let bytes = std::fs::read(h.store().path_for("water_bottle").unwrap()).unwrap();
    let img = image::load_from_memory(&bytes).unwrap();
    assert_eq!(img.dimensions(), (1024, 768));
    assert!(h
        .sink
        .messages()
        .iter()
        .any(|m| m.contains("TOGETHER_BEARER_TOKEN not set")));
}

#[tokio::test]
async fn transient_failures_back_off_exponentially_then_fail() {
    let h = Harness::new(
        FakeProvider::failing("general", GenerationError::Transient("HTTP 503".into())),
        FakeProvider::ok("identity"),
        FakeRemover::returning(Ok(png())),
    );
    let mut builder = h.builder(two_scene_script());

    let err = builder.generate_all().await.unwrap_err();

    assert_matches!(err, PipelineError::Generation { ref asset_id, .. } if asset_id == "dumbbell");
    assert_eq!(h.general.calls(), 3);
    assert_eq!(h.sleeper.waits(), secs(&[1, 2]), "no wait after the final attempt");
    assert_eq!(builder.records()[1].attempt_count, 3);

    let retries = h
        .sink
        .messages()
        .into_iter()
        .filter(|m| m.contains("Retrying in"))
        .count();
    assert_eq!(retries, 2);
}

#[tokio::test]
async fn transient_failure_recovers_within_budget() {
    let h = Harness::new(
        FakeProvider::scripted(
            "general",
            vec![Err(GenerationError::Transient("timeout".into()))],
        ),
        FakeProvider::ok("identity"),
        FakeRemover::returning(Ok(png())),
    );
    let mut builder = h.builder(two_scene_script());

    builder.generate_all().await.unwrap();

    assert_eq!(builder.status().status, RunStatus::Ready);
    assert_eq!(h.sleeper.waits(), secs(&[1]));
    assert_eq!(builder.records()[1].attempt_count, 2);
}

#[tokio::test]
async fn permanent_failure_is_not_retried() {
    let h = Harness::new(
        FakeProvider::failing("general", GenerationError::Permanent("HTTP 400: bad prompt".into())),
        FakeProvider::ok("identity"),
        FakeRemover::returning(Ok(png())),
    );
    let mut builder = h.builder(two_scene_script());

    builder.generate_all().await.unwrap_err();

    assert_eq!(h.general.calls(), 1);
    assert!(h.sleeper.waits().is_empty());
    assert_eq!(builder.status().status, RunStatus::Error);
}

#[tokio::test]
async fn rerun_after_failure_resumes_from_disk() {
    let h = Harness::new(
        FakeProvider::scripted(
            "general",
            vec![
                Ok(png()),
                Err(GenerationError::Permanent("HTTP 400".into())),
            ],
        ),
        FakeProvider::ok("identity"),
        FakeRemover::returning(Ok(png())),
    );
    let mut builder = h.builder(two_scene_script());

    builder.generate_all().await.unwrap_err();
    assert_eq!(builder.status().generated_count, 2);
    let failed_run = builder.status().run_id;

    builder.generate_all().await.unwrap();

    let status = builder.status();
    assert_ne!(status.run_id, failed_run);
    assert_eq!(status.status, RunStatus::Ready);
    assert_eq!(status.skipped_count, 2);
    assert_eq!(status.generated_count, 1);
    assert_eq!(h.identity.calls(), 1);
}

// ---------------------------------------------------------------------------
// Background removal fallback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_background_payload_keeps_original() {
    let h = Harness::new(
        FakeProvider::ok("general"),
        FakeProvider::ok("identity"),
        FakeRemover::returning(Ok(Vec::new())),
    );
    let mut builder = h.builder(two_scene_script());

    builder.generate_all().await.unwrap();

    assert_eq!(builder.status().status, RunStatus::Ready);
    assert!(builder
        .records()
        .iter()
        .all(|r| r.state == GenerationState::Succeeded));
    assert_eq!(std::fs::read(h.store().path_for("dumbbell").unwrap()).unwrap(), png());
    assert_eq!(h.remover.calls(), 3, "empty payload is not retried");
}

// ---------------------------------------------------------------------------
// Final config
// ---------------------------------------------------------------------------

#[tokio::test]
async fn final_config_resolves_local_paths_and_keeps_subtitles() {
    let h = Harness::healthy();
    let mut builder = h.builder(two_scene_script());

    builder.generate_all().await.unwrap();

    let text = std::fs::read_to_string(h.store().render_config_path()).unwrap();
    assert!(text.contains(SUBTITLES), "subtitles are emitted byte-for-byte");

    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["project_settings"]["fps"], 30);
    assert_eq!(json["scenes"][0]["layout"], "split");
    let scene1 = &json["scenes"][0]["elements"];
    assert_eq!(scene1[0]["local_path"], "assets/coach.png");
    assert_eq!(scene1[1]["local_path"], "assets/dumbbell.png");
    assert!(scene1[2].get("local_path").is_none(), "text elements untouched");
    assert_eq!(
        json["scenes"][1]["elements"][0]["local_path"],
        "assets/water_bottle.png"
    );
}

#[tokio::test]
async fn handoff_populates_renderer_project() {
    let h = Harness::healthy();
    let renderer = h.dir.path().join("remotion");
    let audio = h.dir.path().join("voice.mp3");
    std::fs::write(&audio, b"mp3").unwrap();

    let mut builder = h
        .builder(two_scene_script())
        .with_handoff(RendererHandoff::new(&renderer))
        .with_audio(&audio);
    let config = builder.generate_all().await.unwrap();

    assert_eq!(config.audio_path.as_deref(), Some("audio/voice.mp3"));
    assert!(renderer.join("src").join("final_render.json").is_file());
    assert!(renderer.join("public").join("audio").join("voice.mp3").is_file());
    for id in ["coach", "dumbbell", "water_bottle"] {
        assert!(renderer.join("public").join("assets").join(format!("{id}.png")).is_file());
        assert!(h.store().exists(id), "assets are copied, not moved");
    }
}

// ---------------------------------------------------------------------------
// Validation and status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_ids_fail_before_any_generation() {
    let script = ScriptDocument::from_json(
        r#"{
            "project_settings": {"fps": 30, "width": 1080, "height": 1920},
            "scenes": [{"id": "s1", "start": 0, "duration": 1, "elements": [
                {"type": "image", "role": "prop", "id": "same", "prompt": "a"},
                {"type": "image", "role": "prop", "id": "same", "prompt": "b"}
            ]}],
            "subtitles": []
        }"#,
    )
    .unwrap();
    let h = Harness::healthy();
    let mut builder = h.builder(script);

    let err = builder.generate_all().await.unwrap_err();

    assert_matches!(err, PipelineError::Validation(msg) if msg.contains("same"));
    assert_eq!(builder.status().status, RunStatus::Error);
    assert_eq!(h.general.calls(), 0);
}

#[tokio::test]
async fn status_handle_observes_terminal_state() {
    let h = Harness::healthy();
    let mut builder = h.builder(two_scene_script());
    let mut handle = builder.status_handle();
    assert_eq!(handle.current().status, RunStatus::Idle);

    builder.generate_all().await.unwrap();

    let done = handle.wait_terminal().await.unwrap();
    assert_eq!(done.status, RunStatus::Ready);
    assert_eq!(done.generated_count, 3);
}

#[tokio::test]
async fn log_events_follow_processing_order() {
    let h = Harness::healthy();
    h.builder(two_scene_script()).generate_all().await.unwrap();

    let messages = h.sink.messages();
    let position = |needle: &str| {
        messages
            .iter()
            .position(|m| m.contains(needle))
            .unwrap_or_else(|| panic!("missing log line: {needle}"))
    };

    assert_eq!(messages[0], "Starting asset generation...");
    assert!(position("Processing scene 1") < position("Generating image for coach"));
    assert!(position("Generating image for coach") < position("Generating image for dumbbell"));
    assert!(position("Processing scene 2") < position("Generating image for water_bottle"));
    assert!(position("All assets generated successfully!") < position("Final config saved"));
}
