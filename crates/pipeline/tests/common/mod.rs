#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kinetic_core::ScriptDocument;
use kinetic_events::MemorySink;
use kinetic_pipeline::{AssetStore, BackgroundStage, Builder};
use kinetic_providers::imaging::placeholder_png;
use kinetic_providers::{
    BackgroundRemover, GenerationError, ImageProvider, ProviderRouter, RetryPolicy, Sleeper,
};

// ---------------------------------------------------------------------------
// Fake providers
// ---------------------------------------------------------------------------

/// Provider returning scripted results, then a fixed fallback.
pub struct FakeProvider {
    name: &'static str,
    credentials: bool,
    script: Mutex<VecDeque<Result<Vec<u8>, GenerationError>>>,
    fallback: Result<Vec<u8>, GenerationError>,
    calls: AtomicU32,
    prompts: Mutex<Vec<(String, String)>>,
}

impl FakeProvider {
    /// Always succeeds with a valid PNG.
    pub fn ok(name: &'static str) -> Arc<Self> {
        Self::build(name, true, Vec::new(), Ok(png()))
    }

    /// Always fails with `error`.
    pub fn failing(name: &'static str, error: GenerationError) -> Arc<Self> {
        Self::build(name, true, Vec::new(), Err(error))
    }

    /// Plays `script` in order, then succeeds.
    pub fn scripted(
        name: &'static str,
        script: Vec<Result<Vec<u8>, GenerationError>>,
    ) -> Arc<Self> {
        Self::build(name, true, script, Ok(png()))
    }

    /// An uncredentialed general provider: succeeds with the placeholder.
    pub fn placeholder(name: &'static str) -> Arc<Self> {
        Self::build(name, false, Vec::new(), Ok(png()))
    }

    fn build(
        name: &'static str,
        credentials: bool,
        script: Vec<Result<Vec<u8>, GenerationError>>,
        fallback: Result<Vec<u8>, GenerationError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            credentials,
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicU32::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(asset_id, prompt)` pairs in call order.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageProvider for FakeProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn has_credentials(&self) -> bool {
        self.credentials
    }

    async fn generate(&self, prompt: &str, asset_id: &str) -> Result<Vec<u8>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push((asset_id.to_string(), prompt.to_string()));
        match self.script.lock().unwrap().pop_front() {
            Some(result) => result,
            None => self.fallback.clone(),
        }
    }
}

/// Background remover returning the same result every time.
pub struct FakeRemover {
    result: Result<Vec<u8>, GenerationError>,
    calls: AtomicU32,
}

impl FakeRemover {
    pub fn returning(result: Result<Vec<u8>, GenerationError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: AtomicU32::new(0),
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Self::returning(Err(GenerationError::Unavailable("no token".into())))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackgroundRemover for FakeRemover {
    fn name(&self) -> &str {
        "fake-rmbg"
    }

    async fn remove_background(&self, _: &[u8], _: &str) -> Result<Vec<u8>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Records waits instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn png() -> Vec<u8> {
    placeholder_png().unwrap()
}

pub const SUBTITLES: &str = r#"[{"id":"sub1","mode":"word_by_word","container_end":2.5,"items":[{"text":"Push", "start":0.0,"end":0.4},{"text":"harder!","start":0.4,"end":1.0}]}]"#;

/// Two scenes: an avatar and a prop in the first, a prop in the second.
pub fn two_scene_script() -> ScriptDocument {
    let text = format!(
        r#"{{
            "project_settings": {{"fps": 30, "width": 1080, "height": 1920}},
            "scenes": [
                {{"id": "scene_1", "start": 0, "duration": 3, "layout": "split", "elements": [
                    {{"type": "image", "role": "avatar", "id": "coach", "prompt": "coach smiling",
                      "layout": "left", "anim_enter": "slide_in", "anim_idle": "breathe"}},
                    {{"type": "image", "role": "prop", "id": "dumbbell", "prompt": "a red dumbbell",
                      "layout": "right", "anim_enter": "pop", "anim_idle": "float"}},
                    {{"type": "text", "role": "caption", "id": "title", "prompt": "Day 1"}}
                ]}},
                {{"id": "scene_2", "start": 3, "duration": 2, "elements": [
                    {{"type": "image", "role": "prop", "id": "water_bottle", "prompt": "a water bottle",
                      "layout": "center", "anim_enter": "fade", "anim_idle": "none"}}
                ]}}
            ],
            "subtitles": {SUBTITLES}
        }}"#
    );
    ScriptDocument::from_json(&text).unwrap()
}

/// Workspace with an asset store under a temp dir.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub sink: Arc<MemorySink>,
    pub sleeper: Arc<RecordingSleeper>,
    pub general: Arc<FakeProvider>,
    pub identity: Arc<FakeProvider>,
    pub remover: Arc<FakeRemover>,
}

impl Harness {
    pub fn new(
        general: Arc<FakeProvider>,
        identity: Arc<FakeProvider>,
        remover: Arc<FakeRemover>,
    ) -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            sink: Arc::new(MemorySink::new()),
            sleeper: Arc::new(RecordingSleeper::default()),
            general,
            identity,
            remover,
        }
    }

    /// Both providers succeed, background removal returns a valid PNG.
    pub fn healthy() -> Self {
        Self::new(
            FakeProvider::ok("general"),
            FakeProvider::ok("identity"),
            FakeRemover::returning(Ok(png())),
        )
    }

    pub fn asset_dir(&self) -> PathBuf {
        self.dir.path().join("public").join("assets")
    }

    pub fn store(&self) -> AssetStore {
        AssetStore::new(self.asset_dir())
    }

    pub fn builder(&self, script: ScriptDocument) -> Builder {
        let router = ProviderRouter::new(self.general.clone(), self.identity.clone());
        let background = BackgroundStage::new(
            self.remover.clone(),
            RetryPolicy::background_removal(),
            self.sleeper.clone(),
        );
        Builder::new(script, router, background, self.store(), self.sink.clone())
            .with_sleeper(self.sleeper.clone())
    }
}
