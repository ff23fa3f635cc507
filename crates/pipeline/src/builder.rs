//! Pipeline orchestrator.
//!
//! A [`Builder`] owns one script and drives every image element through
//! routing, generation with retry, background removal and storage, in
//! scene order. It stops at the first element that cannot be generated.
//! On success it assembles the final render config, persists it next to
//! the asset directory and optionally hands everything off to the
//! renderer project.
//!
//! Calling [`Builder::generate_all`] again after a failure resumes the
//! work: assets already on disk are skipped.

use std::path::PathBuf;
use std::sync::Arc;

use kinetic_core::{FinalRenderConfig, Role, ScriptDocument};
use kinetic_events::{LogEvent, LogSink};
use kinetic_providers::{
    with_retry, ProviderRouter, RetryPolicy, RetryWait, Sleeper, TokioSleeper,
};
use tokio::sync::watch;

use crate::background::{BackgroundOutcome, BackgroundStage};
use crate::error::PipelineError;
use crate::handoff::RendererHandoff;
use crate::run::{GenerationRecord, GenerationState, PipelineRun, StatusHandle, StatusSnapshot};
use crate::store::AssetStore;

pub struct Builder {
    script: ScriptDocument,
    router: ProviderRouter,
    background: BackgroundStage,
    store: AssetStore,
    sink: Arc<dyn LogSink>,
    sleeper: Arc<dyn Sleeper>,
    generation_policy: RetryPolicy,
    handoff: Option<RendererHandoff>,
    audio_source: Option<PathBuf>,
    run: PipelineRun,
    status_tx: watch::Sender<StatusSnapshot>,
}

impl Builder {
    pub fn new(
        script: ScriptDocument,
        router: ProviderRouter,
        background: BackgroundStage,
        store: AssetStore,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        let run = PipelineRun::default();
        let (status_tx, _) = watch::channel(run.snapshot());
        Self {
            script,
            router,
            background,
            store,
            sink,
            sleeper: Arc::new(TokioSleeper),
            generation_policy: RetryPolicy::generation(),
            handoff: None,
            audio_source: None,
            run,
            status_tx,
        }
    }

    /// Replace the sleeper used for generation backoff.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_generation_policy(mut self, policy: RetryPolicy) -> Self {
        self.generation_policy = policy;
        self
    }

    /// Copy the finished run into a renderer project.
    pub fn with_handoff(mut self, handoff: RendererHandoff) -> Self {
        self.handoff = Some(handoff);
        self
    }

    /// Audio track for the final config, overriding the script's own
    /// `audio_path`.
    pub fn with_audio(mut self, audio: impl Into<PathBuf>) -> Self {
        self.audio_source = Some(audio.into());
        self
    }

    pub fn status_handle(&self) -> StatusHandle {
        StatusHandle::new(self.status_tx.subscribe())
    }

    pub fn status(&self) -> StatusSnapshot {
        self.run.snapshot()
    }

    pub fn run(&self) -> &PipelineRun {
        &self.run
    }

    pub fn records(&self) -> &[GenerationRecord] {
        &self.run.records
    }

    /// Config of the last successful run.
    pub fn final_config(&self) -> Option<&FinalRenderConfig> {
        self.run.final_config.as_ref()
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    /// Generate every image asset of the script, then assemble and persist
    /// the final render config.
    ///
    /// On failure the run is left in `error` with the message, and assets
    /// stored so far stay on disk for the next call.
    pub async fn generate_all(&mut self) -> Result<FinalRenderConfig, PipelineError> {
        match self.run_all().await {
            Ok(config) => Ok(config),
            Err(err) => {
                let message = err.to_string();
                tracing::error!(run_id = %self.run.run_id, error = %message, "Asset generation failed");
                self.run.fail(message.clone());
                self.log(LogEvent::error(format!("Error: {message}")));
                self.publish();
                Err(err)
            }
        }
    }

    async fn run_all(&mut self) -> Result<FinalRenderConfig, PipelineError> {
        self.script.validate_for_generation()?;

        let records = self
            .script
            .image_elements()
            .map(|(_, el)| GenerationRecord::pending(el.id.clone(), el.role.clone(), el.prompt.clone()))
            .collect();
        self.run.begin(records);
        self.publish();

        tracing::info!(run_id = %self.run.run_id, total = self.run.total, "Asset generation started");
        self.log(LogEvent::info("Starting asset generation..."));

        let per_scene: Vec<usize> = self
            .script
            .scenes
            .iter()
            .map(|scene| scene.elements.iter().filter(|el| el.is_image()).count())
            .collect();

        let mut index = 0;
        for (scene_idx, count) in per_scene.into_iter().enumerate() {
            self.log(LogEvent::info(format!("Processing scene {}...", scene_idx + 1)));
            for _ in 0..count {
                self.process_element(index).await?;
                index += 1;
            }
        }

        self.log(LogEvent::info("All assets generated successfully!"));
        let config = self.assemble()?;

        self.run.finish(config.clone());
        self.publish();
        tracing::info!(
            run_id = %self.run.run_id,
            generated = self.run.generated.len(),
            skipped = self.run.skipped.len(),
            "Asset generation ready",
        );
        Ok(config)
    }

    async fn process_element(&mut self, index: usize) -> Result<(), PipelineError> {
        let record = &self.run.records[index];
        let asset_id = record.asset_id.clone();
        let role = record.role.clone();
        let prompt = record.prompt.clone();

        if self.store.exists(&asset_id) {
            self.run.records[index].state = GenerationState::SkippedExisting;
            self.run.mark_skipped(&asset_id);
            self.log(
                LogEvent::info(format!("Asset {asset_id} already exists, skipping generation"))
                    .with_asset(&asset_id),
            );
            self.publish();
            return Ok(());
        }

        self.run.records[index].state = GenerationState::InFlight;
        self.log(LogEvent::info(format!("Generating image for {asset_id}...")).with_asset(&asset_id));
        if !matches!(role, Role::Avatar) && !self.router.general().has_credentials() {
            self.log(
                LogEvent::warn("Warning: TOGETHER_BEARER_TOKEN not set, using placeholder image")
                    .with_asset(&asset_id),
            );
        }

        let mut attempts = 0;
        let result = {
            let provider = self.router.route(&role);
            let sink = self.sink.as_ref();
            tracing::debug!(asset_id = %asset_id, provider = provider.name(), role = %role, "Routing element");

            let on_wait = |wait: &RetryWait<'_>| {
                sink.emit(
                    LogEvent::warn(format!(
                        "Attempt {}/{} for {asset_id} failed: {}. Retrying in {} seconds...",
                        wait.attempt,
                        wait.max_attempts,
                        wait.error,
                        wait.delay.as_secs_f64()
                    ))
                    .with_asset(&asset_id),
                );
            };
            with_retry(&self.generation_policy, self.sleeper.as_ref(), on_wait, |attempt| {
                attempts = attempt;
                provider.generate(&prompt, &asset_id)
            })
            .await
        };
        self.run.records[index].attempt_count = attempts;

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(exhausted) => {
                let cause = exhausted.to_string();
                self.run.records[index].state = GenerationState::Failed {
                    cause: cause.clone(),
                };
                return Err(PipelineError::Generation { asset_id, cause });
            }
        };

        let outcome = self
            .background
            .process(&self.store, self.sink.as_ref(), &bytes, &asset_id)
            .await;
        match outcome {
            Ok(BackgroundOutcome::Transparent) => {}
            Ok(BackgroundOutcome::Opaque { reason }) => {
                tracing::warn!(asset_id = %asset_id, reason = %reason, "Stored without background removal");
            }
            Err(e) => {
                self.run.records[index].state = GenerationState::Failed {
                    cause: e.to_string(),
                };
                return Err(e.into());
            }
        }

        self.run.records[index].state = GenerationState::Succeeded;
        self.run.mark_generated(&asset_id);
        self.publish();
        Ok(())
    }

    /// Build the final config, persist it, and hand off to the renderer.
    fn assemble(&self) -> Result<FinalRenderConfig, PipelineError> {
        let public_root = self.handoff.as_ref().map(RendererHandoff::public_dir);
        let audio = self
            .audio_source
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        let config =
            FinalRenderConfig::build(&self.script, audio.as_deref(), public_root.as_deref());

        let path = self.store.write_render_config(&config.to_json_pretty()?)?;
        self.log(LogEvent::info(format!("Final config saved to {}", path.display())));

        if let Some(handoff) = &self.handoff {
            // The script's own audio is only copied when it points at a real file.
            let audio_source = self.audio_source.clone().or_else(|| {
                self.script
                    .audio_path
                    .as_ref()
                    .map(PathBuf::from)
                    .filter(|p| p.is_file())
            });
            let report = handoff.deliver(&self.store, &config, audio_source.as_deref())?;
            self.log(LogEvent::info(format!(
                "Copied {} assets to renderer, config written to {}",
                report.assets_copied,
                report.config_path.display()
            )));
        }

        Ok(config)
    }

    fn log(&self, event: LogEvent) {
        self.sink.emit(event);
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.run.snapshot());
    }
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("router", &self.router)
            .field("store", &self.store)
            .field("status", &self.run.status)
            .finish_non_exhaustive()
    }
}
