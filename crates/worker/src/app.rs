//! Wiring of configuration, providers, event bus and builder for one
//! worker invocation.

use std::sync::Arc;

use anyhow::Context;
use kinetic_core::schema::validate_script;
use kinetic_core::ScriptDocument;
use kinetic_events::{EventBus, LogRelay, TracingSink};
use kinetic_pipeline::{
    AssetStore, BackgroundStage, Builder, PipelineConfig, RendererHandoff, StatusSnapshot,
    StoredAsset,
};
use kinetic_providers::{ProviderConfig, TokioSleeper};

use crate::cli::Args;

/// What a worker invocation did.
#[derive(Debug)]
pub enum Outcome {
    Listed(Vec<StoredAsset>),
    Validated { image_elements: usize },
    Generated(StatusSnapshot),
}

pub async fn run(
    args: Args,
    providers: ProviderConfig,
    mut pipeline: PipelineConfig,
) -> anyhow::Result<Outcome> {
    if let Some(dir) = args.asset_dir {
        pipeline.asset_dir = dir;
    }
    if let Some(dir) = args.renderer_dir {
        pipeline.renderer_dir = Some(dir);
    }
    let store = AssetStore::new(&pipeline.asset_dir);

    if args.list {
        let assets = store
            .list()
            .with_context(|| format!("Failed to list {}", store.root().display()))?;
        return Ok(Outcome::Listed(assets));
    }

    let script_path = args.script.context("A script path is required")?;
    let script = load_script(&script_path)?;

    if args.validate_only {
        let image_elements = script.image_element_count();
        tracing::info!(script = %script_path.display(), image_elements, "Script is valid");
        return Ok(Outcome::Validated { image_elements });
    }

    tracing::debug!(?providers, ?pipeline, "Configuration loaded");
    let client = providers.http_client()?;
    let background = BackgroundStage::new(
        Arc::new(providers.background_remover(&client)),
        pipeline.background_policy(),
        Arc::new(TokioSleeper),
    );

    let bus = Arc::new(EventBus::default());
    let relay = {
        let rx = bus.subscribe();
        tokio::spawn(async move { LogRelay::run(rx, &TracingSink).await })
    };

    let mut builder = Builder::new(
        script,
        providers.router(&client),
        background,
        store,
        bus.clone(),
    )
    .with_generation_policy(pipeline.generation_policy());
    if let Some(dir) = &pipeline.renderer_dir {
        builder = builder.with_handoff(RendererHandoff::new(dir));
    }
    if let Some(audio) = args.audio {
        builder = builder.with_audio(audio);
    }

    let mut status = builder.status_handle();
    let watcher = tokio::spawn(async move {
        while let Some(snapshot) = status.changed().await {
            tracing::debug!(
                run_id = %snapshot.run_id,
                status = %snapshot.status,
                generated = snapshot.generated_count,
                skipped = snapshot.skipped_count,
                total = snapshot.total_count,
                "Status changed",
            );
        }
    });

    let result = builder.generate_all().await;
    let snapshot = builder.status();

    // Dropping the builder and the last bus handle closes both channels.
    drop(builder);
    drop(bus);
    let forwarded = relay.await.unwrap_or_default();
    let _ = watcher.await;
    tracing::debug!(forwarded, "Log relay drained");

    result.with_context(|| format!("Asset generation failed for {}", script_path.display()))?;
    Ok(Outcome::Generated(snapshot))
}

/// Read a script, run the structural schema check, then parse it.
fn load_script(path: &std::path::Path) -> anyhow::Result<ScriptDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    let text = text.trim_start_matches('\u{feff}');

    let value: serde_json::Value = serde_json::from_str(text)
        .with_context(|| format!("Script {} is not valid JSON", path.display()))?;
    validate_script(&value)
        .into_result()
        .with_context(|| format!("Script {} failed validation", path.display()))?;

    Ok(ScriptDocument::from_json(text)?)
}
