use clap::Parser;
use kinetic_pipeline::PipelineConfig;
use kinetic_providers::ProviderConfig;
use kinetic_worker::{Args, Outcome};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kinetic_worker=debug,kinetic_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let providers = ProviderConfig::from_env()?;
    let pipeline = PipelineConfig::from_env()?;

    match kinetic_worker::run(args, providers, pipeline).await? {
        Outcome::Listed(assets) => {
            for asset in assets {
                println!("{}\t{}", asset.asset_id, asset.local_path);
            }
        }
        Outcome::Validated { image_elements } => {
            println!("Script is valid ({image_elements} image elements)");
        }
        Outcome::Generated(snapshot) => {
            tracing::info!(
                run_id = %snapshot.run_id,
                generated = snapshot.generated_count,
                skipped = snapshot.skipped_count,
                total = snapshot.total_count,
                "Assets ready",
            );
        }
    }
    Ok(())
}
