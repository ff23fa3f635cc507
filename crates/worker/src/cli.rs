use std::path::PathBuf;

use clap::Parser;

/// Generate the image assets of a kinetic video script and assemble the
/// final render config.
#[derive(Parser, Debug)]
#[command(name = "kinetic-worker")]
#[command(about = "Generate image assets for a kinetic video script", long_about = None)]
pub struct Args {
    /// Script JSON file
    #[arg(required_unless_present = "list")]
    pub script: Option<PathBuf>,

    /// Audio track for the final config (overrides the script's audio_path)
    #[arg(short, long)]
    pub audio: Option<PathBuf>,

    /// Renderer project receiving assets and config (overrides RENDERER_DIR)
    #[arg(short, long)]
    pub renderer_dir: Option<PathBuf>,

    /// Asset directory (overrides ASSET_DIR)
    #[arg(long)]
    pub asset_dir: Option<PathBuf>,

    /// Validate the script and exit without generating anything
    #[arg(long)]
    pub validate_only: bool,

    /// List stored assets and exit
    #[arg(long, conflicts_with = "validate_only")]
    pub list: bool,
}
