//! Asset generation orchestration.
//!
//! Walks a script's image elements, generates each missing asset through
//! the role-routed providers with bounded retry, strips backgrounds with a
//! graceful fallback, stores the results idempotently by asset id, and
//! assembles the final render config for the renderer.

pub mod background;
pub mod builder;
pub mod config;
pub mod error;
pub mod handoff;
pub mod run;
pub mod store;

pub use background::{BackgroundOutcome, BackgroundStage};
pub use builder::Builder;
pub use config::PipelineConfig;
pub use error::{PipelineError, StoreError};
pub use handoff::{HandoffReport, RendererHandoff};
pub use run::{
    GenerationRecord, GenerationState, PipelineRun, RunStatus, StatusHandle, StatusSnapshot,
};
pub use store::{AssetStore, StoredAsset};
