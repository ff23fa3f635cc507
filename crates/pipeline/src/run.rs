//! Run state and status publication.
//!
//! A [`PipelineRun`] is owned by the builder and mutated only from
//! `generate_all`. Pollers never see it directly: after every change the
//! builder publishes a [`StatusSnapshot`] on a `watch` channel that any
//! number of [`StatusHandle`]s can read.

use std::fmt;

use kinetic_core::types::{AssetId, Timestamp};
use kinetic_core::{FinalRenderConfig, Role};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Run status
// ---------------------------------------------------------------------------

/// Aggregate state of a run: `idle -> processing -> {ready | error}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Processing,
    Ready,
    Error,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }

    /// Whether the run has finished, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Per-asset records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationState {
    Pending,
    InFlight,
    Succeeded,
    /// A file for the id already existed; nothing was generated.
    SkippedExisting,
    Failed { cause: String },
}

impl GenerationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::SkippedExisting | Self::Failed { .. }
        )
    }
}

/// Progress of one image element within a run.
#[derive(Debug, Clone)]
pub struct GenerationRecord {
    pub asset_id: AssetId,
    pub role: Role,
    pub prompt: String,
    pub attempt_count: u32,
    pub state: GenerationState,
}

impl GenerationRecord {
    pub fn pending(asset_id: AssetId, role: Role, prompt: String) -> Self {
        Self {
            asset_id,
            role,
            prompt,
            attempt_count: 0,
            state: GenerationState::Pending,
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineRun
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub status: RunStatus,
    /// Ids generated during the latest run, in completion order, without
    /// duplicates. Still readable after that run fails, cleared by the next
    /// `begin`.
    pub generated: Vec<AssetId>,
    /// Ids found on disk during the current run.
    pub skipped: Vec<AssetId>,
    pub total: usize,
    pub error: Option<String>,
    pub final_config: Option<FinalRenderConfig>,
    pub records: Vec<GenerationRecord>,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self {
            run_id: Uuid::now_v7(),
            status: RunStatus::Idle,
            generated: Vec::new(),
            skipped: Vec::new(),
            total: 0,
            error: None,
            final_config: None,
            records: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }
}

impl PipelineRun {
    /// Enter `processing` with a fresh run id and one pending record per
    /// element.
    pub fn begin(&mut self, records: Vec<GenerationRecord>) {
        self.run_id = Uuid::now_v7();
        self.status = RunStatus::Processing;
        self.generated.clear();
        self.skipped.clear();
        self.total = records.len();
        self.error = None;
        self.final_config = None;
        self.records = records;
        self.started_at = Some(chrono::Utc::now());
        self.finished_at = None;
    }

    pub fn mark_generated(&mut self, asset_id: &str) {
        if !self.generated.iter().any(|id| id == asset_id) {
            self.generated.push(asset_id.to_string());
        }
    }

    pub fn mark_skipped(&mut self, asset_id: &str) {
        if !self.skipped.iter().any(|id| id == asset_id) {
            self.skipped.push(asset_id.to_string());
        }
    }

    pub fn fail(&mut self, message: String) {
        self.status = RunStatus::Error;
        self.error = Some(message);
        self.finished_at = Some(chrono::Utc::now());
    }

    pub fn finish(&mut self, config: FinalRenderConfig) {
        self.status = RunStatus::Ready;
        self.final_config = Some(config);
        self.finished_at = Some(chrono::Utc::now());
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            run_id: self.run_id,
            status: self.status,
            generated_count: self.generated.len(),
            skipped_count: self.skipped.len(),
            total_count: self.total,
            error: self.error.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Status snapshots
// ---------------------------------------------------------------------------

/// Read-only view of a run for pollers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub generated_count: usize,
    pub skipped_count: usize,
    pub total_count: usize,
    pub error: Option<String>,
}

/// Cloneable reader of the latest [`StatusSnapshot`].
#[derive(Debug, Clone)]
pub struct StatusHandle {
    receiver: watch::Receiver<StatusSnapshot>,
}

impl StatusHandle {
    pub(crate) fn new(receiver: watch::Receiver<StatusSnapshot>) -> Self {
        Self { receiver }
    }

    /// The most recently published snapshot.
    pub fn current(&self) -> StatusSnapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next published snapshot. Returns `None` once the
    /// builder has been dropped.
    pub async fn changed(&mut self) -> Option<StatusSnapshot> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Wait until the run reaches `ready` or `error`.
    pub async fn wait_terminal(&mut self) -> Option<StatusSnapshot> {
        loop {
            let current = self.receiver.borrow_and_update().clone();
            if current.status.is_terminal() {
                return Some(current);
            }
            self.receiver.changed().await.ok()?;
        }
    }
}
