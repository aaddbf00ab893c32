//! Step artifact persistence.
//!
//! Layout under the run's output directory:
//!
//! ```text
//! run.json
//! steps/
//!   001/
//!     screenshot.png   full-page render
//!     page.html        serialized markup
//!     nodes.json       NodeRecord sequence
//!     state.json       {dialogs, title}
//!     meta.json        {reason, timestamp, fingerprint, url, title}
//!     action.json      {type, label, phase}   (only when recorded)
//! ```
//!
//! Step ordinals are 1-based and derived from the number of step directories
//! already on disk, so re-running into a populated directory keeps counting.
//! A directory must have exactly one writer at a time.

use crate::error::{ExplorerError, Result};
use crate::fingerprint::Fingerprint;
use crate::snapshot::{DialogRecord, Snapshot};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const RUN_FILE: &str = "run.json";
pub const STEPS_DIR: &str = "steps";
pub const SCREENSHOT_FILE: &str = "screenshot.png";
pub const HTML_FILE: &str = "page.html";
pub const NODES_FILE: &str = "nodes.json";
pub const STATE_FILE: &str = "state.json";
pub const META_FILE: &str = "meta.json";
pub const ACTION_FILE: &str = "action.json";

/// Run-level metadata written once at start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub task: String,
    pub start_url: String,
    pub created_at: String,
    pub settings: RunSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSettings {
    pub max_steps: usize,
    pub allow_destructive: bool,
}

/// `meta.json` of a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepMeta {
    pub reason: String,
    /// ISO 8601
    pub timestamp: String,
    pub fingerprint: Fingerprint,
    pub url: String,
    pub title: String,
}

/// `state.json` of a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepState {
    pub dialogs: Vec<DialogRecord>,
    pub title: String,
}

/// When, relative to its action, a step was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionPhase {
    #[serde(rename = "before")]
    Before,
    #[serde(rename = "after-preFill")]
    AfterPreFill,
    #[serde(rename = "after-postFill")]
    AfterPostFill,
}

/// `action.json` of a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(rename = "type")]
    pub action_type: String,
    pub label: String,
    pub phase: ActionPhase,
}

/// Everything captured for one step.
pub struct StepArtifacts<'a> {
    pub screenshot: &'a [u8],
    pub html: &'a str,
    pub snapshot: &'a Snapshot,
    pub meta: &'a StepMeta,
}

/// A materialized step directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepLocation {
    pub ordinal: usize,
    pub dir: PathBuf,
}

/// Writes step artifacts into a run directory.
#[derive(Debug, Clone)]
pub struct StepStore {
    root: PathBuf,
}

impl StepStore {
    /// Open (creating if absent) a run directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join(STEPS_DIR))
            .await
            .map_err(|e| {
                ExplorerError::Other(format!(
                    "Failed to create output directory {}: {}",
                    root.display(),
                    e
                ))
            })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn steps_dir(&self) -> PathBuf {
        self.root.join(STEPS_DIR)
    }

    pub async fn write_run_metadata(&self, metadata: &RunMetadata) -> Result<()> {
        write_json(&self.root.join(RUN_FILE), metadata).await
    }

    /// Number of step directories currently on disk.
    pub async fn count_steps(&self) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(self.steps_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let is_step = name
                .to_str()
                .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
            if is_step && entry.file_type().await?.is_dir() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Allocate the next ordinal and persist a step.
    pub async fn write_step(&self, artifacts: StepArtifacts<'_>) -> Result<StepLocation> {
        let ordinal = self.count_steps().await? + 1;
        let dir = self.steps_dir().join(step_dir_name(ordinal));
        tokio::fs::create_dir_all(&dir).await?;

        tokio::fs::write(dir.join(SCREENSHOT_FILE), artifacts.screenshot).await?;
        tokio::fs::write(dir.join(HTML_FILE), artifacts.html).await?;
        write_json(&dir.join(NODES_FILE), &artifacts.snapshot.nodes).await?;
        write_json(
            &dir.join(STATE_FILE),
            &StepState {
                dialogs: artifacts.snapshot.dialogs.clone(),
                title: artifacts.snapshot.title.clone(),
            },
        )
        .await?;
        write_json(&dir.join(META_FILE), artifacts.meta).await?;

        log::info!(
            "📸 Step {} written ({}, {} KB screenshot, {} KB DOM)",
            step_dir_name(ordinal),
            artifacts.meta.reason,
            artifacts.screenshot.len() / 1024,
            artifacts.html.len() / 1024
        );

        Ok(StepLocation { ordinal, dir })
    }

    pub async fn write_action(&self, step: &StepLocation, record: &ActionRecord) -> Result<()> {
        write_json(&step.dir.join(ACTION_FILE), record).await
    }
}

/// Zero-padded, 3-digit step directory name.
pub fn step_dir_name(ordinal: usize) -> String {
    format!("{:03}", ordinal)
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, json).await.map_err(|e| {
        ExplorerError::Other(format!("Failed to write {}: {}", path.display(), e))
    })
}
