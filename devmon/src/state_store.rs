//! File-backed [`MonitorState`] persistence.
//!
//! `load` never fails: a missing or unreadable file yields a fresh state.
//! `save` writes through a temp file and rename, so a crash leaves either
//! the previous state or the new one on disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::types::MonitorState;

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> MonitorState {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No state file at {}, starting fresh", self.path.display());
                return MonitorState::default();
            }
            Err(e) => {
                warn!("Cannot read state file {}: {}", self.path.display(), e);
                return MonitorState::default();
            }
        };

        match serde_json::from_str::<MonitorState>(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    "Corrupt state file {}, starting fresh: {}",
                    self.path.display(),
                    e
                );
                MonitorState::default()
            }
        }
    }

    /// Stamp `updated_at` and persist.
    pub fn save(&self, state: &mut MonitorState, now: DateTime<Utc>) -> Result<()> {
        state.updated_at = Some(now);
        atomic_write_json(&self.path, state)
    }
}

/// Write data to a file atomically using temp file + rename pattern.
fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    let mut json = serde_json::to_string_pretty(data)?;
    json.push('\n');

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    fs::write(&tmp_path, &json)
        .with_context(|| format!("Failed to write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "Failed to rename {} -> {}",
            tmp_path.display(),
            path.display()
        )
    })?;
    Ok(())
}
