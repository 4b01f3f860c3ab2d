//! Persisted monitor state: per-task snapshots and the two dedup ledgers.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::TaskStatus;
use super::task::Task;

/// Reduced, comparable projection of a task at one observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub task_id: String,
    #[serde(default)]
    pub seq: Option<u64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub open_subs: Vec<String>,
}

impl Snapshot {
    pub fn of(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            seq: task.seq,
            title: task.title.clone(),
            status: task.status.clone(),
            assignee: task.assignee.clone(),
            version: task.version,
            updated_at: task.updated_at.clone(),
            open_subs: task.open_subtask_titles(),
        }
    }

    /// `#42` style label, falling back to the task id when the board has no seq.
    pub fn label(&self) -> String {
        match self.seq {
            Some(seq) => format!("#{seq}"),
            None => self.task_id.clone(),
        }
    }
}

/// State carried between monitor invocations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorState {
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Snapshots of tasks that were in progress at the last successful fetch.
    #[serde(default)]
    pub tasks: BTreeMap<String, Snapshot>,
    /// Epoch ms of the stuck remediation for the current episode.
    #[serde(default)]
    pub stuck_comment_at_ms: BTreeMap<String, i64>,
    /// Epoch ms of the last finish remediation.
    #[serde(default)]
    pub finish_handled_at_ms: BTreeMap<String, i64>,
}

impl MonitorState {
    pub fn snapshot(&self, task_id: &str) -> Option<&Snapshot> {
        self.tasks.get(task_id)
    }

    /// Ids whose stored snapshot was in progress.
    pub fn in_progress_ids(&self) -> Vec<String> {
        self.tasks
            .values()
            .filter(|s| s.status.is_in_progress())
            .map(|s| s.task_id.clone())
            .collect()
    }

    pub fn stuck_marker(&self, task_id: &str) -> Option<i64> {
        self.stuck_comment_at_ms
            .get(task_id)
            .copied()
            .filter(|ms| *ms > 0)
    }

    pub fn record_stuck(&mut self, task_id: &str, at_ms: i64) {
        self.stuck_comment_at_ms.insert(task_id.to_string(), at_ms);
    }

    pub fn clear_stuck(&mut self, task_id: &str) {
        self.stuck_comment_at_ms.remove(task_id);
    }

    pub fn record_finish(&mut self, task_id: &str, at_ms: i64) {
        self.finish_handled_at_ms.insert(task_id.to_string(), at_ms);
    }

    /// True when a finish remediation for this task is younger than `window_ms`.
    pub fn finish_handled_within(&self, task_id: &str, now_ms: i64, window_ms: i64) -> bool {
        match self.finish_handled_at_ms.get(task_id) {
            Some(&at) if at > 0 => now_ms - at < window_ms,
            _ => false,
        }
    }

    /// Keep only snapshots (and stuck episodes) of the given in-progress ids.
    pub fn retain_in_progress(&mut self, in_progress: &HashSet<String>) {
        self.tasks.retain(|id, _| in_progress.contains(id));
        self.stuck_comment_at_ms
            .retain(|id, _| in_progress.contains(id));
    }

    /// Drop finish markers older than `retention_ms`. Returns how many were removed.
    pub fn prune_finish_markers(&mut self, now_ms: i64, retention_ms: i64) -> usize {
        let before = self.finish_handled_at_ms.len();
        self.finish_handled_at_ms
            .retain(|_, at| now_ms - *at < retention_ms);
        before - self.finish_handled_at_ms.len()
    }
}
