use serde::Serialize;

use super::enums::EventKind;
use super::state::Snapshot;

/// A detector finding for one task in one cycle. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorEvent {
    pub kind: EventKind,
    pub snapshot: Snapshot,
    pub reasons: Vec<String>,
    /// Smoke-test outcome, set by finish remediation once the probe ran.
    pub smoke_ok: Option<bool>,
}

impl MonitorEvent {
    pub fn new(kind: EventKind, snapshot: Snapshot, reasons: Vec<String>) -> Self {
        Self {
            kind,
            snapshot,
            reasons,
            smoke_ok: None,
        }
    }

    pub fn push_reason(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    /// Reasons with duplicates removed, first occurrence wins.
    pub fn unique_reasons(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for r in &self.reasons {
            if !seen.contains(r) {
                seen.push(r.clone());
            }
        }
        seen
    }
}

/// One line of the machine-readable cycle summary printed for cron runners.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub kind: EventKind,
    pub task_id: String,
    pub seq: Option<u64>,
    pub title: String,
    pub status: String,
    pub reasons: Vec<String>,
}

impl From<&MonitorEvent> for EventSummary {
    fn from(event: &MonitorEvent) -> Self {
        Self {
            kind: event.kind,
            task_id: event.snapshot.task_id.clone(),
            seq: event.snapshot.seq,
            title: event.snapshot.title.clone(),
            status: event.snapshot.status.to_string(),
            reasons: event.reasons.clone(),
        }
    }
}
