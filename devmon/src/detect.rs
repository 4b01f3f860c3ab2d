//! Change, stuck and finish detection.
//!
//! Pure functions over snapshots; the wall clock is always passed in.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::types::{EventKind, MonitorEvent, MonitorState, Snapshot, Task};

/// Result of comparing two snapshots of the same task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDiff {
    pub changed: bool,
    pub reasons: Vec<String>,
}

/// Compare the previous snapshot (if any) to the current one.
///
/// Open subtasks are compared as an ordered list, so a reorder is a change.
pub fn diff(previous: Option<&Snapshot>, current: &Snapshot) -> ChangeDiff {
    let prev = match previous {
        Some(prev) => prev,
        None => {
            return ChangeDiff {
                changed: true,
                reasons: vec!["new".to_string()],
            }
        }
    };

    let mut reasons = Vec::new();
    if prev.status != current.status {
        reasons.push(format!("status {}→{}", prev.status, current.status));
    }
    if prev.version != current.version {
        reasons.push(format!(
            "version {}→{}",
            fmt_version(prev.version),
            fmt_version(current.version)
        ));
    }
    if prev.open_subs.join("\n") != current.open_subs.join("\n") {
        reasons.push("openSubs changed".to_string());
    }

    ChangeDiff {
        changed: !reasons.is_empty(),
        reasons,
    }
}

fn fmt_version(version: Option<u64>) -> String {
    version.map_or_else(|| "none".to_string(), |v| v.to_string())
}

/// A task is stuck when its `updatedAt` did not move since the previous
/// snapshot and is at least `threshold_minutes` old.
pub fn is_stuck(
    previous: Option<&Snapshot>,
    current: &Snapshot,
    threshold_minutes: u64,
    now: DateTime<Utc>,
) -> bool {
    let Some(prev) = previous else {
        return false;
    };
    let (Some(prev_ts), Some(cur_ts)) = (prev.updated_at.as_deref(), current.updated_at.as_deref())
    else {
        return false;
    };
    if prev_ts != cur_ts {
        return false;
    }
    let Some(updated) = parse_timestamp(cur_ts) else {
        return false;
    };

    let age_ms = (now - updated).num_milliseconds();
    let threshold_ms = i64::try_from(threshold_minutes.saturating_mul(60_000)).unwrap_or(i64::MAX);
    age_ms >= threshold_ms
}

/// True when the episode marker for this task must be reset: both snapshots
/// carry a timestamp and it moved.
pub fn episode_ended(previous: Option<&Snapshot>, current: &Snapshot) -> bool {
    match (
        previous.and_then(|p| p.updated_at.as_deref()),
        current.updated_at.as_deref(),
    ) {
        (Some(prev), Some(cur)) => prev != cur,
        _ => false,
    }
}

pub fn stuck_reason(threshold_minutes: u64) -> String {
    format!("no updatedAt change for >= {threshold_minutes}m")
}

/// Parse a board timestamp: RFC 3339, naive ISO (taken as UTC), or epoch ms.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

/// Tasks that were in progress at the previous cycle and are still on the
/// board with another status. Tasks handled within `window_ms` are skipped.
pub fn detect_finished(
    state: &MonitorState,
    current: &HashMap<String, &Task>,
    now_ms: i64,
    window_ms: i64,
) -> Vec<MonitorEvent> {
    let mut events = Vec::new();
    for id in state.in_progress_ids() {
        let Some(task) = current.get(&id) else {
            continue;
        };
        if task.status.is_in_progress() {
            continue;
        }
        if state.finish_handled_within(&id, now_ms, window_ms) {
            continue;
        }

        let snapshot = Snapshot::of(task);
        let reason = format!("status in-progress→{}", snapshot.status);
        events.push(MonitorEvent::new(EventKind::Finish, snapshot, vec![reason]));
    }
    events
}
