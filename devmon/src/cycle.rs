//! One monitor cycle: fetch → detect → remediate → persist → notify.
//!
//! The cycle is strictly sequential. Remediation markers land in the state
//! before it is saved, and notifications go out only after the save.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::automation::AutomationDispatcher;
use crate::board::TaskBoard;
use crate::detect;
use crate::emitter;
use crate::hooks::{HealthProbe, Notifier, ServiceRestarter};
use crate::source::{FetchOutcome, RestartAttempt, SourceError, TaskSource};
use crate::state_store::StateStore;
use crate::types::{EventKind, EventSummary, MonitorConfig, MonitorEvent, Snapshot, Task};

/// External collaborators of a cycle.
pub struct Collaborators<'a> {
    pub board: &'a dyn TaskBoard,
    pub restarter: &'a dyn ServiceRestarter,
    pub probe: &'a dyn HealthProbe,
    pub notifier: &'a dyn Notifier,
}

#[derive(Debug)]
pub struct CycleReport {
    pub at: DateTime<Utc>,
    /// Base URL that answered. `None` after a fatal outage.
    pub base: Option<String>,
    pub events: Vec<MonitorEvent>,
    /// Set when the first fetch failed and a restart was attempted.
    pub restart: Option<RestartAttempt>,
    pub outage: Option<SourceError>,
    pub notifications_sent: usize,
}

/// Machine-readable summary printed for cron runners.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub at: String,
    pub base: String,
    pub events: Vec<EventSummary>,
}

impl CycleReport {
    pub fn is_fatal(&self) -> bool {
        self.outage.is_some()
    }

    /// `None` when nothing happened or the board was unreachable.
    pub fn summary(&self) -> Option<CycleSummary> {
        let base = self.base.as_ref()?;
        if self.events.is_empty() {
            return None;
        }
        Some(CycleSummary {
            at: self.at.to_rfc3339_opts(SecondsFormat::Millis, true),
            base: base.clone(),
            events: self.events.iter().map(EventSummary::from).collect(),
        })
    }
}

/// Run one cycle against the persisted state in `store`.
///
/// Only a failure to persist the state is returned as an error; every other
/// failure is reported in the returned [`CycleReport`].
pub async fn run_cycle(
    config: &MonitorConfig,
    deps: &Collaborators<'_>,
    store: &StateStore,
    now: DateTime<Utc>,
) -> Result<CycleReport> {
    let mut state = store.load();
    let source = TaskSource::new(deps.board, &config.urls);

    let (fetched, restart) = match source.fetch_with_restart(deps.restarter).await {
        FetchOutcome::Ok(fetched) => (fetched, None),
        FetchOutcome::Recovered { fetched, restart } => (fetched, Some(restart)),
        FetchOutcome::Unreachable { error, restart } => {
            error!("Board unreachable after restart: {}", error);
            let saved = store.save(&mut state, now);
            let message = emitter::outage_message(source.urls(), &restart, &error);
            let notifications_sent = emitter::emit(deps.notifier, &[message]).await;
            saved.with_context(|| format!("Failed to save {}", store.path().display()))?;
            return Ok(CycleReport {
                at: now,
                base: None,
                events: Vec::new(),
                restart: Some(restart),
                outage: Some(error),
                notifications_sent,
            });
        }
    };

    let monitored: Vec<&Task> = fetched
        .tasks
        .iter()
        .filter(|task| match config.only_assignee.as_deref() {
            Some(assignee) => task.assignee == assignee,
            None => true,
        })
        .collect();
    let by_id: HashMap<String, &Task> = monitored
        .iter()
        .map(|task| (task.id.clone(), *task))
        .collect();

    let now_ms = now.timestamp_millis();
    let mut events =
        detect::detect_finished(&state, &by_id, now_ms, config.finish_dedup_ms());

    let mut in_progress = HashSet::new();
    for task in monitored.iter().filter(|t| t.status.is_in_progress()) {
        let current = Snapshot::of(task);
        let previous = state.snapshot(&current.task_id).cloned();

        let change = detect::diff(previous.as_ref(), &current);
        let stuck = detect::is_stuck(previous.as_ref(), &current, config.stuck_minutes, now);
        if detect::episode_ended(previous.as_ref(), &current) {
            state.clear_stuck(&current.task_id);
        }
        debug!(
            "{}: changed={} stuck={} reasons={:?}",
            current.label(),
            change.changed,
            stuck,
            change.reasons
        );

        if change.changed {
            events.push(MonitorEvent::new(
                EventKind::Change,
                current.clone(),
                change.reasons,
            ));
        }
        if stuck {
            events.push(MonitorEvent::new(
                EventKind::Stuck,
                current.clone(),
                vec![detect::stuck_reason(config.stuck_minutes)],
            ));
        }
        in_progress.insert(current.task_id.clone());
        state.tasks.insert(current.task_id.clone(), current);
    }
    state.retain_in_progress(&in_progress);

    let dispatcher = AutomationDispatcher::new(
        deps.board,
        deps.probe,
        &fetched.base,
        &config.automation_author,
        config.stuck_minutes,
    );
    dispatcher.dispatch(&mut events, &mut state, now).await;

    let pruned = state.prune_finish_markers(now_ms, config.finish_marker_retention_ms());
    if pruned > 0 {
        debug!("Pruned {} expired finish markers", pruned);
    }
    let saved = store.save(&mut state, now);

    let mut messages = Vec::new();
    if let Some(restart) = &restart {
        messages.push(emitter::recovered_message(restart));
    }
    messages.extend(emitter::build_messages(&events, config.stuck_minutes));
    let notifications_sent = emitter::emit(deps.notifier, &messages).await;
    saved.with_context(|| format!("Failed to save {}", store.path().display()))?;

    info!(
        "Cycle via {}: {} tasks, {} in progress, {} events, {}/{} notifications sent",
        fetched.base,
        monitored.len(),
        in_progress.len(),
        events.len(),
        notifications_sent,
        messages.len()
    );

    Ok(CycleReport {
        at: now,
        base: Some(fetched.base.clone()),
        events,
        restart,
        outage: None,
        notifications_sent,
    })
}
