//! Deterministic remediations for stuck and finish events.
//!
//! Every write is a conditional PATCH keyed on the observed version. Dedup
//! markers in [`MonitorState`] are only set after the board accepted the
//! write; on failure the reason is attached to the event and the next cycle
//! decides again.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};

use crate::board::{PatchRequest, TaskBoard, TaskPatch};
use crate::hooks::{HealthProbe, ProbeResult};
use crate::types::{DiscussionEntry, EventKind, MonitorEvent, MonitorState, TaskStatus};

/// First line of the stuck template; also what the stuck report searches for.
pub const STUCK_MARKER: &str = "Detected a task that looks stuck";

pub fn stuck_template(threshold_minutes: u64) -> String {
    [
        format!("{STUCK_MARKER} (no update for >= {threshold_minutes} minutes)."),
        String::new(),
        "Blockers:".to_string(),
        "- (please fill in)".to_string(),
        String::new(),
        "Next steps:".to_string(),
        "- (please fill in: split into subtasks / check logs / rerun a phase)".to_string(),
    ]
    .join("\n")
}

pub fn acceptance_checklist() -> String {
    [
        "🚀 Delivery complete, please review and accept:",
        "- [ ] Behaviour matches the requirements",
        "- [ ] Main flows work end to end",
        "- [ ] Edge cases and error messages are reasonable",
        "- [ ] If needed: regression / performance check",
        "",
        "(Reply on this card if something is off and it will be fixed.)",
    ]
    .join("\n")
}

pub fn smoke_line(result: &ProbeResult) -> String {
    if result.ok {
        format!("✅ Automatic smoke test passed ({})", result.describe())
    } else {
        format!(
            "❌ Automatic smoke test failed (service unreachable: {})",
            result.describe()
        )
    }
}

/// Applies remediations against one board base URL.
pub struct AutomationDispatcher<'a> {
    board: &'a dyn TaskBoard,
    probe: &'a dyn HealthProbe,
    base: &'a str,
    author: &'a str,
    stuck_minutes: u64,
}

impl<'a> AutomationDispatcher<'a> {
    pub fn new(
        board: &'a dyn TaskBoard,
        probe: &'a dyn HealthProbe,
        base: &'a str,
        author: &'a str,
        stuck_minutes: u64,
    ) -> Self {
        Self {
            board,
            probe,
            base,
            author,
            stuck_minutes,
        }
    }

    /// Remediate every stuck/finish event in order. Change events are untouched.
    pub async fn dispatch(
        &self,
        events: &mut [MonitorEvent],
        state: &mut MonitorState,
        now: DateTime<Utc>,
    ) {
        for event in events.iter_mut() {
            match event.kind {
                EventKind::Stuck => self.remediate_stuck(event, state, now).await,
                EventKind::Finish => self.remediate_finish(event, state, now).await,
                EventKind::Change => {}
            }
        }
    }

    async fn remediate_stuck(
        &self,
        event: &mut MonitorEvent,
        state: &mut MonitorState,
        now: DateTime<Utc>,
    ) {
        let task_id = event.snapshot.task_id.clone();
        if state.stuck_marker(&task_id).is_some() {
            event.push_reason("comment already added for this stuck episode");
            return;
        }

        let patch = TaskPatch {
            discussion_append: Some(self.entry(stuck_template(self.stuck_minutes), now)),
            ..Default::default()
        };
        match self.apply(event, patch).await {
            Ok(()) => {
                state.record_stuck(&task_id, now.timestamp_millis());
                info!("Stuck comment added to {}", event.snapshot.label());
                event.push_reason("auto-commented");
            }
            Err(e) => {
                warn!("Stuck comment failed for {}: {}", event.snapshot.label(), e);
                event.push_reason(format!("auto-comment failed: {e}"));
            }
        }
    }

    async fn remediate_finish(
        &self,
        event: &mut MonitorEvent,
        state: &mut MonitorState,
        now: DateTime<Utc>,
    ) {
        let smoke = self.probe.probe().await;
        event.smoke_ok = Some(smoke.ok);

        let text = format!("{}\n\n{}", smoke_line(&smoke), acceptance_checklist());
        // Never `done`: acceptance stays with a human.
        let move_to_review = !matches!(
            event.snapshot.status,
            TaskStatus::Review | TaskStatus::Archived
        );
        let patch = TaskPatch {
            status: move_to_review.then_some(TaskStatus::Review),
            discussion_append: Some(self.entry(text, now)),
            ..Default::default()
        };

        match self.apply(event, patch).await {
            Ok(()) => {
                state.record_finish(&event.snapshot.task_id, now.timestamp_millis());
                info!(
                    "Finish handled for {} (smoke ok={})",
                    event.snapshot.label(),
                    smoke.ok
                );
                event.push_reason(if move_to_review {
                    "moved to review + checklist"
                } else {
                    "acceptance checklist appended"
                });
            }
            Err(e) => {
                warn!("Finish handling failed for {}: {}", event.snapshot.label(), e);
                event.push_reason(format!("finish handling failed: {e}"));
            }
        }
    }

    async fn apply(&self, event: &MonitorEvent, patch: TaskPatch) -> Result<(), String> {
        // Without a version there is no precondition to guard the write.
        let version = event
            .snapshot
            .version
            .ok_or_else(|| "task has no version to guard the write".to_string())?;
        let request = PatchRequest {
            if_version: version,
            patch,
        };
        self.board
            .patch_task(self.base, &event.snapshot.task_id, &request)
            .await
            .map_err(|e| e.to_string())
    }

    fn entry(&self, text: String, now: DateTime<Utc>) -> DiscussionEntry {
        DiscussionEntry {
            author: self.author.to_string(),
            text,
            at: Some(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}
