//! Groups cycle events per task and formats notifier messages.
//!
//! Precedence per task: finish, then stuck, then change. A task never gets
//! both a stuck and a finished message in the same cycle.

use tracing::warn;

use crate::hooks::Notifier;
use crate::source::{RestartAttempt, SourceError};
use crate::types::{EventKind, MonitorEvent, Snapshot};

const PREFIX: &str = "Dev Monitor";

/// Build the messages for one cycle, in first-seen task order.
pub fn build_messages(events: &[MonitorEvent], stuck_minutes: u64) -> Vec<String> {
    let mut groups: Vec<(&str, Vec<&MonitorEvent>)> = Vec::new();
    for event in events {
        let id = event.snapshot.task_id.as_str();
        match groups.iter_mut().find(|(key, _)| *key == id) {
            Some((_, group)) => group.push(event),
            None => groups.push((id, vec![event])),
        }
    }

    let mut messages = Vec::new();
    for (_, group) in groups {
        if let Some(finish) = group.iter().find(|e| e.kind == EventKind::Finish) {
            messages.push(finish_message(finish));
            continue;
        }
        if let Some(stuck) = group.iter().find(|e| e.kind == EventKind::Stuck) {
            messages.push(stuck_message(stuck, stuck_minutes));
            continue;
        }

        let mut seen: Vec<Vec<String>> = Vec::new();
        for change in group.iter().filter(|e| e.kind == EventKind::Change) {
            let reasons = change.unique_reasons();
            if seen.contains(&reasons) {
                continue;
            }
            messages.push(change_message(&change.snapshot, &reasons));
            seen.push(reasons);
        }
    }
    messages
}

fn headline(snapshot: &Snapshot) -> String {
    format!("Task {} \"{}\"", snapshot.label(), snapshot.title)
}

fn finish_message(event: &MonitorEvent) -> String {
    let smoke = match event.smoke_ok {
        Some(true) => "✅",
        Some(false) => "❌",
        None => "n/a",
    };
    format!(
        "✅ {PREFIX}: {} finished (smoke: {smoke}). ({})",
        headline(&event.snapshot),
        event.unique_reasons().join(", ")
    )
}

fn stuck_message(event: &MonitorEvent, stuck_minutes: u64) -> String {
    format!(
        "🚨 {PREFIX}: {} looks stuck (updatedAt={}, no update for >= {stuck_minutes}m). {}",
        headline(&event.snapshot),
        event.snapshot.updated_at.as_deref().unwrap_or("unknown"),
        event.unique_reasons().join(", ")
    )
}

fn change_message(snapshot: &Snapshot, reasons: &[String]) -> String {
    format!(
        "🛰️ {PREFIX}: {} changed: {}. openSubs={}",
        headline(snapshot),
        reasons.join(", "),
        snapshot.open_subs.len()
    )
}

/// The single message sent when the board stays unreachable after a restart.
pub fn outage_message(urls: &[String], restart: &RestartAttempt, error: &SourceError) -> String {
    format!(
        "🚨 {PREFIX}: Kanban API unreachable (tried {}). Restart attempted (ok={}). Error: {error}.",
        urls.join(", "),
        restart.ok
    )
}

/// Sent when the retry after a restart succeeded.
pub fn recovered_message(restart: &RestartAttempt) -> String {
    format!(
        "🛠️ {PREFIX}: Kanban API was unreachable, attempted service restart (ok={}). Retry succeeded.",
        restart.ok
    )
}

/// Hand each message to the notifier. Failures are logged and skipped.
/// Returns how many were delivered.
pub async fn emit(notifier: &dyn Notifier, messages: &[String]) -> usize {
    let mut delivered = 0;
    for message in messages {
        match notifier.send(message).await {
            Ok(()) => delivered += 1,
            Err(e) => warn!("Notification failed: {:#}", e),
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeNotifier;
    use crate::types::TaskStatus;

    fn snap(id: &str, seq: u64) -> Snapshot {
        Snapshot {
            task_id: id.into(),
            seq: Some(seq),
            title: format!("Title {id}"),
            status: TaskStatus::InProgress,
            updated_at: Some("2024-01-01T10:00:00Z".into()),
            open_subs: vec!["a".into(), "b".into()],
            ..Default::default()
        }
    }

    fn ev(kind: EventKind, id: &str, reasons: &[&str]) -> MonitorEvent {
        MonitorEvent::new(
            kind,
            snap(id, 7),
            reasons.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_no_events_no_messages() {
        assert!(build_messages(&[], 30).is_empty());
    }

    #[test]
    fn test_finish_suppresses_stuck_and_change() {
        let mut finish = ev(EventKind::Finish, "t1", &["status in-progress→review"]);
        finish.snapshot.status = TaskStatus::Review;
        finish.smoke_ok = Some(true);
        finish.push_reason("moved to review + checklist");
        finish.push_reason("moved to review + checklist");
        let events = vec![
            ev(EventKind::Change, "t1", &["version 3→4"]),
            ev(EventKind::Stuck, "t1", &["no updatedAt change for >= 30m"]),
            finish,
        ];

        let messages = build_messages(&events, 30);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("finished (smoke: ✅)"));
        assert!(messages[0].contains("status in-progress→review"));
        assert_eq!(messages[0].matches("moved to review + checklist").count(), 1);
    }

    #[test]
    fn test_stuck_suppresses_change() {
        let events = vec![
            ev(EventKind::Change, "t1", &["version 3→4"]),
            ev(EventKind::Stuck, "t1", &["auto-commented"]),
        ];
        let messages = build_messages(&events, 30);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("looks stuck"));
        assert!(messages[0].contains(">= 30m"));
        assert!(messages[0].contains("#7"));
        assert!(messages[0].contains("updatedAt=2024-01-01T10:00:00Z"));
    }

    #[test]
    fn test_change_messages_dedup_reason_sets() {
        let events = vec![
            ev(EventKind::Change, "t1", &["new"]),
            ev(EventKind::Change, "t1", &["new", "new"]),
            ev(EventKind::Change, "t1", &["version 1→2"]),
        ];
        let messages = build_messages(&events, 30);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("changed: new. openSubs=2"));
        assert!(messages[1].contains("changed: version 1→2"));
    }

    #[test]
    fn test_one_message_per_task_in_first_seen_order() {
        let events = vec![
            ev(EventKind::Change, "b", &["new"]),
            ev(EventKind::Stuck, "a", &["auto-commented"]),
            ev(EventKind::Change, "b", &["new"]),
        ];
        let messages = build_messages(&events, 30);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("Title b"));
        assert!(messages[1].contains("Title a"));
    }

    #[test]
    fn test_outage_message_lists_every_url() {
        let urls = vec!["http://a:3001".to_string(), "http://b:3001".to_string()];
        let error = SourceError::AllFailed {
            tried: urls.clone(),
            last: "HTTP 503".into(),
        };
        let restart = RestartAttempt {
            ok: false,
            error: Some("unit missing".into()),
        };
        let message = outage_message(&urls, &restart, &error);
        assert!(message.contains("tried http://a:3001, http://b:3001"));
        assert!(message.contains("ok=false"));
        assert!(message.contains("HTTP 503"));
    }

    #[tokio::test]
    async fn test_emit_swallows_failures() {
        let notifier = FakeNotifier::failing_on("first");
        let messages = vec!["first".to_string(), "second".to_string()];
        assert_eq!(emit(&notifier, &messages).await, 1);
        assert_eq!(notifier.messages(), messages);
    }
}
