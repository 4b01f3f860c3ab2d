//! Stuck analysis over the automation's own discussion entries.

use chrono::{DateTime, Utc};

use crate::automation::STUCK_MARKER;
use crate::detect::parse_timestamp;
use crate::types::{Task, TaskStatus};

const TOP_TASKS: usize = 5;

/// How often the stuck comment was posted on one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StuckStat {
    pub task_id: String,
    pub seq: Option<u64>,
    pub title: String,
    pub status: TaskStatus,
    pub count: usize,
}

/// Count stuck comments by `author` at or after `since`, most frequent first.
/// Ties keep board order.
pub fn collect_stuck_events(tasks: &[Task], author: &str, since: DateTime<Utc>) -> Vec<StuckStat> {
    let mut stats: Vec<StuckStat> = Vec::new();
    for task in tasks {
        let count = task
            .discussion
            .iter()
            .filter(|entry| entry.author == author && entry.text.contains(STUCK_MARKER))
            .filter(|entry| {
                entry
                    .at
                    .as_deref()
                    .and_then(parse_timestamp)
                    .is_some_and(|at| at >= since)
            })
            .count();
        if count == 0 {
            continue;
        }
        stats.push(StuckStat {
            task_id: task.id.clone(),
            seq: task.seq,
            title: task.title.clone(),
            status: task.status.clone(),
            count,
        });
    }
    stats.sort_by(|a, b| b.count.cmp(&a.count));
    stats
}

pub fn total_events(stats: &[StuckStat]) -> usize {
    stats.iter().map(|s| s.count).sum()
}

/// Markdown report for the `from..to` window.
pub fn build_report(stats: &[StuckStat], from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    let mut lines = vec![
        format!(
            "📊 Stuck analysis ({} ~ {})",
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        ),
        String::new(),
        format!(
            "Detected **{}** stuck events across **{}** tasks.",
            total_events(stats),
            stats.len()
        ),
        String::new(),
    ];

    if !stats.is_empty() {
        lines.push("### Top Stuck Tasks".to_string());
        lines.push(String::new());
        for (i, stat) in stats.iter().take(TOP_TASKS).enumerate() {
            let label = stat
                .seq
                .map_or_else(|| stat.task_id.clone(), |seq| format!("#{seq}"));
            lines.push(format!(
                "{}. **[Task {}]** {} (Count: {}) [{}]",
                i + 1,
                label,
                stat.title,
                stat.count,
                stat.status
            ));
        }
        lines.push(String::new());
    }

    lines.push("_(generated by devmon report)_".to_string());
    lines.join("\n")
}
