//! Report command - Summarise stuck comments over the last N days

use anyhow::Context;
use chrono::{Duration, Utc};
use colored::Colorize;
use tracing::info;

use super::{load_config, ConfigArgs};
use crate::board::KanbanClient;
use crate::hooks::notifier_from_argv;
use crate::report::{build_report, collect_stuck_events, total_events};
use crate::source::TaskSource;

pub fn run(args: &ConfigArgs, days: u32, dry_run: bool) -> anyhow::Result<()> {
    let (config, _) = load_config(args)?;
    let board = KanbanClient::new(config.request_timeout())?;
    let source = TaskSource::new(&board, &config.urls);
    let rt = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;

    let fetched = rt.block_on(source.fetch())?;
    info!("Fetched {} tasks from {}", fetched.tasks.len(), fetched.base);

    let to = Utc::now();
    let from = to - Duration::days(i64::from(days));
    let stats = collect_stuck_events(&fetched.tasks, &config.automation_author, from);
    let total = total_events(&stats);

    if total == 0 {
        println!(
            "{}",
            format!("No stuck events in the last {days} days. Nothing to report.").dimmed()
        );
        return Ok(());
    }

    let report = build_report(&stats, from, to);
    if dry_run {
        println!("{}", "--- DRY RUN: report ---".dimmed());
        println!("{report}");
        println!("{}", "--- END ---".dimmed());
        return Ok(());
    }

    let notifier = notifier_from_argv(&config.notify_command, config.command_timeout());
    rt.block_on(notifier.send(&report))
        .context("Failed to send stuck report")?;
    println!(
        "{} Stuck report sent ({} events across {} tasks)",
        "✓".green(),
        total,
        stats.len()
    );
    Ok(())
}
