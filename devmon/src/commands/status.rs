//! Status command - Board reachability, review queue and monitor state

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use super::{load_config, ConfigArgs};
use crate::board::{KanbanClient, TaskBoard};
use crate::hooks::{HealthProbe, HttpProbe};
use crate::state_store::StateStore;
use crate::types::{MonitorState, Task, TaskStatus};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EndpointStatus {
    url: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tasks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SmokeStatus {
    url: String,
    ok: bool,
    detail: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewItem {
    task_id: String,
    seq: Option<u64>,
    title: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BoardOverview {
    base: String,
    counts: BTreeMap<String, usize>,
    review: Vec<ReviewItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StateOverview {
    path: String,
    snapshots: usize,
    stuck_markers: usize,
    finish_markers: usize,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HookStatus {
    name: String,
    command: String,
    available: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    endpoints: Vec<EndpointStatus>,
    smoke: SmokeStatus,
    board: Option<BoardOverview>,
    state: StateOverview,
    hooks: Vec<HookStatus>,
}

pub fn run(args: &ConfigArgs, json: bool) -> anyhow::Result<()> {
    let (config, _) = load_config(args)?;
    let board = KanbanClient::new(config.request_timeout())?;
    let probe = HttpProbe::new(config.smoke_test_url.clone(), config.smoke_timeout())?;
    let rt = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;

    let (endpoints, overview, smoke) = rt.block_on(async {
        let mut endpoints = Vec::new();
        let mut overview = None;
        for url in &config.urls {
            let base = url.trim_end_matches('/');
            match board.list_tasks(base).await {
                Ok(tasks) => {
                    if overview.is_none() {
                        overview = Some(board_overview(base, &tasks));
                    }
                    endpoints.push(EndpointStatus {
                        url: base.to_string(),
                        ok: true,
                        tasks: Some(tasks.len()),
                        error: None,
                    });
                }
                Err(e) => endpoints.push(EndpointStatus {
                    url: base.to_string(),
                    ok: false,
                    tasks: None,
                    error: Some(e.to_string()),
                }),
            }
        }
        let smoke = probe.probe().await;
        (endpoints, overview, smoke)
    });

    let store = StateStore::new(&config.state_path);
    let report = StatusReport {
        endpoints,
        smoke: SmokeStatus {
            url: config.smoke_test_url.clone(),
            ok: smoke.ok,
            detail: smoke.describe(),
        },
        board: overview,
        state: state_overview(store.path(), &store.load()),
        hooks: vec![
            hook_status("restart", &config.restart_command),
            hook_status("notify", &config.notify_command),
        ],
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn board_overview(base: &str, tasks: &[Task]) -> BoardOverview {
    let mut counts = BTreeMap::new();
    for task in tasks {
        *counts.entry(task.status.to_string()).or_insert(0) += 1;
    }
    let review = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Review)
        .map(|t| ReviewItem {
            task_id: t.id.clone(),
            seq: t.seq,
            title: t.title.clone(),
        })
        .collect();
    BoardOverview {
        base: base.to_string(),
        counts,
        review,
    }
}

fn state_overview(path: &Path, state: &MonitorState) -> StateOverview {
    StateOverview {
        path: path.display().to_string(),
        snapshots: state.tasks.len(),
        stuck_markers: state.stuck_comment_at_ms.values().filter(|ms| **ms > 0).count(),
        finish_markers: state.finish_handled_at_ms.len(),
        updated_at: state.updated_at,
    }
}

fn hook_status(name: &str, argv: &[String]) -> HookStatus {
    HookStatus {
        name: name.to_string(),
        command: argv.join(" "),
        available: argv
            .first()
            .is_some_and(|program| which::which(program).is_ok()),
    }
}

fn icon(ok: bool) -> String {
    if ok {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

fn print_report(report: &StatusReport) {
    println!("{}", "\nDev Monitor Status\n".bold());

    println!("{}", "Board endpoints:".dimmed());
    for endpoint in &report.endpoints {
        match (&endpoint.tasks, &endpoint.error) {
            (Some(count), _) => println!("  {} {} ({} tasks)", icon(true), endpoint.url, count),
            (None, Some(err)) => println!(
                "  {} {}: {}",
                icon(false),
                endpoint.url,
                err.as_str().red()
            ),
            (None, None) => println!("  {} {}", icon(endpoint.ok), endpoint.url),
        }
    }

    println!("{}", "\nSmoke test:".dimmed());
    println!(
        "  {} {} ({})",
        icon(report.smoke.ok),
        report.smoke.url,
        report.smoke.detail
    );

    if let Some(board) = &report.board {
        println!("{}", format!("\nTasks at {}:", board.base).dimmed());
        for (status, count) in &board.counts {
            let label = if status.is_empty() { "(none)" } else { status };
            println!("  {:<14} {}", label, count.to_string().cyan());
        }

        println!("{}", "\nAwaiting review:".dimmed());
        if board.review.is_empty() {
            println!("  {}", "(none)".dimmed());
        }
        for item in &board.review {
            let label = item
                .seq
                .map_or_else(|| item.task_id.clone(), |seq| format!("#{seq}"));
            println!("  {} {}", label.yellow(), item.title);
        }
    }

    println!("{}", "\nMonitor state:".dimmed());
    let state = &report.state;
    println!("  file:            {}", state.path.cyan());
    println!("  snapshots:       {}", state.snapshots.to_string().cyan());
    println!("  stuck markers:   {}", state.stuck_markers.to_string().cyan());
    println!("  finish markers:  {}", state.finish_markers.to_string().cyan());
    match state.updated_at {
        Some(at) => println!("  last updated:    {}", at.to_rfc3339().cyan()),
        None => println!("  last updated:    {}", "never".dimmed()),
    }

    println!("{}", "\nHooks:".dimmed());
    for hook in &report.hooks {
        if hook.command.is_empty() {
            println!("  {} {}: {}", "!".yellow(), hook.name, "(not configured)".dimmed());
        } else {
            println!("  {} {}: {}", icon(hook.available), hook.name, hook.command);
        }
    }
    println!();
}
