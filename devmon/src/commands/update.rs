//! Update command - Guarded manual task mutation
//!
//! The task is fetched first and the write carries its version as
//! `ifVersion`, so a concurrent edit makes the update fail instead of
//! overwriting it.

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, SecondsFormat, Utc};
use colored::Colorize;

use super::{load_config, ConfigArgs};
use crate::board::{KanbanClient, PatchRequest, TaskBoard, TaskPatch};
use crate::source::TaskSource;
use crate::types::{DiscussionEntry, Subtask, Task, TaskStatus};

#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub task_id: String,
    pub set_status: Option<String>,
    pub done_subtasks: Vec<String>,
    pub undone_subtasks: Vec<String>,
    pub append_discussion: Option<String>,
    pub author: Option<String>,
    pub at: Option<String>,
    pub dry_run: bool,
}

pub fn run(args: &ConfigArgs, options: &UpdateOptions) -> anyhow::Result<()> {
    let (config, _) = load_config(args)?;
    let board = KanbanClient::new(config.request_timeout())?;
    let source = TaskSource::new(&board, &config.urls);
    let rt = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;

    let fetched = rt.block_on(source.fetch())?;
    let task = fetched
        .tasks
        .iter()
        .find(|t| t.id == options.task_id)
        .ok_or_else(|| anyhow!("Task not found: {}", options.task_id))?;
    let version = task
        .version
        .ok_or_else(|| anyhow!("Task {} has no version; refusing an unguarded write", task.id))?;

    let author = options
        .author
        .clone()
        .unwrap_or_else(|| config.automation_author.clone());
    let patch = build_patch(task, options, &author, Utc::now())?;
    let request = PatchRequest {
        if_version: version,
        patch,
    };

    if options.dry_run {
        println!("{}", serde_json::to_string_pretty(&request)?);
        return Ok(());
    }

    rt.block_on(board.patch_task(&fetched.base, &task.id, &request))
        .with_context(|| format!("Failed to update task {}", task.id))?;
    println!("{} Updated task {} (ifVersion {})", "✓".green(), task.id, version);
    Ok(())
}

/// Index of the subtask whose trimmed title equals `needle` or where one
/// title contains the other. Exact matches win.
pub fn find_subtask(subtasks: &[Subtask], needle: &str) -> Option<usize> {
    let needle = needle.trim();
    if needle.is_empty() {
        return None;
    }
    subtasks
        .iter()
        .position(|s| s.title.trim() == needle)
        .or_else(|| {
            subtasks.iter().position(|s| {
                let title = s.title.trim();
                !title.is_empty() && (title.contains(needle) || needle.contains(title))
            })
        })
}

/// Build the patch for `options` against the fetched `task`.
pub fn build_patch(
    task: &Task,
    options: &UpdateOptions,
    author: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<TaskPatch> {
    let mut patch = TaskPatch::default();
    let stamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);

    if let Some(raw) = &options.set_status {
        let status: TaskStatus = raw.parse().map_err(|e: String| anyhow!(e))?;
        patch.status = Some(status);
    }

    if !options.done_subtasks.is_empty() || !options.undone_subtasks.is_empty() {
        let mut subtasks = task.subtasks.clone();
        for needle in &options.done_subtasks {
            let idx = find_subtask(&subtasks, needle)
                .ok_or_else(|| anyhow!("Subtask not found: {}", needle))?;
            let subtask = &mut subtasks[idx];
            subtask.done = true;
            if subtask.completed_at.is_none() {
                subtask.completed_at = Some(stamp.clone());
            }
        }
        for needle in &options.undone_subtasks {
            let idx = find_subtask(&subtasks, needle)
                .ok_or_else(|| anyhow!("Subtask not found: {}", needle))?;
            let subtask = &mut subtasks[idx];
            subtask.done = false;
            subtask.completed_at = None;
        }
        patch.subtasks = Some(subtasks);
    }

    if let Some(text) = &options.append_discussion {
        if text.trim().is_empty() {
            bail!("Discussion text must not be empty");
        }
        patch.discussion_append = Some(DiscussionEntry {
            author: author.to_string(),
            text: text.clone(),
            at: Some(options.at.clone().unwrap_or(stamp)),
        });
    }

    if patch.is_empty() {
        bail!("Nothing to update: pass --set-status, --done-subtask, --undone-subtask or --append-discussion");
    }
    Ok(patch)
}
