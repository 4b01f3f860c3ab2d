//! In-memory collaborators for tests.
//!
//! `FakeBoard` enforces `ifVersion` like the real board: a stale version is
//! rejected with a conflict and leaves the task untouched.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::board::{BoardError, PatchRequest, TaskBoard};
use crate::hooks::{HealthProbe, Notifier, ProbeResult, ServiceRestarter};
use crate::types::{Task, TaskStatus};

/// In-progress-style task fixture: seq 12, updated 2024-01-01T10:00:00Z.
pub fn task(id: &str, version: u64, status: &str) -> Task {
    Task {
        id: id.to_string(),
        seq: Some(12),
        title: format!("Task {id}"),
        status: TaskStatus::from(status.to_string()),
        assignee: "devmon".to_string(),
        version: Some(version),
        updated_at: Some("2024-01-01T10:00:00Z".to_string()),
        subtasks: vec![],
        discussion: vec![],
    }
}

#[derive(Default)]
struct BoardInner {
    tasks: BTreeMap<String, Task>,
    failing: HashSet<String>,
    list_calls: Vec<String>,
    patches: Vec<(String, PatchRequest)>,
}

#[derive(Clone, Default)]
pub struct FakeBoard {
    inner: Arc<Mutex<BoardInner>>,
}

impl FakeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, task: Task) {
        self.inner
            .lock()
            .unwrap()
            .tasks
            .insert(task.id.clone(), task);
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.inner.lock().unwrap().tasks.get(id).cloned()
    }

    /// Edit a task the way a human would: the version moves.
    pub fn edit(&self, id: &str, f: impl FnOnce(&mut Task)) {
        let mut inner = self.inner.lock().unwrap();
        let task = inner.tasks.get_mut(id).expect("unknown task");
        f(task);
        task.version = task.version.map(|v| v + 1);
    }

    pub fn bump_version(&self, id: &str) {
        self.edit(id, |_| {});
    }

    pub fn fail_base(&self, base: &str) {
        self.inner.lock().unwrap().failing.insert(base.to_string());
    }

    pub fn heal_base(&self, base: &str) {
        self.inner.lock().unwrap().failing.remove(base);
    }

    pub fn list_calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().list_calls.clone()
    }

    pub fn patch_calls(&self) -> usize {
        self.inner.lock().unwrap().patches.len()
    }

    pub fn last_patch(&self) -> Option<PatchRequest> {
        self.inner
            .lock()
            .unwrap()
            .patches
            .last()
            .map(|(_, request)| request.clone())
    }
}

#[async_trait]
impl TaskBoard for FakeBoard {
    async fn list_tasks(&self, base: &str) -> Result<Vec<Task>, BoardError> {
        let mut inner = self.inner.lock().unwrap();
        inner.list_calls.push(base.to_string());
        if inner.failing.contains(base) {
            return Err(BoardError::Http {
                status: 503,
                message: format!("{base} unavailable"),
            });
        }
        Ok(inner.tasks.values().cloned().collect())
    }

    async fn patch_task(
        &self,
        base: &str,
        task_id: &str,
        request: &PatchRequest,
    ) -> Result<(), BoardError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .patches
            .push((task_id.to_string(), request.clone()));
        if inner.failing.contains(base) {
            return Err(BoardError::Http {
                status: 503,
                message: format!("{base} unavailable"),
            });
        }

        let task = inner
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| BoardError::NotFound(task_id.to_string()))?;
        if task.version != Some(request.if_version) {
            return Err(BoardError::Conflict {
                status: 409,
                message: format!(
                    "expected version {}, found {:?}",
                    request.if_version, task.version
                ),
            });
        }

        let patch = &request.patch;
        if let Some(status) = &patch.status {
            task.status = status.clone();
        }
        if let Some(subtasks) = &patch.subtasks {
            task.subtasks = subtasks.clone();
        }
        if let Some(entry) = &patch.discussion_append {
            task.discussion.push(entry.clone());
            if entry.at.is_some() {
                task.updated_at = entry.at.clone();
            }
        }
        task.version = Some(request.if_version + 1);
        Ok(())
    }
}

pub struct FakeRestarter {
    result: std::result::Result<(), String>,
    heal: Option<(FakeBoard, String)>,
    calls: AtomicUsize,
}

impl FakeRestarter {
    pub fn ok() -> Self {
        Self {
            result: Ok(()),
            heal: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            heal: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Restarting brings `base` back up.
    pub fn healing(mut self, board: &FakeBoard, base: &str) -> Self {
        self.heal = Some((board.clone(), base.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceRestarter for FakeRestarter {
    async fn restart(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((board, base)) = &self.heal {
            board.heal_base(base);
        }
        match &self.result {
            Ok(()) => Ok(()),
            Err(message) => bail!("{message}"),
        }
    }
}

pub struct FakeProbe {
    ok: bool,
    calls: AtomicUsize,
}

impl FakeProbe {
    pub fn healthy() -> Self {
        Self {
            ok: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn down() -> Self {
        Self {
            ok: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for FakeProbe {
    async fn probe(&self) -> ProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.ok {
            ProbeResult {
                ok: true,
                status: Some(200),
                error: None,
            }
        } else {
            ProbeResult {
                ok: false,
                status: None,
                error: Some("connection refused".to_string()),
            }
        }
    }
}

/// Records every message; optionally fails on messages containing a needle.
#[derive(Default)]
pub struct FakeNotifier {
    messages: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(needle: &str) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail_on: Some(needle.to_string()),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        self.messages.lock().unwrap().push(message.to_string());
        match &self.fail_on {
            Some(needle) if message.contains(needle.as_str()) => bail!("notifier down"),
            _ => Ok(()),
        }
    }
}
