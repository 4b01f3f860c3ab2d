//! Kanban board REST client
//!
//! Two endpoints are used:
//! - `GET  {base}/api/tasks?include_archived=1` lists every task
//! - `PATCH {base}/api/tasks/{id}` applies a partial update guarded by
//!   `ifVersion`; the board answers 409 (or 412) when the version is stale.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{DiscussionEntry, Subtask, Task, TaskListPayload, TaskStatus};

/// Partial task update. Absent fields are left untouched by the board.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// Full replacement of the subtask list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<Subtask>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discussion_append: Option<DiscussionEntry>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.subtasks.is_none() && self.discussion_append.is_none()
    }
}

/// Body of a conditional update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchRequest {
    pub if_version: u64,
    pub patch: TaskPatch,
}

/// Errors from the board API.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("version conflict (HTTP {status}): {message}")]
    Conflict { status: u16, message: String },
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("invalid board URL: {0}")]
    InvalidUrl(String),
    #[error("failed to decode board response: {0}")]
    Decode(String),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

/// Read and conditional-write access to the task board.
#[async_trait]
pub trait TaskBoard: Send + Sync {
    /// List all tasks, archived included, from one base URL.
    async fn list_tasks(&self, base: &str) -> Result<Vec<Task>, BoardError>;

    /// Apply `request` to a task if its version still equals `request.if_version`.
    async fn patch_task(
        &self,
        base: &str,
        task_id: &str,
        request: &PatchRequest,
    ) -> Result<(), BoardError>;
}

/// HTTP implementation of [`TaskBoard`].
#[derive(Debug, Clone)]
pub struct KanbanClient {
    client: reqwest::Client,
}

impl KanbanClient {
    pub fn new(timeout: Duration) -> Result<Self, BoardError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("devmon/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TaskBoard for KanbanClient {
    async fn list_tasks(&self, base: &str) -> Result<Vec<Task>, BoardError> {
        let url = tasks_url(base)?;
        debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(error_from_response(status, "/api/tasks", &body));
        }
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let payload: TaskListPayload =
            serde_json::from_str(&body).map_err(|e| BoardError::Decode(e.to_string()))?;
        Ok(payload.into_tasks())
    }

    async fn patch_task(
        &self,
        base: &str,
        task_id: &str,
        request: &PatchRequest,
    ) -> Result<(), BoardError> {
        let url = task_url(base, task_id)?;
        debug!("PATCH {} ifVersion={}", url, request.if_version);
        let resp = self
            .client
            .patch(url)
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(error_from_response(status, task_id, &body))
    }
}

/// `{base}/api/tasks?include_archived=1`
pub fn tasks_url(base: &str) -> Result<Url, BoardError> {
    let mut url = api_url(base, &[])?;
    url.query_pairs_mut().append_pair("include_archived", "1");
    Ok(url)
}

/// `{base}/api/tasks/{id}` with the id percent-encoded as one path segment.
pub fn task_url(base: &str, task_id: &str) -> Result<Url, BoardError> {
    api_url(base, &[task_id])
}

fn api_url(base: &str, extra: &[&str]) -> Result<Url, BoardError> {
    let mut url = Url::parse(base.trim_end_matches('/'))
        .map_err(|e| BoardError::InvalidUrl(format!("{base}: {e}")))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| BoardError::InvalidUrl(base.to_string()))?;
        segments.pop_if_empty().extend(["api", "tasks"]).extend(extra);
    }
    Ok(url)
}

/// Map a non-success response to a [`BoardError`].
fn error_from_response(status: StatusCode, target: &str, body: &str) -> BoardError {
    let message = describe_error_body(status, body);
    warn!("Board API error: HTTP {} on {}: {}", status.as_u16(), target, message);
    match status {
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => BoardError::Conflict {
            status: status.as_u16(),
            message,
        },
        StatusCode::NOT_FOUND => BoardError::NotFound(target.to_string()),
        _ => BoardError::Http {
            status: status.as_u16(),
            message,
        },
    }
}

/// Prefer the board's `{error, detail}` JSON, then raw text, then the reason phrase.
fn describe_error_body(status: StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(error) = json.get("error").and_then(|v| v.as_str()) {
            return match json.get("detail").and_then(|v| v.as_str()) {
                Some(detail) => format!("{error}: {detail}"),
                None => error.to_string(),
            };
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_string()
}
