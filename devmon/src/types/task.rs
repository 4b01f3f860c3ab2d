//! Wire types for the Kanban board API.
//!
//! Every field is optional on the wire; missing values fall back to empty
//! strings, empty lists or `None`. Numbers and strings are accepted
//! interchangeably for ids, counters and timestamps.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use super::enums::TaskStatus;

/// A task as returned by `GET /api/tasks`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub seq: Option<u64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub assignee: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub version: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtasks: Vec<Subtask>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub discussion: Vec<DiscussionEntry>,
}

impl Task {
    /// Trimmed, non-empty titles of subtasks not yet done, in board order.
    pub fn open_subtask_titles(&self) -> Vec<String> {
        self.subtasks
            .iter()
            .filter(|s| !s.done)
            .map(|s| s.title.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// A subtask checklist item.
///
/// Fields this client does not know about are kept in `extra` so replacing
/// the subtask list never drops data the board stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "truthy")]
    pub done: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub completed_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One entry of a task's discussion log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscussionEntry {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub author: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub at: Option<String>,
}

/// Response shape of the task listing endpoint.
///
/// Records are kept as raw JSON until [`TaskListPayload::into_tasks`] so a
/// single malformed task cannot fail the whole listing.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TaskListPayload {
    List(Vec<serde_json::Value>),
    Wrapped { tasks: Vec<serde_json::Value> },
}

impl TaskListPayload {
    /// Decode every record, skipping the ones that are not task objects.
    pub fn into_tasks(self) -> Vec<Task> {
        let records = match self {
            TaskListPayload::List(records) => records,
            TaskListPayload::Wrapped { tasks } => tasks,
        };
        records
            .into_iter()
            .enumerate()
            .filter_map(|(idx, record)| {
                let id = record.get("id").map(|v| v.to_string());
                match serde_json::from_value::<Task>(record) {
                    Ok(task) => Some(task),
                    Err(e) => {
                        warn!(
                            "Skipping undecodable task at index {} (id={}): {}",
                            idx,
                            id.as_deref().unwrap_or("?"),
                            e
                        );
                        None
                    }
                }
            })
            .collect()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// JavaScript truthiness: `null`, `0`, `""` and `false` are not done.
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Bool(b)) => b,
        Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    })
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
