pub mod config;
pub mod enums;
pub mod event;
pub mod state;
pub mod task;

// Re-export commonly used types for convenience
pub use config::MonitorConfig;
pub use enums::{EventKind, TaskStatus};
pub use event::{EventSummary, MonitorEvent};
pub use state::{MonitorState, Snapshot};
pub use task::{DiscussionEntry, Subtask, Task, TaskListPayload};
