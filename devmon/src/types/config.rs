use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::paths::default_state_path;

/// Top-level monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Candidate board base URLs, tried in order.
    #[serde(default = "default_urls")]
    pub urls: Vec<String>,
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    #[serde(default = "default_stuck_minutes")]
    pub stuck_minutes: u64,
    /// Only tasks assigned to this identity are monitored.
    #[serde(default)]
    pub only_assignee: Option<String>,
    #[serde(default = "default_smoke_test_url")]
    pub smoke_test_url: String,
    /// Author name used for discussion entries written by the automation.
    #[serde(default = "default_automation_author")]
    pub automation_author: String,
    #[serde(default = "default_finish_dedup_hours")]
    pub finish_dedup_hours: u64,
    #[serde(default = "default_finish_marker_retention_hours")]
    pub finish_marker_retention_hours: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_smoke_timeout_secs")]
    pub smoke_timeout_secs: u64,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// argv of the best-effort service restart. Empty disables restarts.
    #[serde(default = "default_restart_command")]
    pub restart_command: Vec<String>,
    /// argv of the notifier; the message is appended as the last argument.
    /// Empty sends messages to the log instead.
    #[serde(default = "default_notify_command")]
    pub notify_command: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            urls: default_urls(),
            state_path: default_state_path(),
            stuck_minutes: default_stuck_minutes(),
            only_assignee: None,
            smoke_test_url: default_smoke_test_url(),
            automation_author: default_automation_author(),
            finish_dedup_hours: default_finish_dedup_hours(),
            finish_marker_retention_hours: default_finish_marker_retention_hours(),
            request_timeout_secs: default_request_timeout_secs(),
            smoke_timeout_secs: default_smoke_timeout_secs(),
            command_timeout_secs: default_command_timeout_secs(),
            restart_command: default_restart_command(),
            notify_command: default_notify_command(),
        }
    }
}

impl MonitorConfig {
    pub fn finish_dedup_ms(&self) -> i64 {
        hours_to_ms(self.finish_dedup_hours)
    }

    pub fn finish_marker_retention_ms(&self) -> i64 {
        hours_to_ms(self.finish_marker_retention_hours)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn smoke_timeout(&self) -> Duration {
        Duration::from_secs(self.smoke_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

fn hours_to_ms(hours: u64) -> i64 {
    i64::try_from(hours.saturating_mul(3_600_000)).unwrap_or(i64::MAX)
}

fn default_urls() -> Vec<String> {
    vec!["http://localhost:3001".to_string()]
}

fn default_stuck_minutes() -> u64 {
    30
}

fn default_smoke_test_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_automation_author() -> String {
    "devmon".to_string()
}

fn default_finish_dedup_hours() -> u64 {
    6
}

fn default_finish_marker_retention_hours() -> u64 {
    7 * 24
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_smoke_timeout_secs() -> u64 {
    3
}

fn default_command_timeout_secs() -> u64 {
    30
}

fn default_restart_command() -> Vec<String> {
    ["systemctl", "--user", "restart", "project-kanban.service"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_notify_command() -> Vec<String> {
    ["openclaw", "sessions", "send", "--agent", "main", "--message"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.stuck_minutes, 30);
        assert_eq!(config.finish_dedup_hours, 6);
        assert_eq!(config.finish_dedup_ms(), 6 * 60 * 60 * 1000);
        assert_eq!(config.smoke_timeout(), Duration::from_secs(3));
        assert_eq!(config.restart_command[0], "systemctl");
        assert_eq!(config.notify_command.last().unwrap(), "--message");
        assert!(config.only_assignee.is_none());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "stuck_minutes: 45\nonly_assignee: alice\nnotify_command: []\n";
        let config: MonitorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.stuck_minutes, 45);
        assert_eq!(config.only_assignee.as_deref(), Some("alice"));
        assert!(config.notify_command.is_empty());
        assert_eq!(config.urls, vec!["http://localhost:3001"]);
        assert_eq!(config.smoke_timeout_secs, 3);
    }
}
