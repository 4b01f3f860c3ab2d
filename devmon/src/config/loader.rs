//! Config loading: YAML file, then environment overrides, then validation.

use std::fs;
use std::path::{Path, PathBuf};

use super::error::ConfigError;
use crate::types::MonitorConfig;

/// Environment variables recognised as overrides.
pub const ENV_URLS: &str = "KANBAN_URLS";
pub const ENV_STATE_PATH: &str = "STATE_PATH";
pub const ENV_STUCK_MINUTES: &str = "STUCK_MINUTES";
pub const ENV_ONLY_ASSIGNEE: &str = "ONLY_ASSIGNEE";
pub const ENV_SMOKE_TEST_URL: &str = "SMOKE_TEST_URL";

/// Read a config file. Missing file is an error.
pub fn read_config(path: &Path) -> Result<MonitorConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(MonitorConfig::default());
    }
    Ok(serde_yaml::from_str(&content)?)
}

/// Read a config file if present (defaults otherwise) and apply env overrides.
pub fn read_config_with_env(path: &Path) -> Result<MonitorConfig, ConfigError> {
    let mut config = match read_config(path) {
        Ok(config) => config,
        Err(ConfigError::NotFound(_)) => MonitorConfig::default(),
        Err(e) => return Err(e),
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    Ok(config)
}

/// Split a comma-separated URL list, trimming blanks and trailing slashes.
pub fn parse_url_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Apply environment overrides. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut MonitorConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(raw) = get(ENV_URLS) {
        config.urls = parse_url_list(&raw);
    }
    if let Some(raw) = get(ENV_STATE_PATH) {
        config.state_path = PathBuf::from(raw.trim());
    }
    if let Some(raw) = get(ENV_STUCK_MINUTES) {
        config.stuck_minutes = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            name: ENV_STUCK_MINUTES.to_string(),
            value: raw.clone(),
        })?;
    }
    if let Some(raw) = get(ENV_ONLY_ASSIGNEE) {
        config.only_assignee = Some(raw.trim().to_string());
    }
    if let Some(raw) = get(ENV_SMOKE_TEST_URL) {
        config.smoke_test_url = raw.trim().to_string();
    }
    Ok(())
}

/// Validate a resolved config, collecting every problem.
pub fn validate_config(config: &MonitorConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.urls.is_empty() {
        errors.push("urls: at least one board URL is required".to_string());
    }
    for url in &config.urls {
        if !is_http_url(url) {
            errors.push(format!("urls: '{url}' must start with http:// or https://"));
        }
    }
    if !is_http_url(&config.smoke_test_url) {
        errors.push(format!(
            "smoke_test_url: '{}' must start with http:// or https://",
            config.smoke_test_url
        ));
    }
    if config.stuck_minutes == 0 {
        errors.push("stuck_minutes must be greater than 0".to_string());
    }
    if config.finish_dedup_hours == 0 {
        errors.push("finish_dedup_hours must be greater than 0".to_string());
    }
    if config.finish_marker_retention_hours < config.finish_dedup_hours {
        errors.push(format!(
            "finish_marker_retention_hours ({}) must be >= finish_dedup_hours ({})",
            config.finish_marker_retention_hours, config.finish_dedup_hours
        ));
    }
    if config.automation_author.trim().is_empty() {
        errors.push("automation_author must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors))
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
