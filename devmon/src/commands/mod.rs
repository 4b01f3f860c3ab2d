pub mod check;
pub mod config;
pub mod report;
pub mod status;
pub mod update;

use std::path::PathBuf;

use clap::Args;

use crate::config::loader::parse_url_list;
use crate::config::{
    apply_env_overrides, read_config, read_config_with_env, resolve_config_path, validate_config,
    ConfigLocation, ConfigSource,
};
use crate::types::MonitorConfig;

/// Global flags. They override the config file and env.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Config file (default: devmon.config.yaml walking up, then ~/.config/devmon/config.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Comma-separated board base URLs, tried in order
    #[arg(long, global = true, value_name = "URLS")]
    pub urls: Option<String>,

    /// Monitor state file
    #[arg(long, global = true, value_name = "PATH")]
    pub state_path: Option<PathBuf>,

    /// Minutes without an updatedAt change before a task counts as stuck
    #[arg(long, global = true, value_name = "N")]
    pub stuck_minutes: Option<u64>,

    /// Only monitor tasks assigned to this identity
    #[arg(long, global = true, value_name = "NAME")]
    pub only_assignee: Option<String>,

    /// URL probed before handling a finished task
    #[arg(long, global = true, value_name = "URL")]
    pub smoke_test_url: Option<String>,
}

impl ConfigArgs {
    fn apply(&self, config: &mut MonitorConfig) {
        if let Some(urls) = &self.urls {
            config.urls = parse_url_list(urls);
        }
        if let Some(path) = &self.state_path {
            config.state_path = path.clone();
        }
        if let Some(minutes) = self.stuck_minutes {
            config.stuck_minutes = minutes;
        }
        if let Some(assignee) = &self.only_assignee {
            config.only_assignee = Some(assignee.clone()).filter(|a| !a.trim().is_empty());
        }
        if let Some(url) = &self.smoke_test_url {
            config.smoke_test_url = url.trim().to_string();
        }
    }
}

/// Resolve the effective config: defaults, file, env, then CLI flags.
///
/// An explicit `--config` path must exist; the implicit ones are optional.
pub fn load_config(args: &ConfigArgs) -> anyhow::Result<(MonitorConfig, ConfigLocation)> {
    let location = resolve_config_path(args.config.as_deref());
    let mut config = match location.source {
        ConfigSource::Explicit => {
            let mut config = read_config(&location.path)?;
            apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
            config
        }
        ConfigSource::Local | ConfigSource::Global => read_config_with_env(&location.path)?,
    };
    args.apply(&mut config);
    validate_config(&config)?;
    Ok((config, location))
}
