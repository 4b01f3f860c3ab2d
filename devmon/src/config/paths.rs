use std::env;
use std::path::{Path, PathBuf};

pub const LOCAL_CONFIG_FILE: &str = "devmon.config.yaml";

/// Where the active config file was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Passed with `--config`
    Explicit,
    /// `devmon.config.yaml` found walking up from the working directory
    Local,
    /// `~/.config/devmon/config.yaml`
    Global,
}

/// Resolved config location
#[derive(Debug, Clone)]
pub struct ConfigLocation {
    pub source: ConfigSource,
    pub path: PathBuf,
}

/// Get the global config directory (~/.config/devmon or $XDG_CONFIG_HOME/devmon)
pub fn get_global_config_dir() -> PathBuf {
    let base = if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config")
    } else {
        PathBuf::from(".config")
    };
    base.join("devmon")
}

/// Default location of the persisted monitor state.
pub fn default_state_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("devmon")
        .join("monitor-state.json")
}

/// Walk up from start_dir looking for devmon.config.yaml
pub fn find_local_config(start_dir: Option<&Path>) -> Option<PathBuf> {
    let start = match start_dir {
        Some(dir) => dir.to_path_buf(),
        None => env::current_dir().ok()?,
    };

    let mut dir = start.as_path();

    loop {
        let config_path = dir.join(LOCAL_CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        match dir.parent() {
            Some(parent) if parent != dir => dir = parent,
            _ => break,
        }
    }

    None
}

/// Resolve the config file to use.
/// Priority: explicit path > local config (walk up tree) > global config
pub fn resolve_config_path(explicit: Option<&Path>) -> ConfigLocation {
    if let Some(path) = explicit {
        return ConfigLocation {
            source: ConfigSource::Explicit,
            path: path.to_path_buf(),
        };
    }

    if let Some(local) = find_local_config(None) {
        return ConfigLocation {
            source: ConfigSource::Local,
            path: local,
        };
    }

    ConfigLocation {
        source: ConfigSource::Global,
        path: get_global_config_dir().join("config.yaml"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_local_config_walks_up() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(tmp.path().join(LOCAL_CONFIG_FILE), "stuck_minutes: 10\n").unwrap();

        let found = find_local_config(Some(&nested)).unwrap();
        assert_eq!(found, tmp.path().join(LOCAL_CONFIG_FILE));
    }

    #[test]
    fn test_find_local_config_missing() {
        let tmp = TempDir::new().unwrap();
        // The temp dir lives outside any project, so nothing is found above it
        // unless the machine has a stray config in / or /tmp.
        let result = find_local_config(Some(tmp.path()));
        if let Some(path) = result {
            assert!(!path.starts_with(tmp.path()));
        }
    }

    #[test]
    fn test_explicit_path_wins() {
        let location = resolve_config_path(Some(Path::new("/etc/devmon.yaml")));
        assert_eq!(location.source, ConfigSource::Explicit);
        assert_eq!(location.path, PathBuf::from("/etc/devmon.yaml"));
    }

    #[test]
    fn test_default_state_path_file_name() {
        let path = default_state_path();
        assert!(path.ends_with("devmon/monitor-state.json"));
    }
}
