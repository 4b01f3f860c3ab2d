/// Failures while locating, reading or checking the monitor configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),
    #[error("Config parse error: {0}")]
    ParseError(String),
    #[error("Config IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Config validation failed:\n{}", bullet_list(.0))]
    ValidationError(Vec<String>),
    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: String, value: String },
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("  - {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_validation_error_lists_every_problem() {
        let err = ConfigError::ValidationError(vec![
            "urls must not be empty".to_string(),
            "stuck_minutes must be at least 1".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Config validation failed:\n  - urls must not be empty\n  - stuck_minutes must be at least 1"
        );
    }

    #[test]
    fn test_invalid_env_names_variable_and_value() {
        let err = ConfigError::InvalidEnv {
            name: "STUCK_MINUTES".to_string(),
            value: "soon".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid value for STUCK_MINUTES: 'soon'");
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err: ConfigError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, ConfigError::IoError(_)));
        assert!(err.source().is_some());
    }
}
