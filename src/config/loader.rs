//! Configuration loading from disk.

use std::path::Path;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: ServerConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_minimal_file() {
        let mut file = tempfile();
        write!(file.1, "[listener]\nbind_address = \"127.0.0.1:8088\"\n").unwrap();
        let config = load_config(&file.0).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:8088");
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let mut file = tempfile();
        write!(file.1, "listener = [broken").unwrap();
        assert!(matches!(
            load_config(&file.0),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_semantic_errors_are_reported() {
        let mut file = tempfile();
        write!(file.1, "[timeouts]\nrequest_secs = 0\n").unwrap();
        assert!(matches!(
            load_config(&file.0),
            Err(ConfigError::Validation(errors)) if errors.len() == 1
        ));
    }

    fn tempfile() -> (std::path::PathBuf, std::fs::File) {
        let path = std::env::temp_dir().join(format!(
            "refresh-proxy-test-{}.toml",
            uuid::Uuid::new_v4()
        ));
        let file = std::fs::File::create(&path).unwrap();
        (path, file)
    }
}
