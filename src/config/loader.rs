//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => RelayConfig::default(),
    };

    let config = apply_env_overrides(config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply `GRPC_PORT` and `ENV` overrides using the given lookup.
pub fn apply_env_overrides<F>(mut config: RelayConfig, lookup: F) -> RelayConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("GRPC_PORT").filter(|p| !p.is_empty()) {
        let host = config
            .rpc
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.rpc.bind_address = format!("{}:{}", host, port);
    }

    if lookup("ENV").as_deref() == Some("development") {
        config.http.request_logging = true;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn grpc_port_replaces_only_the_port() {
        let config = apply_env_overrides(RelayConfig::default(), env(&[("GRPC_PORT", "4100")]));
        assert_eq!(config.rpc.bind_address, "0.0.0.0:4100");
    }

    #[test]
    fn empty_grpc_port_keeps_default() {
        let config = apply_env_overrides(RelayConfig::default(), env(&[("GRPC_PORT", "")]));
        assert_eq!(config.rpc.bind_address, "0.0.0.0:3552");
    }

    #[test]
    fn development_env_enables_request_logging() {
        let config = apply_env_overrides(RelayConfig::default(), env(&[("ENV", "development")]));
        assert!(config.http.request_logging);

        let config = apply_env_overrides(RelayConfig::default(), env(&[("ENV", "production")]));
        assert!(!config.http.request_logging);
    }

    #[test]
    fn invalid_port_fails_validation() {
        let config = apply_env_overrides(RelayConfig::default(), env(&[("GRPC_PORT", "abc")]));
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Some(Path::new("/nonexistent/relay.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
