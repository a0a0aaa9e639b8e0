//! Structured logging.
//!
//! `RUST_LOG` wins over the configured level. JSON output for machine
//! parsing, pretty output for local runs.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::{LogFormat, ObservabilityConfig};

/// Install the global subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives(&config.log_level).into());

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Pretty => fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
}

fn default_directives(level: &str) -> String {
    format!("auth_relay={level},tower_http={level},warn")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_scope_level_to_relay() {
        assert_eq!(
            default_directives("debug"),
            "auth_relay=debug,tower_http=debug,warn"
        );
        assert!(EnvFilter::try_new(default_directives("info")).is_ok());
    }
}
