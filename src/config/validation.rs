//! Configuration validation.
//!
//! Serde handles the syntax; this checks that values make sense together.
//! All problems are collected so an operator can fix them in one pass.

use std::net::{IpAddr, SocketAddr};

use http::Uri;

use crate::config::schema::RelayConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidSocketAddress { field: &'static str, value: String },

    #[error("{field}: invalid IP address {value:?}")]
    InvalidIpAddress { field: &'static str, value: String },

    #[error("authority.address: invalid URI {0:?}")]
    InvalidAuthorityAddress(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("supervisor.backoff_cap_secs must not be below supervisor.backoff_step_secs")]
    BackoffCapBelowStep,

    #[error("http.bind_address and rpc.bind_address must differ")]
    SharedListener,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_socket_addr(&mut errors, "http.bind_address", &config.http.bind_address);
    check_socket_addr(&mut errors, "rpc.bind_address", &config.rpc.bind_address);
    if config.observability.metrics_enabled {
        check_socket_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.http.bind_address == config.rpc.bind_address
        && !config.http.bind_address.ends_with(":0")
    {
        errors.push(ValidationError::SharedListener);
    }

    for addr in &config.rpc.denied_addresses {
        if addr.parse::<IpAddr>().is_err() {
            errors.push(ValidationError::InvalidIpAddress {
                field: "rpc.denied_addresses",
                value: addr.clone(),
            });
        }
    }

    let uri = config.authority.uri();
    match uri.parse::<Uri>() {
        Ok(parsed) if parsed.host().is_some() => {}
        _ => errors.push(ValidationError::InvalidAuthorityAddress(
            config.authority.address.clone(),
        )),
    }

    let positive = [
        ("http.request_timeout_secs", config.http.request_timeout_secs),
        ("authority.connect_timeout_secs", config.authority.connect_timeout_secs),
        ("authority.request_timeout_secs", config.authority.request_timeout_secs),
        ("supervisor.poll_interval_secs", config.supervisor.poll_interval_secs),
        ("supervisor.backoff_step_secs", config.supervisor.backoff_step_secs),
        ("shutdown.grace_period_secs", config.shutdown.grace_period_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    if config.supervisor.backoff_cap_secs < config.supervisor.backoff_step_secs {
        errors.push(ValidationError::BackoffCapBelowStep);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidSocketAddress {
            field,
            value: value.to_string(),
        });
    }
}
