//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Inbound HTTP listener.
    pub http: HttpConfig,

    /// gRPC listener.
    pub rpc: RpcConfig,

    /// Remote Authentication Authority.
    pub authority: AuthorityConfig,

    /// Connection supervisor timings.
    pub supervisor: SupervisorConfig,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Inbound HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address (e.g., "0.0.0.0:8081").
    pub bind_address: String,

    /// Total time allowed for a single HTTP request, in seconds.
    pub request_timeout_secs: u64,

    /// Log every request/response pair.
    pub request_logging: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8081".to_string(),
            request_timeout_secs: 30,
            request_logging: false,
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// gRPC listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Bind address (e.g., "0.0.0.0:3552").
    pub bind_address: String,

    /// Serve gRPC server reflection for tools like grpcurl.
    pub reflection: bool,

    /// Peer IPs refused at accept time.
    pub denied_addresses: Vec<String>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3552".to_string(),
            reflection: true,
            denied_addresses: Vec::new(),
        }
    }
}

/// Authentication Authority client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthorityConfig {
    /// Authority address. A bare `host:port` gets a scheme from `tls`.
    pub address: String,

    /// Dial timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Deadline for one delegated `IsAuthenticated` call, in seconds.
    pub request_timeout_secs: u64,

    /// Optional transport security.
    pub tls: Option<AuthorityTlsConfig>,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            address: "localhost:3551".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 5,
            tls: None,
        }
    }
}

impl AuthorityConfig {
    /// Address with an explicit scheme, as tonic expects.
    pub fn uri(&self) -> String {
        if self.address.contains("://") {
            return self.address.clone();
        }
        let scheme = if self.tls.is_some() { "https" } else { "http" };
        format!("{}://{}", scheme, self.address)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// TLS material for the authority channel.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorityTlsConfig {
    /// Path to the CA certificate (PEM) that signed the authority's cert.
    pub ca_cert_path: String,

    /// Expected server name on the authority's certificate.
    pub domain_name: String,
}

/// Retry/backoff timings for the connection supervisor.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Re-check interval while the connection is ready, in seconds.
    pub poll_interval_secs: u64,

    /// Backoff grows by this many seconds per consecutive failure.
    pub backoff_step_secs: u64,

    /// Upper bound on a single backoff, in seconds.
    pub backoff_cap_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            backoff_step_secs: 2,
            backoff_cap_secs: 30,
        }
    }
}

impl SupervisorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn backoff_step(&self) -> Duration {
        Duration::from_secs(self.backoff_step_secs)
    }

    pub fn backoff_cap(&self) -> Duration {
        Duration::from_secs(self.backoff_cap_secs)
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Time both servers get to drain before they are abandoned, in seconds.
    pub grace_period_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 10,
        }
    }
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
