//! The single client connection to the Authentication Authority.
//!
//! # Responsibilities
//! - Build one lazy tonic channel per process (no dial at construction)
//! - Own the state cell the connector reports into
//! - Spawn exactly one supervisor task
//! - Serve read access to request handlers; close once at shutdown

use std::fs;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;

use crate::authority::connector::TrackingConnector;
use crate::authority::state::{ConnectionState, StateCell, StateSnapshot};
use crate::authority::supervisor::{Supervised, Supervisor};
use crate::config::{AuthorityConfig, SupervisorConfig};
use crate::observability::metrics;

/// Configuration problems that prevent building the channel at all.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("invalid authority address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("failed to read CA certificate {path:?}: {source}")]
    CaCertificate {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid authority TLS configuration: {0}")]
    Tls(#[source] tonic::transport::Error),
}

/// Point-in-time view of the connection, for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSnapshot {
    pub target: String,
    pub state: ConnectionState,
    pub available: bool,
    pub retries: u32,
    pub since_transition_secs: u64,
}

/// Shared handle to the authority channel.
///
/// Construct once with [`AuthorityConnection::connect`] and pass the `Arc`
/// to whatever needs to talk to the authority.
pub struct AuthorityConnection {
    target: String,
    channel: ArcSwapOption<Channel>,
    state: StateCell,
    retries: AtomicU32,
    probing: Arc<AtomicBool>,
    request_timeout: Duration,
    probe_timeout: Duration,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl AuthorityConnection {
    /// Build the channel and start its supervisor.
    ///
    /// Never dials: an unreachable authority is not an error here. Only a
    /// malformed address or unusable TLS material is. Must be called from
    /// within a Tokio runtime.
    pub fn connect<F>(
        config: &AuthorityConfig,
        supervisor: &SupervisorConfig,
        shutdown: F,
    ) -> Result<Arc<Self>, ConnectError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let connection = Arc::new(Self::build(config)?);

        let task = Supervisor::new(Arc::clone(&connection), supervisor.clone());
        let handle = tokio::spawn(task.run(shutdown));
        if let Ok(mut slot) = connection.supervisor.lock() {
            *slot = Some(handle);
        }

        tracing::info!(
            target_address = %connection.target,
            tls = config.tls.is_some(),
            "Authority client created"
        );
        Ok(connection)
    }

    fn build(config: &AuthorityConfig) -> Result<Self, ConnectError> {
        let target = config.uri();
        let mut endpoint = Endpoint::from_shared(target.clone())
            .map_err(|source| ConnectError::InvalidAddress {
                address: config.address.clone(),
                source,
            })?
            .timeout(config.request_timeout())
            .tcp_nodelay(true);

        if let Some(tls) = &config.tls {
            let pem = fs::read(&tls.ca_cert_path).map_err(|source| ConnectError::CaCertificate {
                path: tls.ca_cert_path.clone(),
                source,
            })?;
            let tls_config = ClientTlsConfig::new()
                .ca_certificate(Certificate::from_pem(pem))
                .domain_name(tls.domain_name.clone());
            endpoint = endpoint.tls_config(tls_config).map_err(ConnectError::Tls)?;
        }

        let state = StateCell::new();
        let connector = TrackingConnector::new(state.clone(), config.connect_timeout());
        let channel = endpoint.connect_with_connector_lazy(connector);

        Ok(Self {
            target,
            channel: ArcSwapOption::from_pointee(channel),
            state,
            retries: AtomicU32::new(0),
            probing: Arc::new(AtomicBool::new(false)),
            request_timeout: config.request_timeout(),
            probe_timeout: config.connect_timeout() + config.request_timeout(),
            supervisor: Mutex::new(None),
        })
    }

    /// True while a channel exists. Says nothing about readiness.
    pub fn is_available(&self) -> bool {
        self.channel.load().is_some()
    }

    /// Release the channel. Idempotent.
    pub fn close(&self) {
        if self.channel.swap(None).is_some() {
            tracing::info!(target_address = %self.target, "Authority connection closed");
        }
        self.state.transition(ConnectionState::Shutdown);
    }

    /// Wait for the supervisor task to finish, if it was started.
    pub async fn join_supervisor(&self) {
        let handle = self.supervisor.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Authority supervisor task failed");
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<StateSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        let StateSnapshot { state, since } = self.state.snapshot();
        ConnectionSnapshot {
            target: self.target.clone(),
            state,
            available: self.is_available(),
            retries: self.retries.load(Ordering::Relaxed),
            since_transition_secs: since.elapsed().as_secs(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub(crate) fn channel(&self) -> Option<Channel> {
        self.channel.load_full().map(|channel| (*channel).clone())
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl Supervised for AuthorityConnection {
    fn target(&self) -> &str {
        &self.target
    }

    fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Issue a health probe on the shared channel; the dial it causes is
    /// what moves the state. At most one probe runs at a time.
    fn trigger_reconnect(&self) {
        let Some(channel) = self.channel() else {
            return;
        };
        if self.probing.swap(true, Ordering::AcqRel) {
            return;
        }
        metrics::record_reconnect_attempt();

        let probing = Arc::clone(&self.probing);
        let timeout = self.probe_timeout;
        tokio::spawn(async move {
            let mut client = HealthClient::new(channel);
            let mut request = tonic::Request::new(HealthCheckRequest {
                service: String::new(),
            });
            request.set_timeout(timeout);

            match tokio::time::timeout(timeout, client.check(request)).await {
                Ok(Ok(_)) => tracing::debug!("Authority probe answered"),
                Ok(Err(status)) => {
                    tracing::debug!(code = ?status.code(), "Authority probe returned status")
                }
                Err(_) => tracing::debug!(?timeout, "Authority probe timed out"),
            }
            probing.store(false, Ordering::Release);
        });
    }

    fn record_retries(&self, retries: u32) {
        self.retries.store(retries, Ordering::Relaxed);
    }
}
