//! Dual-listener host.
//!
//! # Responsibilities
//! - Bind the HTTP and gRPC listeners before serving anything
//! - Run axum and tonic side by side on their own tasks
//! - Turn the first termination signal into exactly one shutdown sequence
//! - Bound the drain by the grace period
//!
//! # Design Decisions
//! - Fail fast: a bind failure or a server exiting on its own is fatal
//! - Repeated signals during the drain are counted, never re-enter shutdown
//! - On grace overrun the server tasks are aborted and the overrun is
//!   reported, the process still exits

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tokio_stream::{Stream, StreamExt};
use tonic::service::Routes;
use tonic::transport::Server;

use crate::config::RelayConfig;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::Termination;
use crate::net::{filtered_incoming, ConnectionFilter, Listener, ListenerError};
use crate::rpc::{CallLogLayer, RpcError, RpcServices};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("{server} server exited before shutdown was requested: {reason}")]
    ServerExited { server: &'static str, reason: String },
}

/// How the shutdown sequence went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// The signal that started shutdown; `None` if the signal source closed.
    pub signal: Option<Termination>,
    /// Signals received while already draining.
    pub duplicate_signals: usize,
    /// The grace period ran out and the servers were aborted.
    pub timed_out: bool,
}

pub struct Host {
    http: TcpListener,
    rpc: TcpListener,
    http_addr: SocketAddr,
    rpc_addr: SocketAddr,
    router: Router,
    routes: Routes,
    filter: Arc<dyn ConnectionFilter>,
    shutdown: Shutdown,
    grace_period: Duration,
}

impl Host {
    /// Bind both listeners and finish gRPC registration. Nothing is served
    /// until [`Host::run`].
    pub async fn bind(
        config: &RelayConfig,
        router: Router,
        services: RpcServices,
        filter: Arc<dyn ConnectionFilter>,
        shutdown: Shutdown,
    ) -> Result<Self, StartupError> {
        let routes = services.into_routes(config.rpc.reflection).await?;
        let http = Listener::bind(&config.http.bind_address, "http").await?;
        let rpc = Listener::bind(&config.rpc.bind_address, "grpc").await?;

        Ok(Self {
            http_addr: http.local_addr(),
            rpc_addr: rpc.local_addr(),
            http: http.into_inner(),
            rpc: rpc.into_inner(),
            router,
            routes,
            filter,
            shutdown,
            grace_period: config.shutdown.grace_period(),
        })
    }

    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    pub fn rpc_addr(&self) -> SocketAddr {
        self.rpc_addr
    }

    /// Serve until the first signal, then drain.
    pub async fn run<S>(self, mut signals: S) -> Result<ShutdownReport, HostError>
    where
        S: Stream<Item = Termination> + Unpin,
    {
        let Host {
            http,
            rpc,
            http_addr,
            rpc_addr,
            router,
            routes,
            filter,
            shutdown,
            grace_period,
        } = self;

        let mut http_task = tokio::spawn({
            let notified = shutdown.notified();
            async move { axum::serve(http, router).with_graceful_shutdown(notified).await }
        });

        let mut rpc_task = tokio::spawn({
            let incoming = filtered_incoming(rpc, filter);
            let notified = shutdown.notified();
            async move {
                Server::builder()
                    .layer(CallLogLayer)
                    .add_routes(routes)
                    .serve_with_incoming_shutdown(incoming, notified)
                    .await
            }
        });

        tracing::info!(http = %http_addr, grpc = %rpc_addr, "Servers started");

        let signal = tokio::select! {
            signal = signals.next() => signal,
            result = &mut http_task => {
                shutdown.trigger();
                rpc_task.abort();
                return Err(exited("http", result));
            }
            result = &mut rpc_task => {
                shutdown.trigger();
                http_task.abort();
                return Err(exited("grpc", result));
            }
        };

        let mut signals_open = signal.is_some();
        match signal {
            Some(signal) => tracing::info!(%signal, "Shutdown signal received"),
            None => tracing::warn!("Signal source closed, shutting down"),
        }

        shutdown.trigger();
        tracing::info!(grace_period = ?grace_period, "Draining servers");

        let mut duplicate_signals = 0;
        let timed_out = {
            let drain = async { tokio::join!(&mut http_task, &mut rpc_task) };
            let deadline = tokio::time::sleep(grace_period);
            tokio::pin!(drain, deadline);

            loop {
                tokio::select! {
                    biased;
                    extra = signals.next(), if signals_open => match extra {
                        Some(extra) => {
                            duplicate_signals += 1;
                            tracing::warn!(signal = %extra, "Shutdown already in progress, ignoring signal");
                        }
                        None => signals_open = false,
                    },
                    (http_result, rpc_result) = &mut drain => {
                        log_drain("http", http_result);
                        log_drain("grpc", rpc_result);
                        break false;
                    }
                    () = &mut deadline => break true,
                }
            }
        };

        if timed_out {
            http_task.abort();
            rpc_task.abort();
            tracing::warn!(grace_period = ?grace_period, "ShutdownTimeout: servers aborted after grace period");
        } else {
            tracing::info!("Graceful shutdown completed");
        }

        Ok(ShutdownReport {
            signal,
            duplicate_signals,
            timed_out,
        })
    }
}

fn exited<E: fmt::Display>(server: &'static str, result: Result<Result<(), E>, JoinError>) -> HostError {
    let reason = match result {
        Ok(Ok(())) => "stopped without error".to_string(),
        Ok(Err(e)) => e.to_string(),
        Err(e) => e.to_string(),
    };
    tracing::error!(server, reason = %reason, "Server exited unexpectedly");
    HostError::ServerExited { server, reason }
}

fn log_drain<E: fmt::Display>(server: &'static str, result: Result<Result<(), E>, JoinError>) {
    match result {
        Ok(Ok(())) => tracing::info!(server, "Server stopped"),
        Ok(Err(e)) => tracing::error!(server, error = %e, "Server stopped with error"),
        Err(e) => tracing::error!(server, error = %e, "Server task failed"),
    }
}
