//! Admission control for accepted gRPC connections.
//!
//! Every accepted TCP stream is offered to a [`ConnectionFilter`] before the
//! gRPC server sees it. Rejected streams are dropped, which closes them.

use std::collections::HashSet;
use std::io;
use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tokio_stream::Stream;

use crate::config::RpcConfig;

/// Decides whether a peer may open a connection.
pub trait ConnectionFilter: Send + Sync + 'static {
    fn allow(&self, peer: SocketAddr) -> bool;
}

/// Admit everyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ConnectionFilter for AllowAll {
    fn allow(&self, _peer: SocketAddr) -> bool {
        true
    }
}

/// Refuse a fixed set of peer IPs.
#[derive(Debug, Clone, Default)]
pub struct DenyList {
    denied: HashSet<IpAddr>,
}

impl DenyList {
    pub fn new(denied: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            denied: denied.into_iter().collect(),
        }
    }

    pub fn from_config(config: &RpcConfig) -> Result<Self, AddrParseError> {
        let denied = config
            .denied_addresses
            .iter()
            .map(|ip| ip.parse())
            .collect::<Result<HashSet<IpAddr>, _>>()?;
        Ok(Self { denied })
    }
}

impl ConnectionFilter for DenyList {
    fn allow(&self, peer: SocketAddr) -> bool {
        !self.denied.contains(&peer.ip())
    }
}

/// Pick the filter for the gRPC listener.
pub fn from_config(config: &RpcConfig) -> Result<Arc<dyn ConnectionFilter>, AddrParseError> {
    if config.denied_addresses.is_empty() {
        Ok(Arc::new(AllowAll))
    } else {
        Ok(Arc::new(DenyList::from_config(config)?))
    }
}

/// Pause after an accept error that is not about a single connection,
/// such as running out of file descriptors.
const ACCEPT_ERROR_PAUSE: Duration = Duration::from_secs(1);

/// Source of accepted connections.
#[async_trait]
trait Acceptor: Send + 'static {
    type Conn: Send + 'static;

    async fn accept(&mut self) -> io::Result<(Self::Conn, SocketAddr)>;
}

#[async_trait]
impl Acceptor for TcpListener {
    type Conn = TcpStream;

    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

/// Accept loop as a stream, with the filter applied.
///
/// Accept errors never end the stream. Errors about one connection are
/// skipped, anything else pauses the loop for [`ACCEPT_ERROR_PAUSE`].
pub fn filtered_incoming(
    listener: TcpListener,
    filter: Arc<dyn ConnectionFilter>,
) -> impl Stream<Item = io::Result<TcpStream>> + Send + 'static {
    Box::pin(admitted(listener, filter))
}

fn admitted<A: Acceptor>(
    acceptor: A,
    filter: Arc<dyn ConnectionFilter>,
) -> impl Stream<Item = io::Result<A::Conn>> + Send + 'static {
    futures_util::stream::unfold((acceptor, filter), |(mut acceptor, filter)| async move {
        loop {
            match acceptor.accept().await {
                Ok((conn, peer)) if filter.allow(peer) => {
                    return Some((Ok(conn), (acceptor, filter)));
                }
                Ok((_, peer)) => {
                    tracing::info!(peer_addr = %peer, "Connection refused by filter");
                }
                Err(e) if is_connection_error(&e) => {
                    tracing::debug!(error = %e, "Connection failed during accept");
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        pause = ?ACCEPT_ERROR_PAUSE,
                        "Failed to accept gRPC connection"
                    );
                    tokio::time::sleep(ACCEPT_ERROR_PAUSE).await;
                }
            }
        }
    })
}

fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}
