//! State-tracking TCP connector for the authority channel.
//!
//! tonic does not expose channel connectivity, so the channel dials through
//! this connector and every dial outcome is written to the shared
//! [`StateCell`]. The returned stream moves the state back to `Idle` when
//! the transport holding it is dropped.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use http::Uri;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tower::Service;

use crate::authority::state::{ConnectionState, StateCell};

/// Connector handed to `Endpoint::connect_with_connector_lazy`.
#[derive(Debug, Clone)]
pub struct TrackingConnector {
    state: StateCell,
    connect_timeout: Duration,
    /// Bumped on every successful dial; only the newest stream may report a drop.
    generation: Arc<AtomicU64>,
}

impl TrackingConnector {
    pub fn new(state: StateCell, connect_timeout: Duration) -> Self {
        Self {
            state,
            connect_timeout,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl Service<Uri> for TrackingConnector {
    type Response = TokioIo<TrackedStream>;
    type Error = io::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let state = self.state.clone();
        let generation = Arc::clone(&self.generation);
        let connect_timeout = self.connect_timeout;

        Box::pin(async move {
            let (host, port) = host_and_port(&uri)?;
            state.transition(ConnectionState::Connecting);

            let dial = tokio::time::timeout(connect_timeout, TcpStream::connect((host.as_str(), port)));
            let stream = match dial.await {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => {
                    tracing::debug!(host = %host, port, error = %e, "Authority dial failed");
                    state.transition(ConnectionState::TransientFailure);
                    return Err(e);
                }
                Err(_) => {
                    tracing::debug!(host = %host, port, ?connect_timeout, "Authority dial timed out");
                    state.transition(ConnectionState::TransientFailure);
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "authority dial timed out"));
                }
            };
            let _ = stream.set_nodelay(true);

            let id = generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.transition(ConnectionState::Ready);

            Ok(TokioIo::new(TrackedStream {
                inner: stream,
                state,
                generation,
                id,
            }))
        })
    }
}

fn host_and_port(uri: &Uri) -> io::Result<(String, u16)> {
    let host = uri
        .host()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "authority URI has no host"))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = uri.port_u16().unwrap_or(match uri.scheme_str() {
        Some("https") => 443,
        _ => 80,
    });
    Ok((host, port))
}

/// TCP stream that reports its own teardown.
#[derive(Debug)]
pub struct TrackedStream {
    inner: TcpStream,
    state: StateCell,
    generation: Arc<AtomicU64>,
    id: u64,
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        if self.generation.load(Ordering::SeqCst) == self.id {
            self.state.transition(ConnectionState::Idle);
        }
    }
}

impl AsyncRead for TrackedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TrackedStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
