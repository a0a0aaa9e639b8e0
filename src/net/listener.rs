//! TCP listener binding.
//!
//! # Responsibilities
//! - Parse and bind the configured address
//! - Report the actual local address (port 0 resolves here)
//! - Turn bind failures into a startup error naming the listener

use std::net::SocketAddr;

use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("{role} listener address `{address}` is not a socket address")]
    InvalidAddress {
        role: &'static str,
        address: String,
    },

    #[error("failed to bind {role} listener on {address}: {source}")]
    Bind {
        role: &'static str,
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// A bound listener and the address it actually holds.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind `address`. `role` only labels logs and errors.
    pub async fn bind(address: &str, role: &'static str) -> Result<Self, ListenerError> {
        let addr: SocketAddr = address.parse().map_err(|_| ListenerError::InvalidAddress {
            role,
            address: address.to_string(),
        })?;

        let bind_error = |source| ListenerError::Bind {
            role,
            address: address.to_string(),
            source,
        };

        let inner = TcpListener::bind(addr).await.map_err(bind_error)?;
        let local_addr = inner.local_addr().map_err(bind_error)?;

        tracing::info!(role, address = %local_addr, "Listener bound");

        Ok(Self { inner, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn into_inner(self) -> TcpListener {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn port_zero_resolves() {
        let listener = Listener::bind("127.0.0.1:0", "test").await.unwrap();
        assert_ne!(listener.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn occupied_port_is_a_bind_error() {
        let first = Listener::bind("127.0.0.1:0", "first").await.unwrap();
        let taken = first.local_addr().to_string();

        let err = Listener::bind(&taken, "second").await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind { role: "second", .. }));
    }

    #[tokio::test]
    async fn garbage_address_is_rejected() {
        let err = Listener::bind("localhost", "http").await.unwrap_err();
        assert!(matches!(err, ListenerError::InvalidAddress { .. }));
    }
}
