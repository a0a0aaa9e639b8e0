//! Authority connection state machine.
//!
//! # States
//! - Idle: no transport, nothing in progress
//! - Connecting: a dial is in progress
//! - Ready: transport established
//! - TransientFailure: last dial failed
//! - Shutdown: connection closed for good
//!
//! # State Transitions
//! ```text
//! Idle/TransientFailure → Connecting: dial started
//! Connecting → Ready: dial succeeded
//! Connecting → TransientFailure: dial failed or timed out
//! Ready → Idle: established transport dropped
//! any → Shutdown: close() (terminal)
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::watch;

use crate::observability::metrics;

/// Lifecycle state of the authority channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Ready,
    TransientFailure,
    Shutdown,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
            ConnectionState::TransientFailure => "transient_failure",
            ConnectionState::Shutdown => "shutdown",
        }
    }

    /// Numeric value exported on the state gauge.
    pub fn as_gauge(self) -> f64 {
        match self {
            ConnectionState::Idle => 0.0,
            ConnectionState::Connecting => 1.0,
            ConnectionState::Ready => 2.0,
            ConnectionState::TransientFailure => 3.0,
            ConnectionState::Shutdown => 4.0,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state together with when it was entered.
#[derive(Debug, Clone, Copy)]
pub struct StateSnapshot {
    pub state: ConnectionState,
    pub since: Instant,
}

/// Shared, observable connection state.
///
/// Written by the connector and by `close()`, read by the supervisor and
/// request handlers. `Shutdown` is terminal.
#[derive(Debug, Clone)]
pub struct StateCell {
    tx: Arc<watch::Sender<StateSnapshot>>,
}

impl StateCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(StateSnapshot {
            state: ConnectionState::Idle,
            since: Instant::now(),
        });
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> ConnectionState {
        self.tx.borrow().state
    }

    pub fn snapshot(&self) -> StateSnapshot {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<StateSnapshot> {
        self.tx.subscribe()
    }

    /// Move to `next`. Returns false if nothing changed.
    pub fn transition(&self, next: ConnectionState) -> bool {
        self.tx.send_if_modified(|current| {
            if current.state == next || current.state == ConnectionState::Shutdown {
                return false;
            }
            tracing::debug!(from = %current.state, to = %next, "Authority connection state changed");
            *current = StateSnapshot {
                state: next,
                since: Instant::now(),
            };
            metrics::record_connection_state(next);
            true
        })
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        assert_eq!(StateCell::new().get(), ConnectionState::Idle);
    }

    #[test]
    fn repeated_state_is_not_a_transition() {
        let cell = StateCell::new();
        assert!(cell.transition(ConnectionState::Connecting));
        assert!(!cell.transition(ConnectionState::Connecting));
        assert!(cell.transition(ConnectionState::Ready));
        assert_eq!(cell.get(), ConnectionState::Ready);
    }

    #[test]
    fn shutdown_is_terminal() {
        let cell = StateCell::new();
        assert!(cell.transition(ConnectionState::Shutdown));
        assert!(!cell.transition(ConnectionState::Ready));
        assert!(!cell.transition(ConnectionState::Idle));
        assert_eq!(cell.get(), ConnectionState::Shutdown);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let cell = StateCell::new();
        let mut rx = cell.subscribe();

        cell.transition(ConnectionState::TransientFailure);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().state, ConnectionState::TransientFailure);
    }
}
