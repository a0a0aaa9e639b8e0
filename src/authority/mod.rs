//! Authentication Authority client subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     connection.rs (lazy channel, no dial) → spawn supervisor.rs
//!
//! Background:
//!     supervisor.rs reads state.rs
//!     → not ready: backoff + reconnect trigger (health probe on the channel)
//!     → connector.rs dials, reports Connecting/Ready/TransientFailure/Idle
//!
//! Per request:
//!     client.rs IsAuthenticated(request_id) + `authorization` metadata
//!     → claims.rs IdentityClaims
//! ```
//!
//! # Design Decisions
//! - One channel per process, shared read-only by request handlers
//! - Unreachable authority at startup is not fatal; requests are denied
//!   until the supervisor's reconnects succeed
//! - The supervisor only reads state; the transport reports it

pub mod claims;
pub mod client;
pub mod connection;
pub mod connector;
pub mod proto;
pub mod state;
pub mod supervisor;

pub use claims::IdentityClaims;
pub use client::{Authenticator, DelegationError, AUTHORIZATION_METADATA};
pub use connection::{AuthorityConnection, ConnectError, ConnectionSnapshot};
pub use state::ConnectionState;
