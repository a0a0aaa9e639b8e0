//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP:  listener.rs (bind) → axum::serve
//! gRPC:  listener.rs (bind) → filter.rs (admission) → tonic Server
//! ```
//!
//! # Design Decisions
//! - Both listeners bind before either server starts, so a port conflict
//!   fails startup instead of leaving one server half-up
//! - Admission runs on the accept stream, below gRPC framing

pub mod filter;
pub mod listener;

pub use filter::{filtered_incoming, AllowAll, ConnectionFilter, DenyList};
pub use listener::{Listener, ListenerError};
