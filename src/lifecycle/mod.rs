//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Bind HTTP + gRPC listeners → spawn both servers
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → stream of Termination events
//!
//! Shutdown (shutdown.rs):
//!     First signal → broadcast → servers drain, supervisor exits
//!     → bounded by grace period
//! ```
//!
//! # Design Decisions
//! - One coordinator, shared by everything that must stop
//! - Shutdown has a timeout: tasks are aborted after the deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::{termination_signals, Termination, TerminationSignals};
pub use startup::{Host, HostError, ShutdownReport, StartupError};
