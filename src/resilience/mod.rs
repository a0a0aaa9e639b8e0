//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Authority connection not ready:
//!     → backoff.rs (linear, capped delay before the next reconnect trigger)
//!
//! Delegated call to the authority:
//!     → timeouts.rs (hard deadline; never wait on the authority forever)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Reconnects never give up; the delay is capped instead
//! - No jitter: one supervisor per process talks to one authority

pub mod backoff;
pub mod timeouts;

pub use backoff::linear_backoff;
pub use timeouts::{with_deadline, Elapsed};
