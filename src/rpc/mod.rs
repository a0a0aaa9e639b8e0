//! Inbound gRPC subsystem.
//!
//! # Data Flow
//! ```text
//! net::filter (admitted stream)
//!     → tonic Server
//!     → interceptor.rs (CallLogLayer: method, metadata, status, latency)
//!     → server.rs routes (health, reflection, business services)
//! ```

pub mod interceptor;
pub mod server;

pub use interceptor::CallLogLayer;
pub use server::{RpcError, RpcServices};
