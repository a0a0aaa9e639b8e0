//! auth-relay: an HTTP + gRPC front that delegates authentication.
//!
//! # Architecture Overview
//!
//! ```text
//!   HTTP client ──▶ net::listener ──▶ http::server ──▶ http::middleware::auth ──▶ handler
//!                                                            │
//!                                                            ▼ IsAuthenticated
//!                                                  authority::AuthorityConnection ──▶ Authority
//!                                                            ▲
//!                                                  authority::supervisor (backoff, reconnect)
//!
//!   gRPC client ──▶ net::listener ──▶ net::filter ──▶ rpc::interceptor ──▶ rpc::server routes
//!
//!   lifecycle: signals ──▶ Shutdown ──▶ both servers + supervisor, bounded by grace period
//! ```

// Core subsystems
pub mod authority;
pub mod http;
pub mod net;
pub mod rpc;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use authority::{AuthorityConnection, IdentityClaims};
pub use config::RelayConfig;
pub use lifecycle::{Host, Shutdown};
