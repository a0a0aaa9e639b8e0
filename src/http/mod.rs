//! Inbound HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::listener)
//!     → server.rs (axum router, request ID, timeout)
//!     → middleware/auth.rs (bearer credential → authority → IdentityClaims)
//!     → business handler (claims in request extensions)
//!     → response.rs (JSON envelope)
//! ```

pub mod middleware;
pub mod response;
pub mod server;

pub use middleware::{AuthGate, AuthRejection};
pub use response::ApiResponse;
pub use server::router;
